//! Dashboard text: frame rate, speed and gear.
//!
//! Refreshes are sampled: [`Readout::update`] accumulates frames and only formats and
//! pushes text to the [`DisplaySink`] once every `sample_duration` seconds.

use crate::constants::{MPS_TO_KPH, MPS_TO_MPH};
use crate::math::inverse_lerp;

/// Frame rates mapped onto the red→green heat scale.
const HEAT_LOW_FPS: f32 = 30.0;
const HEAT_HIGH_FPS: f32 = 120.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum SpeedUnits {
    #[default]
    Kph,
    Mph,
    Mps,
}

impl SpeedUnits {
    #[inline]
    pub fn from_mps(self, mps: f32) -> f32 {
        match self {
            SpeedUnits::Kph => mps * MPS_TO_KPH,
            SpeedUnits::Mph => mps * MPS_TO_MPH,
            SpeedUnits::Mps => mps,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedUnits::Kph => "km/h",
            SpeedUnits::Mph => "mph",
            SpeedUnits::Mps => "m/s",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ReadoutConfig {
    /// Seconds between label refreshes (`0.05..3`).
    pub sample_duration: f32,
    pub show_frame_time_ms: bool,
    pub speed_units: SpeedUnits,
    /// Decimals on the speed label (`0..=2`).
    pub speed_decimals: u8,
}

impl Default for ReadoutConfig {
    fn default() -> Self {
        Self {
            sample_duration: 0.25,
            show_frame_time_ms: true,
            speed_units: SpeedUnits::Kph,
            speed_decimals: 0,
        }
    }
}

impl ReadoutConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0.05..=3.0).contains(&self.sample_duration) {
            return Err("Readout sample_duration is outside 0.05..=3");
        }
        if self.speed_decimals > 2 {
            return Err("Readout speed_decimals is greater than 2");
        }
        Ok(())
    }
}

/// Where the formatted labels go.
pub trait DisplaySink {
    /// `heat` runs from 0 (red, slow) to 1 (green, fast).
    fn show_fps(&mut self, text: &str, heat: f32);
    fn show_speed(&mut self, text: &str);
    fn show_gear(&mut self, text: &str);
}

/// One frame-rate measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FpsSample {
    pub fps: f32,
    pub frame_ms: f32,
    /// Position of `fps` on the 30..120 scale, clamped to `[0, 1]`.
    pub heat: f32,
}

impl FpsSample {
    /// Linear red→green color for the heat, as RGBA.
    pub fn color(&self) -> [f32; 4] {
        [1.0 - self.heat, self.heat, 0.0, 1.0]
    }
}

/// Frame counter over a sampling window.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsCounter {
    timer: f32,
    frames: u32,
}

impl FpsCounter {
    /// Count one frame of `unscaled_dt` seconds. Yields a sample when the window closes.
    pub fn tick(&mut self, unscaled_dt: f32, sample_duration: f32) -> Option<FpsSample> {
        self.timer += unscaled_dt.max(0.0);
        self.frames += 1;
        if self.timer < sample_duration {
            return None;
        }
        let fps = self.frames as f32 / self.timer.max(1.0e-6);
        let frame_ms = 1000.0 / fps.max(1.0e-6);
        *self = Self::default();
        Some(FpsSample {
            fps,
            frame_ms,
            heat: inverse_lerp(HEAT_LOW_FPS, HEAT_HIGH_FPS, fps),
        })
    }
}

/// At most one decimal, trailing zero dropped.
fn one_decimal(v: f32) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    }
}

pub fn format_fps(sample: &FpsSample, show_frame_time_ms: bool) -> String {
    if show_frame_time_ms {
        format!("{} FPS  ({} ms)", one_decimal(sample.fps), one_decimal(sample.frame_ms))
    } else {
        format!("{} FPS", one_decimal(sample.fps))
    }
}

pub fn format_speed(speed_mps: f32, units: SpeedUnits, decimals: u8) -> String {
    let shown = units.from_mps(speed_mps);
    let decimals = usize::from(decimals.min(2));
    format!("Speed: {shown:.decimals$} {}", units.label())
}

/// `N` for neutral, `R` for reverse, the ordinal otherwise; `?` without a vehicle.
pub fn format_gear(gear: Option<i32>) -> String {
    let label = match gear {
        None => "?".to_string(),
        Some(0) => "N".to_string(),
        Some(g) if g < 0 => "R".to_string(),
        Some(g) => g.to_string(),
    };
    format!("Gear: {label}")
}

#[derive(Clone, Debug, Default)]
pub struct Readout {
    config: ReadoutConfig,
    counter: FpsCounter,
    last: Option<FpsSample>,
}

impl Readout {
    pub fn new(config: ReadoutConfig) -> Self {
        Self {
            config,
            counter: FpsCounter::default(),
            last: None,
        }
    }

    #[inline]
    pub fn last_sample(&self) -> Option<FpsSample> {
        self.last
    }

    /// Count a presentation frame; refresh every label when the window closes.
    ///
    /// Returns whether the sink was written.
    pub fn update(
        &mut self,
        unscaled_dt: f32,
        speed_mps: f32,
        gear: Option<i32>,
        sink: &mut impl DisplaySink,
    ) -> bool {
        let Some(sample) = self.counter.tick(unscaled_dt, self.config.sample_duration) else {
            return false;
        };
        self.last = Some(sample);
        sink.show_fps(&format_fps(&sample, self.config.show_frame_time_ms), sample.heat);
        sink.show_speed(&format_speed(
            speed_mps,
            self.config.speed_units,
            self.config.speed_decimals,
        ));
        sink.show_gear(&format_gear(gear));
        true
    }
}
