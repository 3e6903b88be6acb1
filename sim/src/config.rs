//! Simulation configuration parsed from `cockpit.toml`.
//!
//! `COCKPIT_CONFIG` points at a file to load; without it the bundled `cockpit.toml`
//! next to this crate's manifest is used.

use bevy::prelude::Resource;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use vehicle::CockpitConfig;

const BUNDLED: &str = include_str!("../cockpit.toml");

/// Frame pacing for the headless run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total simulated seconds before the app exits.
    pub duration_secs: f32,
    /// Physics (fixed) tick rate.
    pub fixed_hz: f64,
    /// Presentation frame rate; each `update` advances time by one frame.
    pub frame_hz: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: 14.0,
            fixed_hz: 60.0,
            frame_hz: 90.0,
        }
    }
}

impl RunConfig {
    pub fn frame_count(&self) -> u32 {
        (self.duration_secs * self.frame_hz).ceil() as u32
    }
}

/// Rigid-body parameters of the simulated car.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub mass: f32,
    pub half_extents: [f32; 3],
    pub wheel_radius: f32,
    /// Distance between front and rear axles.
    pub wheelbase: f32,
    /// Distance between left and right wheels.
    pub track: f32,
    /// Wheel hub height relative to the chassis center.
    pub wheel_height: f32,
    /// Fraction of sideways velocity removed per second.
    pub lateral_grip: f32,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            half_extents: [0.9, 0.5, 2.2],
            wheel_radius: 0.35,
            wheelbase: 2.6,
            track: 1.6,
            wheel_height: -0.3,
            lateral_grip: 8.0,
        }
    }
}

/// Timeline for the scripted driver, in seconds from startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Slot the driver moves the lever to.
    pub target_slot: usize,
    pub shift_at: f32,
    /// How long the lever slide takes.
    pub slide_secs: f32,
    pub throttle_at: f32,
    pub throttle_until: f32,
    pub steer_at: f32,
    /// Rim rotation the left hand performs.
    pub steer_degrees: f32,
    pub steer_secs: f32,
    pub steer_until: f32,
    pub brake_at: f32,
    pub leave_at: f32,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            target_slot: 3,
            shift_at: 0.5,
            slide_secs: 0.5,
            throttle_at: 1.5,
            throttle_until: 8.0,
            steer_at: 4.0,
            steer_degrees: 45.0,
            steer_secs: 1.0,
            steer_until: 7.0,
            brake_at: 8.5,
            leave_at: 12.0,
        }
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub run: RunConfig,
    pub chassis: ChassisConfig,
    pub script: ScriptConfig,
    pub cockpit: CockpitConfig,
}

impl SimConfig {
    /// Load from `COCKPIT_CONFIG` if set, otherwise from the bundled file.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("COCKPIT_CONFIG").ok().filter(|p| !p.is_empty()) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::from_toml_str(BUNDLED, Path::new("cockpit.toml")),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content, path)
    }

    /// Parse and validate. `origin` is only used in error messages.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: SimConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.run.duration_secs <= 0.0 {
            return Err("run.duration_secs must be positive");
        }
        if self.run.fixed_hz <= 0.0 || self.run.frame_hz <= 0.0 {
            return Err("run rates must be positive");
        }
        let c = &self.chassis;
        if c.mass <= 0.0 || c.wheel_radius <= 0.0 || c.wheelbase <= 0.0 || c.track <= 0.0 {
            return Err("chassis mass and dimensions must be positive");
        }
        if c.half_extents.iter().any(|e| *e <= 0.0) {
            return Err("chassis.half_extents must be positive");
        }
        if self.script.target_slot >= self.cockpit.shifter.slot_anchors.len() {
            return Err("script.target_slot has no matching slot anchor");
        }
        self.cockpit.validate()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => write!(f, "Failed to parse {}: {}", path.display(), e),
            ConfigError::Invalid(reason) => write!(f, "Invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
