//! The assembled cockpit: hands, steering wheel, gear lever, drivetrain and readouts.
//!
//! Lifecycle
//! - [`Cockpit::configure`] builds every component from a [`CockpitConfig`]. Nothing is
//!   pushed anywhere yet.
//! - [`Cockpit::activate`] runs once the host is ready: the lever is forced to neutral
//!   and that gear is pushed to the drivetrain. Steps before activation are no-ops.
//! - Seat events switch hand tracking and avatar visibility.
//!
//! Cadences
//! - [`Cockpit::fixed_step`]: every control-surface transition and the drivetrain.
//! - [`Cockpit::presentation_step`]: hand-target following, readouts, wheel poses.

use crate::drivetrain::{Actuation, Drivetrain, DrivetrainConfig, VehicleBody};
use crate::hands::{ControllerFrame, HandTargetConfig, HandTargets};
use crate::readout::{DisplaySink, Readout, ReadoutConfig};
use crate::shifter::{GearShifter, ShifterConfig};
use crate::steering::{SteeringConfig, SteeringWheel};
use crate::types::Pose;

/// Outbound notifications for remote peers. Fire-and-forget.
pub trait Replication {
    /// Show or hide the local driver's avatar.
    fn set_avatar_visible(&mut self, visible: bool);
}

/// Replication port for single-player hosts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReplication;

impl Replication for NullReplication {
    fn set_avatar_visible(&mut self, _visible: bool) {}
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct CockpitConfig {
    pub hands: HandTargetConfig,
    pub steering: SteeringConfig,
    pub shifter: ShifterConfig,
    pub drivetrain: DrivetrainConfig,
    pub readout: ReadoutConfig,
}

impl CockpitConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        self.steering.validate()?;
        self.shifter.validate()?;
        self.drivetrain.validate()?;
        self.readout.validate()?;
        Ok(())
    }
}

/// Presentation outputs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationFrame {
    /// Wheel world poses in [`crate::types::WheelId::ALL`] order.
    pub wheel_poses: [Option<Pose>; 4],
    /// Whether the readout labels were refreshed.
    pub readout_refreshed: bool,
}

#[derive(Debug)]
pub struct Cockpit<R: Replication = NullReplication> {
    hands: HandTargets,
    wheel: SteeringWheel,
    shifter: GearShifter,
    drivetrain: Drivetrain,
    readout: Readout,
    replication: R,
    active: bool,
    seated: bool,
}

impl<R: Replication> Cockpit<R> {
    /// Build every component. Validation problems are logged and the values used as given.
    pub fn configure(config: CockpitConfig, replication: R) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("cockpit: configuration issue: {e}");
        }
        let CockpitConfig {
            hands,
            steering,
            shifter,
            drivetrain,
            readout,
        } = config;
        Self {
            hands: HandTargets::new(hands),
            wheel: SteeringWheel::new(steering),
            shifter: GearShifter::new(shifter),
            drivetrain: Drivetrain::new(drivetrain),
            readout: Readout::new(readout),
            replication,
            active: false,
            seated: false,
        }
    }

    /// Force the lever to neutral, push that gear, and start stepping.
    pub fn activate(&mut self) {
        self.shifter.activate(&mut self.drivetrain);
        self.active = true;
        log::info!(
            "cockpit: active (slot {}, gear {})",
            self.shifter.current_slot(),
            self.drivetrain.state().gear_index
        );
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_seated(&self) -> bool {
        self.seated
    }

    /// A driver took the seat. Only the local driver resets the cockpit and hides its avatar.
    pub fn on_driver_seated(&mut self, local: bool) {
        if !local {
            return;
        }
        self.seated = true;
        self.wheel.reset();
        self.hands.reset();
        self.hands.set_tracking(true);
        self.drivetrain.reset();
        if self.active {
            self.shifter.activate(&mut self.drivetrain);
        }
        self.replication.set_avatar_visible(false);
        log::info!("cockpit: local driver seated");
    }

    /// The driver left: stop tracking, park the hand targets, show the avatar again.
    pub fn on_driver_left(&mut self) {
        self.seated = false;
        self.hands.set_tracking(false);
        self.hands.restore_rest();
        self.replication.set_avatar_visible(true);
        log::info!("cockpit: driver left");
    }

    /// One physics tick. Without a seated driver every input reads as released.
    pub fn fixed_step<B: VehicleBody + ?Sized>(
        &mut self,
        dt: f32,
        frame: &ControllerFrame,
        body: Option<&mut B>,
    ) -> Option<Actuation> {
        if !self.active {
            return None;
        }
        let idle = ControllerFrame::idle();
        let frame = if self.seated { frame } else { &idle };

        self.wheel.tick(dt, frame, &mut self.hands);
        self.shifter.tick(dt, frame, &mut self.hands, &mut self.drivetrain);
        self.drivetrain
            .fixed_step(dt, frame, Some(self.wheel.current_angle()), body)
    }

    /// One variable-rate frame.
    pub fn presentation_step<B: VehicleBody + ?Sized>(
        &mut self,
        unscaled_dt: f32,
        frame: &ControllerFrame,
        body: Option<&B>,
        sink: &mut impl DisplaySink,
    ) -> PresentationFrame {
        self.hands.follow_tracking(frame);

        let speed = body.map_or(0.0, |b| b.linear_velocity().norm());
        let gear = self.active.then(|| self.drivetrain.state().gear_index);
        let readout_refreshed = self.readout.update(unscaled_dt, speed, gear, sink);
        let wheel_poses = body.map_or([None; 4], |b| self.drivetrain.wheel_poses(b));

        PresentationFrame {
            wheel_poses,
            readout_refreshed,
        }
    }

    #[inline]
    pub fn hands(&self) -> &HandTargets {
        &self.hands
    }

    #[inline]
    pub fn wheel(&self) -> &SteeringWheel {
        &self.wheel
    }

    #[inline]
    pub fn shifter(&self) -> &GearShifter {
        &self.shifter
    }

    #[inline]
    pub fn drivetrain(&self) -> &Drivetrain {
        &self.drivetrain
    }

    #[inline]
    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    #[inline]
    pub fn replication(&self) -> &R {
        &self.replication
    }
}
