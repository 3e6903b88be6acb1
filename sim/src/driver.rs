//! Scripted driver standing in for tracked VR controllers.
//!
//! Timeline (all times from [`ScriptConfig`])
//! - `shift_at`: right hand grips the lever and slides it to `target_slot`'s anchor,
//!   then lets go so the lever snaps into the slot.
//! - `throttle_at..throttle_until`: right trigger fully pressed.
//! - `steer_at..steer_until`: left hand grips the rim and turns it by `steer_degrees`.
//! - `brake_at..leave_at`: left trigger fully pressed.
//! - `leave_at`: the driver leaves the seat.

use bevy::prelude::*;
use vehicle::math::{clamp01, lerp};
use vehicle::steering::WheelAxis;
use vehicle::{ControllerFrame, Hand, HandSample, Pose, SteeringConfig};

use crate::cockpit::CockpitRig;
use crate::config::{ScriptConfig, SimConfig};

/// The controller frame the cockpit reads this frame.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ControllerInput(pub ControllerFrame);

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ControllerInput>();
    app.add_systems(Startup, setup);
    app.add_systems(PreUpdate, sample_controllers);
}

fn setup(mut commands: Commands, config: Res<SimConfig>) {
    commands.insert_resource(ScriptedDriver::new(&config));
}

fn sample_controllers(
    time: Res<Time>,
    mut driver: ResMut<ScriptedDriver>,
    mut rig: ResMut<CockpitRig>,
    mut input: ResMut<ControllerInput>,
) {
    let t = time.elapsed_secs();
    input.0 = driver.sample(t, rig.0.shifter().lever_position());
    if driver.should_leave(t) {
        rig.0.on_driver_left();
    }
}

/// Points on the steering rim, in world space, as the wheel is turned.
#[derive(Clone, Copy, Debug)]
struct RimPath {
    hub: Pose,
    axis: WheelAxis,
    grab_local: vehicle::Vec3,
}

impl RimPath {
    fn new(steering: &SteeringConfig) -> Self {
        let grab_local = steering
            .grab_points
            .first()
            .copied()
            .unwrap_or_else(|| vehicle::Vec3::new(-0.18, 0.0, 0.0));
        Self {
            hub: steering.mount,
            axis: WheelAxis::new(steering.rotation_axis),
            grab_local,
        }
    }

    /// Grab point after turning the wheel by `degrees` from center.
    fn point(&self, degrees: f32) -> vehicle::Vec3 {
        self.hub.translation + self.hub.rotation * (self.axis.rotation(degrees) * self.grab_local)
    }
}

#[derive(Resource, Debug)]
pub struct ScriptedDriver {
    script: ScriptConfig,
    rim: RimPath,
    lever_to: vehicle::Vec3,
    /// Lever position captured when the grab starts.
    lever_from: Option<vehicle::Vec3>,
    left_seat: bool,
}

impl ScriptedDriver {
    pub fn new(config: &SimConfig) -> Self {
        let anchors = &config.cockpit.shifter.slot_anchors;
        let lever_to = anchors
            .get(config.script.target_slot)
            .or(anchors.last())
            .copied()
            .unwrap_or_else(vehicle::Vec3::zeros);
        Self {
            script: config.script.clone(),
            rim: RimPath::new(&config.cockpit.steering),
            lever_to,
            lever_from: None,
            left_seat: false,
        }
    }

    /// Controller state at `t` seconds. `lever_now` is the lever's current position.
    pub fn sample(&mut self, t: f32, lever_now: vehicle::Vec3) -> ControllerFrame {
        let s = &self.script;
        let mut frame = ControllerFrame::idle();

        // 1) Right hand: lever, then throttle.
        let slide_end = s.shift_at + s.slide_secs;
        let right = frame.hand_mut(Hand::Right);
        if t < s.shift_at {
            right.pose = Some(Pose::at(lever_now + vehicle::Vec3::new(0.0, 0.3, 0.0)));
        } else if t < slide_end {
            let from = *self.lever_from.get_or_insert(lever_now);
            let u = if s.slide_secs > 0.0 { clamp01((t - s.shift_at) / s.slide_secs) } else { 1.0 };
            right.pose = Some(Pose::at(from.lerp(&self.lever_to, u)));
            right.grip = 1.0;
        } else {
            right.pose = Some(Pose::at(self.lever_to));
        }
        if (s.throttle_at..s.throttle_until).contains(&t) {
            right.trigger = 1.0;
        }

        // 2) Left hand: rim, then brake.
        let left = frame.hand_mut(Hand::Left);
        *left = self.left_hand(t);
        if (s.brake_at..s.leave_at).contains(&t) {
            left.trigger = 1.0;
        }
        frame
    }

    fn left_hand(&self, t: f32) -> HandSample {
        let s = &self.script;
        let progress = if s.steer_secs > 0.0 { clamp01((t - s.steer_at) / s.steer_secs) } else { 1.0 };
        let turned = lerp(0.0, s.steer_degrees, progress);
        let holding = (s.steer_at..s.steer_until).contains(&t);
        HandSample {
            pose: Some(Pose::at(self.rim.point(if t < s.steer_at { 0.0 } else { turned }))),
            grip: if holding { 1.0 } else { 0.0 },
            trigger: 0.0,
        }
    }

    /// True exactly once, the first time `t` reaches `leave_at`.
    pub fn should_leave(&mut self, t: f32) -> bool {
        if self.left_seat || t < self.script.leave_at {
            return false;
        }
        self.left_seat = true;
        true
    }
}
