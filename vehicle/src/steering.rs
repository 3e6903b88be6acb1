//! Steering wheel driven by zero, one or two tracked hands.
//!
//! Behavior per tick
//! - A grip rising edge near a free grab point claims it for that hand and seeds the
//!   hand's continuous angle with its current raw angle. The grab offset is chosen so
//!   the wheel does not jump on grab.
//! - Each held hand accumulates the shortest signed delta between successive raw
//!   samples, so turning through the ±180° wrap (or several turns) stays continuous.
//! - Held: the wheel eases toward the mean of the hands' targets and is clamped.
//! - Released: a spring-damper pulls the wheel back to center and parks it at exactly 0.
//! - Held hands get their target pose pinned to the grab point on the rim.

use nalgebra::Unit;

use crate::constants::{MIN_RADIAL_SQ, WHEEL_REST_ANGLE_DEG, WHEEL_REST_VELOCITY_DEG};
use crate::hands::{ControllerFrame, GripEdge, GripLatch, HandTargets};
use crate::math::{clamp01, delta_angle, euler_deg, lerp, lerp_angle, look_rotation, normalize_angle};
use crate::types::{Hand, Pose, Quat, Vec3};

/// Local axis the wheel spins around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

/// Spin axis plus an in-plane basis `(u, v)` with `u × v = axis`.
///
/// Resolved once from [`RotationAxis`] so the tick never branches on the axis choice.
#[derive(Clone, Copy, Debug)]
pub struct WheelAxis {
    pub axis: Unit<Vec3>,
    u: Vec3,
    v: Vec3,
}

impl WheelAxis {
    pub fn new(axis: RotationAxis) -> Self {
        let (axis, u, v) = match axis {
            RotationAxis::X => (Vec3::x_axis(), Vec3::y(), Vec3::z()),
            RotationAxis::Y => (Vec3::y_axis(), Vec3::z(), Vec3::x()),
            RotationAxis::Z => (Vec3::z_axis(), Vec3::x(), Vec3::y()),
        };
        Self { axis, u, v }
    }

    /// Angle (degrees) of a wheel-local point around the axis, measured from `u` toward `v`.
    #[inline]
    pub fn planar_angle(&self, local: Vec3) -> f32 {
        local.dot(&self.v).atan2(local.dot(&self.u)).to_degrees()
    }

    /// Rotation of `angle_deg` around the axis.
    #[inline]
    pub fn rotation(&self, angle_deg: f32) -> Quat {
        Quat::from_axis_angle(&self.axis, angle_deg.to_radians())
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct SteeringConfig {
    /// World pose of the wheel hub at zero steering angle.
    pub mount: Pose,
    /// Grab points in the wheel's own (rotating) frame.
    pub grab_points: Vec<Vec3>,
    /// Max hand distance (meters) to a free grab point to start a grab.
    pub grab_radius: f32,
    /// Hand distance (meters) from its grab point at which the grab is dropped.
    pub release_radius: f32,
    pub rotation_axis: RotationAxis,
    /// Wheel angle limits in degrees.
    pub min_angle: f32,
    pub max_angle: f32,
    /// Initial wheel angle (degrees), clamped to the limits.
    pub start_angle: f32,
    /// Flip the sign of raw hand angles.
    pub invert_direction: bool,
    /// Interpolation rate toward the hands' target, per second (`0..50`).
    pub wheel_follow_speed: f32,
    /// Spring pull toward center when released.
    pub spring_stiffness: f32,
    /// Spring damping when released.
    pub spring_damping: f32,
    /// Multiplier on hand angular motion (`0.25..4`).
    pub input_sensitivity: f32,
    /// Euler offsets (degrees) applied to the rim pose for each hand.
    pub left_hand_euler_offset: Vec3,
    pub right_hand_euler_offset: Vec3,
    /// Position offset applied in the rim pose's local frame.
    pub grab_point_pose_offset: Vec3,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            mount: Pose::default(),
            grab_points: vec![Vec3::new(-0.18, 0.0, 0.0), Vec3::new(0.18, 0.0, 0.0)],
            grab_radius: 0.25,
            release_radius: 0.4,
            rotation_axis: RotationAxis::Z,
            min_angle: -90.0,
            max_angle: 90.0,
            start_angle: 0.0,
            invert_direction: false,
            wheel_follow_speed: 20.0,
            spring_stiffness: 20.0,
            spring_damping: 4.0,
            input_sensitivity: 1.0,
            left_hand_euler_offset: Vec3::zeros(),
            right_hand_euler_offset: Vec3::zeros(),
            grab_point_pose_offset: Vec3::zeros(),
        }
    }
}

impl SteeringConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.min_angle > self.max_angle {
            return Err("Steering min_angle is greater than max_angle");
        }
        if self.grab_radius < 0.0 || self.release_radius < 0.0 {
            return Err("Steering grab/release radius is negative");
        }
        if !(0.25..=4.0).contains(&self.input_sensitivity) {
            return Err("Steering input_sensitivity is outside 0.25..=4");
        }
        if !(0.0..=50.0).contains(&self.wheel_follow_speed) {
            return Err("Steering wheel_follow_speed is outside 0..=50");
        }
        Ok(())
    }
}

/// Per-hand grab bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
struct HandGrip {
    latch: GripLatch,
    holding: bool,
    point: Option<usize>,
    last_raw: f32,
    continuous: Option<f32>,
    grab_offset: f32,
}

#[derive(Clone, Debug)]
pub struct SteeringWheel {
    config: SteeringConfig,
    axis: WheelAxis,
    point_owner: Vec<Option<Hand>>,
    hands: [HandGrip; 2],
    angle: f32,
    velocity: f32,
}

impl SteeringWheel {
    pub fn new(config: SteeringConfig) -> Self {
        let axis = WheelAxis::new(config.rotation_axis);
        let point_owner = vec![None; config.grab_points.len()];
        let angle = config.start_angle.clamp(config.min_angle, config.max_angle);
        Self {
            config,
            axis,
            point_owner,
            hands: [HandGrip::default(); 2],
            angle,
            velocity: 0.0,
        }
    }

    /// Back to the resting pose with no hands attached.
    ///
    /// Callers must also reset the [`HandTargets`] the wheel was overriding.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.config));
    }

    #[inline]
    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Current wheel angle in degrees.
    #[inline]
    pub fn current_angle(&self) -> f32 {
        self.angle
    }

    /// Current wheel angular velocity in degrees per second (spring phase only).
    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    pub fn is_held_by(&self, hand: Hand) -> bool {
        self.hands[hand.index()].holding
    }

    pub fn holding_count(&self) -> usize {
        self.hands.iter().filter(|h| h.holding).count()
    }

    #[inline]
    pub fn grabbed_point(&self, hand: Hand) -> Option<usize> {
        self.hands[hand.index()].point
    }

    /// Unwrapped angle accumulated by `hand` since it grabbed, if holding.
    #[inline]
    pub fn continuous_angle(&self, hand: Hand) -> Option<f32> {
        self.hands[hand.index()].continuous
    }

    /// Wheel rotation in world space (mount rotation then spin).
    pub fn wheel_rotation(&self) -> Quat {
        self.config.mount.rotation * self.axis.rotation(self.angle)
    }

    /// World position of grab point `index` at the current wheel angle.
    pub fn grab_point_world(&self, index: usize) -> Option<Vec3> {
        let local = self.config.grab_points.get(index)?;
        Some(self.config.mount.translation + self.wheel_rotation() * local)
    }

    /// Raw hand angle (degrees, `(-180, 180]`) in the mount's spin plane.
    ///
    /// Measured in the fixed mount frame rather than the rotating wheel frame, so a held
    /// wheel follows the hand 1:1.
    pub fn raw_angle(&self, hand_world: Vec3) -> f32 {
        let local = self.config.mount.rotation.inverse() * (hand_world - self.config.mount.translation);
        let angle = normalize_angle(self.axis.planar_angle(local));
        if self.config.invert_direction { -angle } else { angle }
    }

    /// Pose on the rim at `point_world`, facing along the rim tangent with the spin axis as up.
    pub fn rim_pose(&self, point_world: Vec3) -> Pose {
        let axis_world = (self.config.mount.rotation * self.axis.axis).into_inner();
        let mut radial = point_world - self.config.mount.translation;
        radial -= axis_world * radial.dot(&axis_world);
        if radial.norm_squared() < MIN_RADIAL_SQ {
            radial = self.wheel_rotation() * Vec3::x();
        }
        let radial = radial.try_normalize(0.0).unwrap_or_else(Vec3::x);
        let tangent = axis_world.cross(&radial);
        Pose::new(point_world, look_rotation(tangent, axis_world))
    }

    /// Advance one tick.
    pub fn tick(&mut self, dt: f32, frame: &ControllerFrame, targets: &mut HandTargets) {
        let dt = dt.max(0.0);
        let edges = Hand::BOTH.map(|hand| {
            let pressed = frame.hand(hand).grip_pressed();
            self.hands[hand.index()].latch.update(pressed)
        });

        for hand in Hand::BOTH {
            if edges[hand.index()] == GripEdge::Pressed {
                self.try_begin_grab(hand, frame, targets);
            }
        }

        for hand in Hand::BOTH {
            let grip = &self.hands[hand.index()];
            if grip.holding && (!edges[hand.index()].is_down() || self.too_far_from_point(hand, frame)) {
                self.end_grab(hand, targets);
            }
        }

        let hand_targets = Hand::BOTH.map(|hand| {
            let position = frame.hand(hand).position()?;
            if !self.hands[hand.index()].holding {
                return None;
            }
            Some(self.hand_target(hand, position))
        });

        match combine_hand_targets(hand_targets[0], hand_targets[1]) {
            Some(target) => self.follow(target, dt),
            None => self.spring_return(dt),
        }

        self.pose_hands(targets);
    }

    fn follow(&mut self, target: f32, dt: f32) {
        let (min, max) = (self.config.min_angle, self.config.max_angle);
        let target = target.clamp(min, max);
        let t = clamp01(dt * self.config.wheel_follow_speed);
        let mut next = lerp_angle(self.angle, target, t);
        // The shortest arc may run through the end stops; take the direct path instead.
        if next < min || next > max {
            next = lerp(self.angle, target, t);
        }
        self.angle = next.clamp(min, max);
    }

    fn spring_return(&mut self, dt: f32) {
        let accel = -self.angle * self.config.spring_stiffness - self.velocity * self.config.spring_damping;
        self.velocity += accel * dt;
        self.angle += self.velocity * dt;
        self.angle = self.angle.clamp(self.config.min_angle, self.config.max_angle);

        if self.angle.abs() < WHEEL_REST_ANGLE_DEG && self.velocity.abs() < WHEEL_REST_VELOCITY_DEG {
            self.angle = 0.0;
            self.velocity = 0.0;
        }
    }

    fn try_begin_grab(&mut self, hand: Hand, frame: &ControllerFrame, targets: &mut HandTargets) {
        if self.hands[hand.index()].holding {
            return;
        }
        let Some(position) = frame.hand(hand).position() else {
            return;
        };
        let Some(index) = self.nearest_free_grab_point(position) else {
            return;
        };

        targets.begin_override(hand);
        self.point_owner[index] = Some(hand);

        let raw = self.raw_angle(position);
        let angle = self.angle;
        let grip = &mut self.hands[hand.index()];
        grip.point = Some(index);
        grip.last_raw = raw;
        grip.continuous = Some(raw);
        grip.grab_offset = angle - raw;
        grip.holding = true;
        self.velocity = 0.0;

        log::debug!("steering: {hand:?} hand grabbed point {index} at raw angle {raw:.1}");
    }

    fn end_grab(&mut self, hand: Hand, targets: &mut HandTargets) {
        targets.end_override(hand);

        let grip = &mut self.hands[hand.index()];
        if let Some(owner) = grip.point.and_then(|i| self.point_owner.get_mut(i)) {
            *owner = None;
        }
        grip.point = None;
        grip.holding = false;
        grip.continuous = None;

        log::debug!("steering: {hand:?} hand released");
    }

    fn too_far_from_point(&self, hand: Hand, frame: &ControllerFrame) -> bool {
        let Some(position) = frame.hand(hand).position() else {
            return true;
        };
        let Some(point) = self.hands[hand.index()].point.and_then(|i| self.grab_point_world(i)) else {
            return true;
        };
        let r = self.config.release_radius;
        (point - position).norm_squared() > r * r
    }

    fn hand_target(&mut self, hand: Hand, position: Vec3) -> f32 {
        let raw = self.raw_angle(position);
        let sensitivity = self.config.input_sensitivity;
        let grip = &mut self.hands[hand.index()];
        let continuous = match grip.continuous {
            None => raw,
            Some(prev) => prev + delta_angle(grip.last_raw, raw) * sensitivity,
        };
        grip.last_raw = raw;
        grip.continuous = Some(continuous);
        continuous + grip.grab_offset
    }

    fn nearest_free_grab_point(&self, from: Vec3) -> Option<usize> {
        let r = self.config.grab_radius;
        (0..self.config.grab_points.len())
            .filter(|&i| self.point_owner[i].is_none())
            .filter_map(|i| Some((i, (self.grab_point_world(i)? - from).norm_squared())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|&(_, d2)| d2 <= r * r)
            .map(|(i, _)| i)
    }

    fn pose_hands(&self, targets: &mut HandTargets) {
        for hand in Hand::BOTH {
            let grip = &self.hands[hand.index()];
            if !grip.holding {
                continue;
            }
            let Some(point) = grip.point.and_then(|i| self.grab_point_world(i)) else {
                continue;
            };
            let rim = self.rim_pose(point);
            let offset = match hand {
                Hand::Left => self.config.left_hand_euler_offset,
                Hand::Right => self.config.right_hand_euler_offset,
            };
            let rotation = rim.rotation * euler_deg(offset);
            let translation = rim.translation + rotation * self.config.grab_point_pose_offset;
            targets.drive(hand, Pose::new(translation, rotation));
        }
    }
}

/// Mean of the holding hands' target angles, or `None` if no hand holds.
pub fn combine_hand_targets(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) * 0.5),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}
