//! Fixed-step vehicle model: pedals and wheel angle in, wheel actuation out.
//!
//! The drivetrain never simulates contact. It reads the body's velocity and forward
//! axis through [`VehicleBody`], writes torques and steer angles back, and may override
//! the body's velocity (speed cap, coast drag).

use crate::constants::{
    EPS, FRONT_BRAKE_SHARE, LIMITER_CUTOFF_MARGIN_MPS, PEDAL_EPS, REAR_BRAKE_SHARE, UNLIMITED_SPEED,
    VELOCITY_EPS_SQ,
};
use crate::gear_table::{GearTable, is_limited};
use crate::hands::ControllerFrame;
use crate::math::{clamp01, inverse_lerp, move_towards};
use crate::types::{Pose, Vec3, WheelId};

/// The external rigid body and its four wheels.
pub trait VehicleBody {
    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    /// Unit forward axis of the body in world space.
    fn forward(&self) -> Vec3;
    fn set_motor_torque(&mut self, wheel: WheelId, torque: f32);
    fn set_brake_torque(&mut self, wheel: WheelId, torque: f32);
    fn set_steer_angle(&mut self, wheel: WheelId, degrees: f32);
    /// World pose of a wheel for visual sync, if the wheel exists.
    fn wheel_world_pose(&self, wheel: WheelId) -> Option<Pose>;
}

/// Accepts gear changes from the shifter.
pub trait GearReceiver {
    /// Replace the per-slot speed table (km/h).
    fn set_gear_table(&mut self, values_kph: &[f32]);
    fn set_gear_slot_index(&mut self, slot: Option<usize>);
    /// Select a gear ordinal with an explicit max speed (m/s, `<= 0` for none).
    fn set_gear(&mut self, gear: i32, max_speed_mps: f32);
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct DrivetrainConfig {
    /// Multiplier on both raw trigger axes.
    pub trigger_scale: f32,
    /// Derive the steering target from the wheel angle; otherwise it holds.
    pub read_steering_from_wheel: bool,
    pub invert_steering_input: bool,
    /// Wheel angle (degrees) that maps to full lock.
    pub steering_max_angle: f32,
    /// Front-wheel steer angle (degrees) at full lock.
    pub max_steer_angle: f32,
    /// Normalized steering change per second.
    pub steering_rate: f32,
    pub steer_deadzone: f32,
    pub steer_snap_to_zero: f32,
    pub motor_power: f32,
    pub brake_power: f32,
    /// Brake floor (fraction of `brake_power`) at rest with no throttle.
    pub idle_brake: f32,
    /// Speed (m/s) under which the idle brake floor applies.
    pub idle_brake_speed: f32,
    /// Brake floor (fraction of `brake_power`) in neutral.
    pub neutral_hold_brake: f32,
    pub throttle_deadzone: f32,
    /// Fraction of velocity shed per second while coasting.
    pub coast_drag: f32,
    /// Coasting speed (m/s) at or under which the body is stopped.
    pub coast_speed_threshold: f32,
    /// Rate (m/s per second) at which the cap pulls velocity back. `0` is instant.
    pub limiter_velocity_snap: f32,
    /// Fraction of the cap where the torque limiter starts (`0.5..1`).
    pub limiter_start_fraction: f32,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            trigger_scale: 1.0,
            read_steering_from_wheel: true,
            invert_steering_input: false,
            steering_max_angle: 90.0,
            max_steer_angle: 35.0,
            steering_rate: 5.0,
            steer_deadzone: 0.02,
            steer_snap_to_zero: 0.002,
            motor_power: 2500.0,
            brake_power: 2500.0,
            idle_brake: 0.35,
            idle_brake_speed: 0.5,
            neutral_hold_brake: 0.6,
            throttle_deadzone: 0.08,
            coast_drag: 0.25,
            coast_speed_threshold: 0.2,
            limiter_velocity_snap: 5.0,
            limiter_start_fraction: 0.9,
        }
    }
}

impl DrivetrainConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.steering_max_angle <= 0.0 {
            return Err("Drivetrain steering_max_angle must be positive");
        }
        if self.motor_power < 0.0 || self.brake_power < 0.0 {
            return Err("Drivetrain motor/brake power is negative");
        }
        if !(0.5..=1.0).contains(&self.limiter_start_fraction) {
            return Err("Drivetrain limiter_start_fraction is outside 0.5..=1");
        }
        if self.steering_rate < 0.0 || self.coast_drag < 0.0 || self.limiter_velocity_snap < 0.0 {
            return Err("Drivetrain rates must be non-negative");
        }
        Ok(())
    }
}

/// Per-tick drivetrain state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleState {
    pub gas_input: f32,
    pub brake_input: f32,
    /// Smoothed steering in `[-1, 1]`.
    pub steering_input: f32,
    /// Steering target before smoothing.
    pub target_steer: f32,
    /// Negative reverse, 0 neutral, positive forward.
    pub gear_index: i32,
    /// Effective cap (m/s); [`UNLIMITED_SPEED`] when uncapped.
    pub gear_max_speed: f32,
    pub gear_slot: Option<usize>,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            gas_input: 0.0,
            brake_input: 0.0,
            steering_input: 0.0,
            target_steer: 0.0,
            gear_index: 0,
            gear_max_speed: UNLIMITED_SPEED,
            gear_slot: None,
        }
    }
}

impl VehicleState {
    /// `-1.0` in reverse, `1.0` otherwise.
    #[inline]
    pub fn gear_direction(&self) -> f32 {
        if self.gear_index < 0 { -1.0 } else { 1.0 }
    }
}

/// Front/rear brake torque for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BrakeTorque {
    pub front: f32,
    pub rear: f32,
}

/// Values written to the body by one [`Drivetrain::fixed_step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Actuation {
    /// Per rear wheel.
    pub motor_torque: f32,
    /// Per wheel on each axle.
    pub brake: BrakeTorque,
    /// Front-wheel steer angle in degrees.
    pub steer_angle: f32,
    /// Body velocity after the cap and coast drag.
    pub velocity: Vec3,
}

/// Pedal axes after scale, clamp and throttle deadzone: `(gas, brake)`.
pub fn condition_pedals(config: &DrivetrainConfig, throttle_axis: f32, brake_axis: f32) -> (f32, f32) {
    let gas = clamp01(throttle_axis) * config.trigger_scale;
    let brake = clamp01(brake_axis) * config.trigger_scale;
    let gas = if gas.abs() < config.throttle_deadzone { 0.0 } else { gas };
    (clamp01(gas), clamp01(brake))
}

/// Normalized steering target in `[-1, 1]` for a wheel angle in degrees.
pub fn steer_target_from_wheel(config: &DrivetrainConfig, wheel_deg: f32) -> f32 {
    let max = config.steering_max_angle;
    let n = inverse_lerp(-max, max, wheel_deg.clamp(-max, max));
    let mut target = ((n - 0.5) * 2.0).clamp(-1.0, 1.0);
    if config.invert_steering_input {
        target = -target;
    }
    if target.abs() < config.steer_deadzone { 0.0 } else { target }
}

/// Rate-limited steering toward `target`, parked at exactly 0 near center.
pub fn smooth_steering(config: &DrivetrainConfig, current: f32, target: f32, dt: f32) -> f32 {
    let next = move_towards(current, target, config.steering_rate * dt);
    if next.abs() < config.steer_snap_to_zero { 0.0 } else { next }
}

/// Speed along the body forward axis in the direction the gear drives, or 0 when
/// moving against it.
pub fn speed_along_gear(velocity: Vec3, forward: Vec3, gear_direction: f32) -> f32 {
    let signed = velocity.dot(&forward);
    // A stationary body counts as moving with the gear.
    let moving = if signed < 0.0 { -1.0 } else { 1.0 };
    if moving * gear_direction > 0.0 { signed.abs() } else { 0.0 }
}

/// Torque multiplier for the soft limiter.
///
/// `1` below `start_fraction · cap`, falling linearly to `0` at the cap, and `0` within
/// [`LIMITER_CUTOFF_MARGIN_MPS`] of it. An unlimited cap always yields `1`.
pub fn limiter_scale(along: f32, cap: f32, start_fraction: f32) -> f32 {
    if !is_limited(cap) {
        return 1.0;
    }
    if along >= cap - LIMITER_CUTOFF_MARGIN_MPS {
        return 0.0;
    }
    let start = clamp01(start_fraction) * cap;
    1.0 - inverse_lerp(start, cap, along.min(cap))
}

/// Rear-wheel motor torque for the current gear.
pub fn motor_torque(config: &DrivetrainConfig, state: &VehicleState, along: f32) -> f32 {
    if state.gear_index == 0 {
        return 0.0;
    }
    let raw = config.motor_power * state.gas_input * state.gear_direction();
    raw * limiter_scale(along, state.gear_max_speed, config.limiter_start_fraction)
}

/// Brake torque with neutral and idle floors, split front/rear.
pub fn brake_torque(config: &DrivetrainConfig, state: &VehicleState, speed: f32) -> BrakeTorque {
    let mut total = config.brake_power * state.brake_input;
    if state.gear_index == 0 {
        total = total.max(config.neutral_hold_brake * config.brake_power);
    }
    if state.gas_input <= PEDAL_EPS && speed < config.idle_brake_speed {
        total = total.max(config.idle_brake * config.brake_power);
    }
    BrakeTorque {
        front: total * FRONT_BRAKE_SHARE,
        rear: total * REAR_BRAKE_SHARE,
    }
}

/// Anti-overspeed velocity correction.
///
/// Behavior
/// - No-op without a positive cap or for a near-stationary body.
/// - The forward component is pulled into `[0, cap]` (forward gears), `[-cap, 0]`
///   (reverse) or `[-cap, cap]` (neutral).
/// - The recombined velocity's magnitude is then pulled toward `cap`.
/// - Each correction moves its quantity by at most `snap · dt` m/s per call.
/// - `snap <= 0` applies both corrections instantly.
pub fn cap_velocity(velocity: Vec3, forward: Vec3, gear_index: i32, cap: f32, snap: f32, dt: f32) -> Vec3 {
    if !is_limited(cap) || velocity.norm_squared() <= VELOCITY_EPS_SQ {
        return velocity;
    }
    let instant = snap <= 0.0;
    let step = snap.max(0.0) * dt;

    let forward_speed = velocity.dot(&forward);
    let lateral = velocity - forward * forward_speed;
    let (lo, hi) = match gear_index {
        g if g < 0 => (-cap, 0.0),
        0 => (-cap, cap),
        _ => (0.0, cap),
    };
    let clamped = forward_speed.clamp(lo, hi);
    let corrected = if instant { clamped } else { move_towards(forward_speed, clamped, step) };

    let capped = forward * corrected + lateral;
    let magnitude = capped.norm();
    if magnitude <= cap || magnitude <= EPS {
        return capped;
    }
    let target = if instant { cap } else { move_towards(magnitude, cap, step) };
    capped * (target / magnitude)
}

/// Coasting decay: in gear with both pedals released.
pub fn coast_drag(config: &DrivetrainConfig, state: &VehicleState, velocity: Vec3, dt: f32) -> Vec3 {
    if state.gear_index == 0 || state.gas_input > PEDAL_EPS || state.brake_input > PEDAL_EPS {
        return velocity;
    }
    if velocity.norm() <= config.coast_speed_threshold {
        return Vec3::zeros();
    }
    let drag = config.coast_drag.max(0.0) * dt;
    if drag <= 0.0 {
        return velocity;
    }
    velocity * clamp01(1.0 - drag)
}

#[derive(Clone, Debug, Default)]
pub struct Drivetrain {
    config: DrivetrainConfig,
    state: VehicleState,
    table: GearTable,
}

impl Drivetrain {
    pub fn new(config: DrivetrainConfig) -> Self {
        Self {
            config,
            state: VehicleState::default(),
            table: GearTable::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &DrivetrainConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    #[inline]
    pub fn gear_table(&self) -> &GearTable {
        &self.table
    }

    /// Back to neutral, unlimited, centered steering. The gear table is kept.
    pub fn reset(&mut self) {
        self.state = VehicleState::default();
    }

    /// One physics tick.
    ///
    /// Inputs and steering smoothing always update. Actuation (and the velocity
    /// overrides) only happen with a body; without one this returns `None`.
    pub fn fixed_step<B: VehicleBody + ?Sized>(
        &mut self,
        dt: f32,
        frame: &ControllerFrame,
        wheel_angle: Option<f32>,
        body: Option<&mut B>,
    ) -> Option<Actuation> {
        let dt = dt.max(0.0);

        // 1) Inputs.
        let (gas, brake) = condition_pedals(&self.config, frame.throttle_axis(), frame.brake_axis());
        self.state.gas_input = gas;
        self.state.brake_input = brake;
        self.state.target_steer = match wheel_angle {
            Some(deg) if self.config.read_steering_from_wheel => steer_target_from_wheel(&self.config, deg),
            _ => self.state.steering_input,
        };

        // 2) Steering smoothing.
        self.state.steering_input =
            smooth_steering(&self.config, self.state.steering_input, self.state.target_steer, dt);

        let body = body?;
        let velocity = body.linear_velocity();
        let forward = body.forward();

        // 3) Motor on the rear axle.
        let along = speed_along_gear(velocity, forward, self.state.gear_direction());
        let motor = motor_torque(&self.config, &self.state, along);
        body.set_motor_torque(WheelId::RearLeft, motor);
        body.set_motor_torque(WheelId::RearRight, motor);

        // 4) Brakes per axle.
        let brakes = brake_torque(&self.config, &self.state, velocity.norm());
        for wheel in WheelId::ALL {
            let torque = if wheel.is_front() { brakes.front } else { brakes.rear };
            body.set_brake_torque(wheel, torque);
        }

        // 5) Velocity cap, 6) coast drag. Written back only when changed.
        let capped = cap_velocity(
            velocity,
            forward,
            self.state.gear_index,
            self.state.gear_max_speed,
            self.config.limiter_velocity_snap,
            dt,
        );
        if (capped - velocity).norm_squared() > VELOCITY_EPS_SQ {
            body.set_linear_velocity(capped);
        }
        let velocity = body.linear_velocity();
        let dragged = coast_drag(&self.config, &self.state, velocity, dt);
        if dragged != velocity {
            body.set_linear_velocity(dragged);
        }

        // 7) Steering on the front axle.
        let steer_angle = self.state.steering_input * self.config.max_steer_angle;
        body.set_steer_angle(WheelId::FrontLeft, steer_angle);
        body.set_steer_angle(WheelId::FrontRight, steer_angle);

        Some(Actuation {
            motor_torque: motor,
            brake: brakes,
            steer_angle,
            velocity: body.linear_velocity(),
        })
    }

    /// World poses of all four wheels in [`WheelId::ALL`] order, for mesh sync.
    pub fn wheel_poses<B: VehicleBody + ?Sized>(&self, body: &B) -> [Option<Pose>; 4] {
        WheelId::ALL.map(|wheel| body.wheel_world_pose(wheel))
    }
}

impl GearReceiver for Drivetrain {
    fn set_gear_table(&mut self, values_kph: &[f32]) {
        self.table.set_table(values_kph);
    }

    fn set_gear_slot_index(&mut self, slot: Option<usize>) {
        self.state.gear_slot = slot;
    }

    /// The effective cap is the smaller of the explicit max and the table entry for
    /// the current slot, whichever of them is set.
    fn set_gear(&mut self, gear: i32, max_speed_mps: f32) {
        self.state.gear_index = gear;
        let explicit = if is_limited(max_speed_mps) { max_speed_mps } else { UNLIMITED_SPEED };
        let from_table = self.table.lookup(self.state.gear_slot);
        let resolved = match (is_limited(explicit), is_limited(from_table)) {
            (true, true) => explicit.min(from_table),
            (false, true) => from_table,
            _ => explicit,
        };
        self.state.gear_max_speed = if is_limited(resolved) { resolved } else { UNLIMITED_SPEED };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::KPH_TO_MPS;

    const DT: f32 = 1.0 / 60.0;

    fn forward_gear(cap: f32) -> VehicleState {
        VehicleState {
            gas_input: 1.0,
            gear_index: 1,
            gear_max_speed: cap,
            ..VehicleState::default()
        }
    }

    #[test]
    fn throttle_deadzone_and_scale() {
        let config = DrivetrainConfig::default();
        assert_eq!(condition_pedals(&config, 0.05, 0.0), (0.0, 0.0));
        assert_eq!(condition_pedals(&config, 0.5, 0.3), (0.5, 0.3));
        assert_eq!(condition_pedals(&config, 3.0, -1.0), (1.0, 0.0));

        let doubled = DrivetrainConfig {
            trigger_scale: 2.0,
            ..DrivetrainConfig::default()
        };
        assert_eq!(condition_pedals(&doubled, 0.3, 0.75), (0.6, 1.0));
    }

    #[test]
    fn steer_target_maps_wheel_range_to_unit() {
        let config = DrivetrainConfig::default();
        assert!((steer_target_from_wheel(&config, 45.0) - 0.5).abs() < 1.0e-6);
        assert_eq!(steer_target_from_wheel(&config, -200.0), -1.0);
        assert_eq!(steer_target_from_wheel(&config, 1.0), 0.0);

        let inverted = DrivetrainConfig {
            invert_steering_input: true,
            ..DrivetrainConfig::default()
        };
        assert!((steer_target_from_wheel(&inverted, 45.0) + 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn steering_smoothing_is_rate_limited_and_parks_at_zero() {
        let config = DrivetrainConfig::default();
        let step = smooth_steering(&config, 0.0, 1.0, DT);
        assert!((step - 5.0 * DT).abs() < 1.0e-6);
        assert_eq!(smooth_steering(&config, 0.0015, 0.0, 0.0), 0.0);
    }

    #[test]
    fn limiter_scale_at_start_and_cap() {
        let cap = 60.0 * KPH_TO_MPS;
        assert!((cap - 16.666_67).abs() < 1.0e-3);
        let start = 0.9 * cap;
        assert!((start - 15.0).abs() < 1.0e-3);

        assert_eq!(limiter_scale(10.0, cap, 0.9), 1.0);
        assert!((limiter_scale(start, cap, 0.9) - 1.0).abs() < 1.0e-5);
        assert_eq!(limiter_scale(cap, cap, 0.9), 0.0);
        assert_eq!(limiter_scale(cap - 0.005, cap, 0.9), 0.0);
        assert_eq!(limiter_scale(100.0, UNLIMITED_SPEED, 0.9), 1.0);
    }

    #[test]
    fn limiter_scale_decreases_monotonically() {
        let cap = 16.666_67;
        let mut prev = f32::MAX;
        for i in 0..=400 {
            let v = i as f32 * 0.05;
            let s = limiter_scale(v, cap, 0.9);
            assert!((0.0..=1.0).contains(&s));
            assert!(s <= prev + 1.0e-6, "scale rose at {v}");
            prev = s;
        }
        assert_eq!(prev, 0.0);
    }

    #[test]
    fn neutral_has_no_motor_torque() {
        let config = DrivetrainConfig::default();
        let state = VehicleState {
            gas_input: 1.0,
            ..VehicleState::default()
        };
        assert_eq!(motor_torque(&config, &state, 0.0), 0.0);
    }

    #[test]
    fn reverse_drives_negative_torque() {
        let config = DrivetrainConfig::default();
        let state = VehicleState {
            gas_input: 0.5,
            gear_index: -1,
            ..VehicleState::default()
        };
        assert_eq!(motor_torque(&config, &state, 0.0), -1250.0);
    }

    #[test]
    fn speed_along_gear_ignores_motion_against_it() {
        let fwd = Vec3::z();
        assert_eq!(speed_along_gear(Vec3::new(0.0, 0.0, 4.0), fwd, 1.0), 4.0);
        assert_eq!(speed_along_gear(Vec3::new(0.0, 0.0, -4.0), fwd, 1.0), 0.0);
        assert_eq!(speed_along_gear(Vec3::new(0.0, 0.0, -4.0), fwd, -1.0), 4.0);
        assert_eq!(speed_along_gear(Vec3::new(3.0, 0.0, 0.0), fwd, 1.0), 0.0);
    }

    #[test]
    fn brake_floors_and_split() {
        let config = DrivetrainConfig::default();

        let neutral = VehicleState::default();
        let b = brake_torque(&config, &neutral, 5.0);
        assert!((b.front - 0.6 * 2500.0 * 0.7).abs() < 1.0e-3);
        assert!((b.rear - 0.6 * 2500.0 * 0.3).abs() < 1.0e-3);

        let idle = VehicleState {
            gear_index: 1,
            ..VehicleState::default()
        };
        let b = brake_torque(&config, &idle, 0.1);
        assert!((b.front + b.rear - 0.35 * 2500.0).abs() < 1.0e-3);
        assert_eq!(brake_torque(&config, &idle, 3.0), BrakeTorque::default());

        let pressed = VehicleState {
            gear_index: 1,
            brake_input: 1.0,
            ..VehicleState::default()
        };
        let b = brake_torque(&config, &pressed, 3.0);
        assert!((b.front - 1750.0).abs() < 1.0e-3);
        assert!((b.rear - 750.0).abs() < 1.0e-3);
    }

    #[test]
    fn cap_pulls_forward_speed_back_at_snap_rate() {
        let fwd = Vec3::z();
        let v = Vec3::new(0.0, 0.0, 20.0);
        let out = cap_velocity(v, fwd, 1, 16.0, 5.0, DT);
        assert!((out.z - (20.0 - 5.0 * DT)).abs() < 1.0e-4);

        let instant = cap_velocity(v, fwd, 1, 16.0, 0.0, DT);
        assert!((instant.z - 16.0).abs() < 1.0e-4);
    }

    #[test]
    fn cap_bounds_depend_on_gear() {
        let fwd = Vec3::z();
        let backwards = Vec3::new(0.0, 0.0, -3.0);
        assert!((cap_velocity(backwards, fwd, 1, 10.0, 0.0, DT).z).abs() < 1.0e-5);
        assert!((cap_velocity(backwards, fwd, 0, 10.0, 0.0, DT).z + 3.0).abs() < 1.0e-5);
        assert!((cap_velocity(backwards, fwd, -1, 10.0, 0.0, DT).z + 3.0).abs() < 1.0e-5);

        let ahead = Vec3::new(0.0, 0.0, 3.0);
        assert!((cap_velocity(ahead, fwd, -1, 10.0, 0.0, DT).z).abs() < 1.0e-5);
    }

    #[test]
    fn cap_rescales_magnitude_after_forward_clamp_at_full_rate() {
        let v = Vec3::new(8.0, 0.0, 14.0);
        let step = 5.0 * DT;
        let out = cap_velocity(v, Vec3::z(), 1, 10.0, 5.0, DT);

        // Forward clamp first, then the magnitude gets its own full step.
        let clamped = Vec3::new(8.0, 0.0, 14.0 - step);
        assert!((out.norm() - (clamped.norm() - step)).abs() < 1.0e-4, "out = {out:?}");
        // Direction of the clamped velocity is kept.
        assert!((out.x / out.z - clamped.x / clamped.z).abs() < 1.0e-5);
    }

    #[test]
    fn cap_rescales_total_magnitude() {
        let out = cap_velocity(Vec3::new(12.0, 0.0, 9.0), Vec3::z(), 1, 10.0, 0.0, DT);
        assert!((out.norm() - 10.0).abs() < 1.0e-4);
        assert!((out.x / out.z - 12.0 / 9.0).abs() < 1.0e-4);
    }

    #[test]
    fn cap_is_noop_when_unlimited_or_stationary() {
        let v = Vec3::new(0.0, 0.0, 50.0);
        assert_eq!(cap_velocity(v, Vec3::z(), 1, UNLIMITED_SPEED, 5.0, DT), v);
        let tiny = Vec3::new(0.0, 0.0, -0.005);
        assert_eq!(cap_velocity(tiny, Vec3::z(), 1, 10.0, 5.0, DT), tiny);
    }

    #[test]
    fn cap_second_application_moves_at_most_one_step() {
        let fwd = Vec3::z();
        let snap = 5.0;
        for v in [Vec3::new(0.0, 0.0, 30.0), Vec3::new(8.0, 0.0, 14.0), Vec3::new(0.0, 0.0, -6.0)] {
            let capped = cap_velocity(v, fwd, 1, 10.0, 0.0, DT);
            let again = cap_velocity(capped, fwd, 1, 10.0, snap, DT);
            assert!((again - capped).norm() <= snap * DT + 1.0e-4, "v = {v:?}");

            // Not yet capped: each correction takes at most one step.
            let once = cap_velocity(v, fwd, 1, 10.0, snap, DT);
            assert!((once - v).norm() <= 2.0 * snap * DT + 1.0e-4, "v = {v:?}");
        }
    }

    #[test]
    fn coast_drag_decays_and_stops() {
        let config = DrivetrainConfig::default();
        let coasting = VehicleState {
            gear_index: 2,
            ..VehicleState::default()
        };
        let v = Vec3::new(0.0, 0.0, 10.0);
        let out = coast_drag(&config, &coasting, v, DT);
        assert!((out.z - 10.0 * (1.0 - 0.25 * DT)).abs() < 1.0e-5);
        assert_eq!(coast_drag(&config, &coasting, Vec3::new(0.0, 0.0, 0.15), DT), Vec3::zeros());

        let neutral = VehicleState::default();
        assert_eq!(coast_drag(&config, &neutral, v, DT), v);
    }

    #[test]
    fn set_gear_takes_min_of_explicit_and_table() {
        let mut dt = Drivetrain::default();
        dt.set_gear_table(&[0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        dt.set_gear_slot_index(Some(3));

        dt.set_gear(2, 0.0);
        assert!((dt.state().gear_max_speed - 60.0 * KPH_TO_MPS).abs() < 1.0e-4);

        dt.set_gear(2, 10.0);
        assert_eq!(dt.state().gear_max_speed, 10.0);

        dt.set_gear(2, 30.0);
        assert!((dt.state().gear_max_speed - 60.0 * KPH_TO_MPS).abs() < 1.0e-4);

        dt.set_gear_slot_index(Some(0));
        dt.set_gear(-1, 0.0);
        assert_eq!(dt.state().gear_max_speed, UNLIMITED_SPEED);
        assert_eq!(dt.state().gear_index, -1);
    }

    #[test]
    fn step_without_body_still_updates_inputs() {
        let mut dt = Drivetrain::default();
        let mut frame = ControllerFrame::idle();
        frame.right.trigger = 0.7;
        let out = dt.fixed_step::<dyn VehicleBody>(DT, &frame, Some(90.0), None);
        assert!(out.is_none());
        assert!((dt.state().gas_input - 0.7).abs() < 1.0e-6);
        assert_eq!(dt.state().target_steer, 1.0);
        assert!((dt.state().steering_input - 5.0 * DT).abs() < 1.0e-6);
    }

    #[test]
    fn steer_target_holds_without_wheel() {
        let mut dt = Drivetrain::default();
        let frame = ControllerFrame::idle();
        for _ in 0..10 {
            dt.fixed_step::<dyn VehicleBody>(DT, &frame, Some(45.0), None);
        }
        let held = dt.state().steering_input;
        dt.fixed_step::<dyn VehicleBody>(DT, &frame, None, None);
        assert_eq!(dt.state().target_steer, held);
        assert_eq!(dt.state().steering_input, held);
    }

    #[test]
    fn limited_config_validates() {
        assert!(DrivetrainConfig::default().validate().is_ok());
        let bad = DrivetrainConfig {
            limiter_start_fraction: 0.2,
            ..DrivetrainConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
