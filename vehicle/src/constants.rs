/// Multiplier converting a display speed in km/h into m/s.
///
/// Gear tables are authored in km/h and stored once in m/s.
pub const KPH_TO_MPS: f32 = 0.277_777_78;

/// Multiplier converting m/s into km/h for readouts.
pub const MPS_TO_KPH: f32 = 3.6;

/// Multiplier converting m/s into mph for readouts.
pub const MPS_TO_MPH: f32 = 2.236_936_3;

/// Sentinel speed limit meaning "no cap for this gear".
///
/// Any limit `<= 0.0` is treated as unlimited; this is the canonical value we store.
pub const UNLIMITED_SPEED: f32 = -1.0;

/// Analog grip axis value above which a hand counts as "grabbing".
pub const GRIP_PRESSED_THRESHOLD: f32 = 0.5;

/// Throttle/brake values at or below this are treated as released (coast drag, idle brake).
pub const PEDAL_EPS: f32 = 1.0e-4;

/// Share of total brake torque applied to the front axle. The rear gets the remainder.
pub const FRONT_BRAKE_SHARE: f32 = 0.7;

/// Share of total brake torque applied to the rear axle.
pub const REAR_BRAKE_SHARE: f32 = 0.3;

/// Within this many m/s of a gear cap, motor torque is cut entirely.
pub const LIMITER_CUTOFF_MARGIN_MPS: f32 = 0.01;

/// Squared speed (m^2/s^2) below which the velocity cap does not bother correcting.
pub const VELOCITY_EPS_SQ: f32 = 1.0e-4;

/// Wheel angle (degrees) under which a released wheel may come to rest.
pub const WHEEL_REST_ANGLE_DEG: f32 = 0.1;

/// Wheel angular speed (deg/s) under which a released wheel may come to rest.
pub const WHEEL_REST_VELOCITY_DEG: f32 = 0.01;

/// Smallest squared rail length (m^2) used when projecting onto the shifter rail.
pub const MIN_RAIL_LENGTH_SQ: f32 = 1.0e-4;

/// Smallest squared radial length (m^2) accepted when building a rim pose.
pub const MIN_RADIAL_SQ: f32 = 1.0e-8;

/// Lower bound on the snap duration divisor, in seconds.
pub const MIN_SNAP_DURATION: f32 = 1.0e-4;

/// Practical small value for float comparisons.
pub const EPS: f32 = 1.0e-6;
