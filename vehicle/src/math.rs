//! Scalar, angle and vector helpers used by the cockpit tick functions.
//!
//! Angles are in degrees unless a name says otherwise. All helpers are total:
//! degenerate inputs (zero-length segments, coincident endpoints) fall back to a
//! neutral result instead of dividing by zero.

use crate::constants::{EPS, MIN_RAIL_LENGTH_SQ};
use crate::types::{Quat, Vec3};

#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Where `v` sits between `a` and `b`, clamped to `[0, 1]`. Returns 0 when `a == b`.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        return 0.0;
    }
    clamp01((v - a) / (b - a))
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        return target;
    }
    current + delta.signum() * max_delta
}

/// Vector flavor of [`move_towards`].
#[inline]
pub fn move_towards_vec(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let dist = delta.norm();
    if dist <= max_delta || dist <= EPS {
        return target;
    }
    current + delta / dist * max_delta
}

/// Wrap `t` into `[0, length)`.
#[inline]
fn repeat(t: f32, length: f32) -> f32 {
    (t - (t / length).floor() * length).clamp(0.0, length)
}

/// Signed shortest angular difference from `current` to `target`, in `(-180, 180]`.
#[inline]
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = repeat(target - current, 360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Normalize any angle into `(-180, 180]`.
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    delta_angle(0.0, angle)
}

/// Interpolate along the shortest arc from `a` to `b`; `t` is clamped to `[0, 1]`.
#[inline]
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    a + delta_angle(a, b) * clamp01(t)
}

/// Cubic ease `u²(3 − 2u)` on a clamped `u`.
#[inline]
pub fn smoothstep(u: f32) -> f32 {
    let u = clamp01(u);
    u * u * (3.0 - 2.0 * u)
}

/// Project `p` onto the segment `a → b`, returning the clamped parameter `t ∈ [0, 1]`.
///
/// The squared length is floored at [`MIN_RAIL_LENGTH_SQ`], so a collapsed segment
/// projects everything to (close to) `t = 0` instead of producing NaN.
#[inline]
pub fn project_onto_segment(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    let ab = b - a;
    let t = (p - a).dot(&ab) / ab.norm_squared().max(MIN_RAIL_LENGTH_SQ);
    clamp01(t)
}

/// Point on `a → b` at parameter `t` (clamped).
#[inline]
pub fn point_on_segment(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a.lerp(&b, clamp01(t))
}

/// Rotation from Euler angles in degrees, applied Z first, then X, then Y.
pub fn euler_deg(euler: Vec3) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), euler.y.to_radians())
        * Quat::from_axis_angle(&Vec3::x_axis(), euler.x.to_radians())
        * Quat::from_axis_angle(&Vec3::z_axis(), euler.z.to_radians())
}

/// Rotation whose local +Z looks along `forward` with local +Y as close to `up` as possible.
///
/// Falls back to identity when `forward` is degenerate.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    if forward.norm_squared() <= EPS * EPS {
        return Quat::identity();
    }
    Quat::face_towards(&forward, &up)
}

/// Rotate `from` toward `to` by at most `max_degrees`.
pub fn rotate_towards(from: Quat, to: Quat, max_degrees: f32) -> Quat {
    let angle = from.angle_to(&to);
    if angle <= EPS {
        return to;
    }
    let t = max_degrees.max(0.0).to_radians() / angle;
    if t >= 1.0 {
        return to;
    }
    from.try_slerp(&to, t, EPS).unwrap_or(to)
}
