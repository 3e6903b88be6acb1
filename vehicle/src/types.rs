/*!
Core value types and math aliases shared by the cockpit components.

This module contains no algorithms. It defines the data exchanged between
- the hand-pose source (tracked hands, grips, triggers)
- the steering wheel and gear shifter (hand targets, gear pushes)
- the drivetrain and the external vehicle body (wheel actuation)
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// A rigid pose (position + orientation) in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// A pose at `translation` with identity rotation.
    #[inline]
    pub fn at(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(na::Translation3::from(self.translation), self.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::zeros())
    }
}

impl From<Iso> for Pose {
    fn from(iso: Iso) -> Self {
        Self::new(iso.translation.vector, iso.rotation)
    }
}

/// Which tracked hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Both hands in the order components poll them (left first).
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    /// Stable array index for per-hand storage.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

/// Wheel identification. Front wheels steer and carry most of the braking;
/// rear wheels are driven.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WheelId {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelId {
    pub const ALL: [WheelId; 4] = [
        WheelId::FrontLeft,
        WheelId::FrontRight,
        WheelId::RearLeft,
        WheelId::RearRight,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            WheelId::FrontLeft => 0,
            WheelId::FrontRight => 1,
            WheelId::RearLeft => 2,
            WheelId::RearRight => 3,
        }
    }

    #[inline]
    pub fn is_front(self) -> bool {
        matches!(self, WheelId::FrontLeft | WheelId::FrontRight)
    }

    #[inline]
    pub fn is_rear(self) -> bool {
        !self.is_front()
    }
}
