//! Tracked-hand input and hand-target arbitration.
//!
//! - [`ControllerFrame`] is the per-tick snapshot delivered by the hand-pose source:
//!   one pose, one grip axis and one trigger axis per hand.
//! - [`HandOverrideLock`] is a per-hand saturating counter. While a hand's count is
//!   non-zero, some control surface (steering wheel, gear lever) owns that hand's
//!   target pose and the tracking driver must not write it.
//! - [`HandTargets`] holds the target poses consumed by the avatar/IK layer.

use crate::constants::GRIP_PRESSED_THRESHOLD;
use crate::math::euler_deg;
use crate::types::{Hand, Pose, Vec3};

/// One hand's input for a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandSample {
    /// World pose of the tracked hand, if tracking is available this tick.
    pub pose: Option<Pose>,
    /// Analog grip axis, `0..1`.
    pub grip: f32,
    /// Analog trigger axis, `0..1`.
    pub trigger: f32,
}

impl HandSample {
    #[inline]
    pub fn grip_pressed(&self) -> bool {
        self.grip > GRIP_PRESSED_THRESHOLD
    }

    #[inline]
    pub fn position(&self) -> Option<Vec3> {
        self.pose.map(|p| p.translation)
    }
}

/// Snapshot of both hands for a tick.
///
/// The right trigger is the throttle and the left trigger is the brake.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControllerFrame {
    pub left: HandSample,
    pub right: HandSample,
}

impl ControllerFrame {
    /// A frame with no tracking and every axis released.
    pub fn idle() -> Self {
        Self::default()
    }

    #[inline]
    pub fn hand(&self, hand: Hand) -> &HandSample {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    #[inline]
    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandSample {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    #[inline]
    pub fn throttle_axis(&self) -> f32 {
        self.right.trigger
    }

    #[inline]
    pub fn brake_axis(&self) -> f32 {
        self.left.trigger
    }
}

/// Grip transition observed this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GripEdge {
    Pressed,
    Released,
    Held,
    Up,
}

impl GripEdge {
    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, GripEdge::Pressed | GripEdge::Held)
    }
}

/// Remembers last tick's grip state so rising/falling edges can be detected.
#[derive(Clone, Copy, Debug, Default)]
pub struct GripLatch {
    prev_pressed: bool,
}

impl GripLatch {
    pub fn update(&mut self, pressed: bool) -> GripEdge {
        let edge = match (self.prev_pressed, pressed) {
            (false, true) => GripEdge::Pressed,
            (true, false) => GripEdge::Released,
            (true, true) => GripEdge::Held,
            (false, false) => GripEdge::Up,
        };
        self.prev_pressed = pressed;
        edge
    }
}

/// Per-hand saturating override counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandOverrideLock {
    counts: [u32; 2],
}

impl HandOverrideLock {
    pub fn begin(&mut self, hand: Hand) {
        let c = &mut self.counts[hand.index()];
        *c = c.saturating_add(1);
    }

    pub fn end(&mut self, hand: Hand) {
        let c = &mut self.counts[hand.index()];
        *c = c.saturating_sub(1);
    }

    #[inline]
    pub fn is_locked(&self, hand: Hand) -> bool {
        self.counts[hand.index()] > 0
    }

    #[inline]
    pub fn count(&self, hand: Hand) -> u32 {
        self.counts[hand.index()]
    }
}

/// Tuning for the tracking driver.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct HandTargetConfig {
    /// Euler offset (degrees) applied on top of the tracked left-hand rotation.
    pub left_offset_euler: Vec3,
    /// Euler offset (degrees) applied on top of the tracked right-hand rotation.
    pub right_offset_euler: Vec3,
    /// Target poses restored when the driver leaves the vehicle.
    pub left_rest: Pose,
    pub right_rest: Pose,
}

impl Default for HandTargetConfig {
    fn default() -> Self {
        Self {
            left_offset_euler: Vec3::new(0.0, 90.0, 90.0),
            right_offset_euler: Vec3::new(0.0, -90.0, -90.0),
            left_rest: Pose::default(),
            right_rest: Pose::default(),
        }
    }
}

/// Target poses for both hands plus the override lock that arbitrates writes to them.
#[derive(Clone, Debug)]
pub struct HandTargets {
    config: HandTargetConfig,
    lock: HandOverrideLock,
    targets: [Pose; 2],
    tracking: bool,
}

impl HandTargets {
    pub fn new(config: HandTargetConfig) -> Self {
        let targets = [config.left_rest, config.right_rest];
        Self {
            config,
            lock: HandOverrideLock::default(),
            targets,
            tracking: false,
        }
    }

    pub fn begin_override(&mut self, hand: Hand) {
        self.lock.begin(hand);
    }

    pub fn end_override(&mut self, hand: Hand) {
        self.lock.end(hand);
    }

    #[inline]
    pub fn is_locked(&self, hand: Hand) -> bool {
        self.lock.is_locked(hand)
    }

    #[inline]
    pub fn lock(&self) -> &HandOverrideLock {
        &self.lock
    }

    #[inline]
    pub fn target(&self, hand: Hand) -> Pose {
        self.targets[hand.index()]
    }

    /// Write a hand target on behalf of the control surface holding that hand's override.
    pub fn drive(&mut self, hand: Hand, pose: Pose) {
        self.targets[hand.index()] = pose;
    }

    /// Enable or disable following the tracked hands (seated / not seated).
    pub fn set_tracking(&mut self, enabled: bool) {
        self.tracking = enabled;
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Copy tracked hand poses into the targets for every hand that is not overridden.
    pub fn follow_tracking(&mut self, frame: &ControllerFrame) {
        if !self.tracking {
            return;
        }
        for hand in Hand::BOTH {
            if self.lock.is_locked(hand) {
                continue;
            }
            let Some(pose) = frame.hand(hand).pose else {
                continue;
            };
            let offset = match hand {
                Hand::Left => self.config.left_offset_euler,
                Hand::Right => self.config.right_offset_euler,
            };
            self.targets[hand.index()] = Pose::new(pose.translation, pose.rotation * euler_deg(offset));
        }
    }

    /// Put both targets back at their rest poses.
    pub fn restore_rest(&mut self) {
        self.targets = [self.config.left_rest, self.config.right_rest];
    }

    /// Drop all overrides and return to rest. Used when the cockpit is re-initialized.
    pub fn reset(&mut self) {
        self.lock = HandOverrideLock::default();
        self.restore_rest();
    }
}
