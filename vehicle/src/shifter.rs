//! Rail-constrained gear lever.
//!
//! The lever lives on a straight rail between two points and has one anchor per gear
//! slot. A hand grabs it with a grip rising edge, slides it along the rail, and on
//! release it eases (smoothstep) onto the nearest anchor's off-rail coordinates. Each
//! landing pushes the resolved gear to a [`GearReceiver`].
//!
//! # Frames
//! Off-rail snapping happens in a "snap frame": world space, or the lever's parent frame
//! when `snap_in_local_space` is set. The rail axis is `rail_end - rail_start` in that
//! frame and may point anywhere. Holding moves the lever only along the rail axis;
//! snapping eases only the components perpendicular to it.
//!
//! # Slots
//! Slot → gear: reverse slot ⇒ −1, neutral slot ⇒ 0, every other slot ⇒ 1, 2, … in
//! order. See [`SlotLayout::resolve`] for how unconfigured or colliding special slots
//! are placed.

use crate::constants::{KPH_TO_MPS, MIN_RAIL_LENGTH_SQ, MIN_SNAP_DURATION};
use crate::drivetrain::GearReceiver;
use crate::gear_table::fit_to_slot_count;
use crate::hands::{ControllerFrame, GripEdge, GripLatch, HandTargets};
use crate::math::{
    clamp01, euler_deg, move_towards_vec, point_on_segment, project_onto_segment, rotate_towards,
    smoothstep,
};
use crate::types::{Hand, Pose, Quat, Vec3};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct ShifterConfig {
    /// Initial lever pose in world space.
    pub lever: Pose,
    /// Frame the lever is mounted in; used when `snap_in_local_space` is set.
    pub parent: Pose,
    /// Rail endpoints in world space.
    pub rail_start: Vec3,
    pub rail_end: Vec3,
    /// One anchor per gear slot, in world space.
    pub slot_anchors: Vec<Vec3>,
    pub grab_radius: f32,
    /// Hand-to-lever distance that drops the grab. `0` disables the distance check.
    pub release_radius: f32,
    /// Seconds for the release snap. `0` snaps instantly.
    pub snap_duration: f32,
    pub snap_in_local_space: bool,
    /// Per-slot max speeds in km/h, fitted to the slot count.
    pub gear_max_speed_kph: Vec<f32>,
    pub neutral_slot: Option<usize>,
    pub reverse_slot: Option<usize>,
    pub highlight_nearest_while_holding: bool,
    pub highlight_nearest_while_snapping: bool,
    /// Pin the holding hand's target pose to the lever.
    pub drive_target_while_holding: bool,
    pub drive_target_rotation: bool,
    pub target_world_offset: Vec3,
    pub target_euler_offset: Vec3,
    /// Hand-target follow rate (m/s, and `60 ×` that in deg/s). `0` is instant.
    pub target_follow_speed: f32,
}

impl Default for ShifterConfig {
    fn default() -> Self {
        // A straight six-slot gate along +X, slots alternating either side of the rail.
        let slot_anchors = (0..6)
            .map(|i| Vec3::new(0.1 * i as f32, 0.0, if i % 2 == 0 { 0.02 } else { -0.02 }))
            .collect();
        Self {
            lever: Pose::default(),
            parent: Pose::default(),
            rail_start: Vec3::zeros(),
            rail_end: Vec3::new(0.5, 0.0, 0.0),
            slot_anchors,
            grab_radius: 0.25,
            release_radius: 0.4,
            snap_duration: 0.1,
            snap_in_local_space: true,
            gear_max_speed_kph: vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0],
            neutral_slot: Some(0),
            reverse_slot: None,
            highlight_nearest_while_holding: true,
            highlight_nearest_while_snapping: true,
            drive_target_while_holding: true,
            drive_target_rotation: true,
            target_world_offset: Vec3::zeros(),
            target_euler_offset: Vec3::zeros(),
            target_follow_speed: 0.0,
        }
    }
}

impl ShifterConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.grab_radius < 0.0 || self.release_radius < 0.0 {
            return Err("Shifter grab/release radius is negative");
        }
        if self.snap_duration < 0.0 {
            return Err("Shifter snap_duration is negative");
        }
        if self.target_follow_speed < 0.0 {
            return Err("Shifter target_follow_speed is negative");
        }
        if self.slot_anchors.is_empty() {
            return Err("Shifter has no slot anchors");
        }
        Ok(())
    }
}

/// Where reverse and neutral sit among the slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotLayout {
    pub count: usize,
    pub reverse: Option<usize>,
    pub neutral: Option<usize>,
}

impl SlotLayout {
    /// Place the special slots.
    ///
    /// - reverse: the configured slot (clamped), else slot 0.
    /// - neutral: the configured slot (clamped), else the slot after reverse when
    ///   reverse is slot 0, else slot 0.
    /// - A configured neutral that lands on reverse moves one slot down (or to slot 1
    ///   when it was slot 0); an unconfigured one is re-derived as above.
    pub fn resolve(count: usize, reverse: Option<usize>, neutral: Option<usize>) -> Self {
        if count == 0 {
            return Self {
                count,
                reverse: None,
                neutral: None,
            };
        }
        let last = count - 1;
        let after_reverse = |r: usize| if r == 0 && count > 1 { 1 } else { 0 };

        let rev = reverse.map_or(0, |r| r.min(last));
        let mut neu = neutral.map_or_else(|| after_reverse(rev), |n| n.min(last));
        if neu == rev {
            neu = match neutral {
                Some(_) if neu == 0 && count > 1 => 1,
                Some(_) => neu.saturating_sub(1),
                None => after_reverse(rev),
            };
        }
        Self {
            count,
            reverse: Some(rev),
            neutral: Some(neu),
        }
    }

    /// Signed gear ordinal for `slot`: −1 reverse, 0 neutral, 1.. forward.
    pub fn gear_for_slot(&self, slot: usize) -> i32 {
        if Some(slot) == self.reverse {
            return -1;
        }
        if Some(slot) == self.neutral {
            return 0;
        }
        let mut ordinal = 0;
        for i in 0..self.count {
            if Some(i) == self.reverse || Some(i) == self.neutral {
                continue;
            }
            ordinal += 1;
            if i == slot {
                return ordinal;
            }
        }
        ordinal
    }

    /// Clamp a slot index into range. With no slots the index is passed through.
    #[inline]
    pub fn clamp_slot(&self, slot: usize) -> usize {
        if self.count == 0 { slot } else { slot.min(self.count - 1) }
    }
}

/// Lever state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeverPhase {
    Idle,
    Holding {
        hand: Hand,
    },
    /// Easing toward `pending`'s anchor; `from`/`to` are in the snap frame.
    Snapping {
        pending: usize,
        from: Vec3,
        to: Vec3,
        clock: f32,
    },
}

#[derive(Clone, Debug)]
pub struct GearShifter {
    config: ShifterConfig,
    layout: SlotLayout,
    latches: [GripLatch; 2],
    phase: LeverPhase,
    lever: Vec3,
    current_slot: usize,
    highlighted: Option<usize>,
}

impl GearShifter {
    pub fn new(mut config: ShifterConfig) -> Self {
        let count = config.slot_anchors.len();
        config.gear_max_speed_kph = fit_to_slot_count(&config.gear_max_speed_kph, count);
        let layout = SlotLayout::resolve(count, config.reverse_slot, config.neutral_slot);
        let lever = config.lever.translation;
        Self {
            config,
            layout,
            latches: [GripLatch::default(); 2],
            phase: LeverPhase::Idle,
            lever,
            current_slot: 0,
            highlighted: None,
        }
    }

    /// Force the lever onto the neutral slot and push that gear.
    pub fn activate(&mut self, receiver: &mut impl GearReceiver) {
        self.phase = LeverPhase::Idle;
        self.latches = [GripLatch::default(); 2];
        self.lever = self.config.lever.translation;
        self.current_slot = self.layout.neutral.unwrap_or(0);
        if let Some(anchor) = self.config.slot_anchors.get(self.current_slot) {
            let from = self.to_snap_frame(self.lever);
            let to = self.snap_target(from, *anchor);
            self.lever = self.from_snap_frame(to);
        }
        self.push_gear(self.current_slot, receiver);
        self.highlighted = Some(self.current_slot);
    }

    /// Advance one tick.
    pub fn tick(
        &mut self,
        dt: f32,
        frame: &ControllerFrame,
        targets: &mut HandTargets,
        receiver: &mut impl GearReceiver,
    ) {
        let dt = dt.max(0.0);
        let edges = Hand::BOTH.map(|hand| self.latches[hand.index()].update(frame.hand(hand).grip_pressed()));

        match self.phase {
            LeverPhase::Holding { hand } => {
                let position = frame.hand(hand).position();
                let r = self.config.release_radius;
                let released = !edges[hand.index()].is_down()
                    || match position {
                        None => true,
                        Some(p) => r > 0.0 && (p - self.lever).norm_squared() > r * r,
                    };
                match position {
                    Some(p) if !released => self.hold(dt, hand, p, targets),
                    _ => self.end_grab(hand, targets, receiver),
                }
            }
            LeverPhase::Idle | LeverPhase::Snapping { .. } => {
                for hand in Hand::BOTH {
                    if edges[hand.index()] == GripEdge::Pressed && self.try_begin_grab(hand, frame, targets) {
                        break;
                    }
                }
            }
        }

        match self.phase {
            LeverPhase::Holding { .. } => {}
            LeverPhase::Snapping { .. } => self.update_snap(dt, receiver),
            LeverPhase::Idle => self.highlighted = Some(self.current_slot),
        }
    }

    #[inline]
    pub fn phase(&self) -> LeverPhase {
        self.phase
    }

    #[inline]
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    #[inline]
    pub fn config(&self) -> &ShifterConfig {
        &self.config
    }

    /// Per-slot km/h table after fitting to the slot count.
    #[inline]
    pub fn gear_table_kph(&self) -> &[f32] {
        &self.config.gear_max_speed_kph
    }

    #[inline]
    pub fn lever_position(&self) -> Vec3 {
        self.lever
    }

    /// Lever pose; the lever translates but never rotates.
    pub fn lever_pose(&self) -> Pose {
        Pose::new(self.lever, self.config.lever.rotation)
    }

    /// Lever's normalized position along the rail.
    pub fn rail_position(&self) -> f32 {
        project_onto_segment(self.lever, self.config.rail_start, self.config.rail_end)
    }

    pub fn holding_hand(&self) -> Option<Hand> {
        match self.phase {
            LeverPhase::Holding { hand } => Some(hand),
            _ => None,
        }
    }

    #[inline]
    pub fn is_snapping(&self) -> bool {
        matches!(self.phase, LeverPhase::Snapping { .. })
    }

    /// Linear snap progress in `[0, 1]`; 0 when not snapping.
    pub fn snap_progress(&self) -> f32 {
        match self.phase {
            LeverPhase::Snapping { clock, .. } => clamp01(clock / self.snap_duration()),
            _ => 0.0,
        }
    }

    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn pending_slot(&self) -> Option<usize> {
        match self.phase {
            LeverPhase::Snapping { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// The single indicator lit this tick.
    #[inline]
    pub fn highlighted_slot(&self) -> Option<usize> {
        self.highlighted
    }

    /// Gear ordinal of the current slot.
    pub fn current_gear(&self) -> i32 {
        self.layout.gear_for_slot(self.current_slot)
    }

    /// Max speed (km/h, non-negative) for `slot`; 0 for neutral or an empty table.
    pub fn slot_kph(&self, slot: usize) -> f32 {
        if Some(slot) == self.layout.neutral {
            return 0.0;
        }
        let table = &self.config.gear_max_speed_kph;
        match table.last() {
            None => 0.0,
            Some(&last) => table.get(slot).copied().unwrap_or(last).abs(),
        }
    }

    fn snap_duration(&self) -> f32 {
        self.config.snap_duration.max(MIN_SNAP_DURATION)
    }

    fn try_begin_grab(&mut self, hand: Hand, frame: &ControllerFrame, targets: &mut HandTargets) -> bool {
        let Some(position) = frame.hand(hand).position() else {
            return false;
        };
        let r = self.config.grab_radius;
        if (position - self.lever).norm_squared() > r * r {
            return false;
        }
        // Grabbing mid-snap abandons the pending slot.
        self.phase = LeverPhase::Holding { hand };
        targets.begin_override(hand);
        log::debug!("shifter: {hand:?} hand grabbed the lever");
        true
    }

    fn hold(&mut self, dt: f32, hand: Hand, position: Vec3, targets: &mut HandTargets) {
        let (a, b) = (self.config.rail_start, self.config.rail_end);
        let rail_point = point_on_segment(a, b, project_onto_segment(position, a, b));
        let lever = self.to_snap_frame(self.lever);
        let on_rail = self.with_rail_coordinate(lever, self.to_snap_frame(rail_point));
        self.lever = self.from_snap_frame(on_rail);

        if self.config.drive_target_while_holding {
            self.drive_hand_target(dt, hand, targets);
        }
        self.highlighted = if self.config.highlight_nearest_while_holding {
            self.nearest_slot().or(Some(self.current_slot))
        } else {
            Some(self.current_slot)
        };
    }

    fn drive_hand_target(&self, dt: f32, hand: Hand, targets: &mut HandTargets) {
        let desired_pos = self.lever + self.config.target_world_offset;
        let desired_rot = self.config.lever.rotation * euler_deg(self.config.target_euler_offset);
        let current = targets.target(hand);
        let speed = self.config.target_follow_speed;

        let (translation, rotation): (Vec3, Quat) = if speed > 0.0 {
            let step = speed * dt;
            let rotation = if self.config.drive_target_rotation {
                rotate_towards(current.rotation, desired_rot, step * 60.0)
            } else {
                current.rotation
            };
            (move_towards_vec(current.translation, desired_pos, step), rotation)
        } else {
            let rotation = if self.config.drive_target_rotation {
                desired_rot
            } else {
                current.rotation
            };
            (desired_pos, rotation)
        };
        targets.drive(hand, Pose::new(translation, rotation));
    }

    fn end_grab(&mut self, hand: Hand, targets: &mut HandTargets, receiver: &mut impl GearReceiver) {
        targets.end_override(hand);
        self.phase = LeverPhase::Idle;
        log::debug!("shifter: {hand:?} hand released the lever");
        self.begin_snap(receiver);
    }

    fn begin_snap(&mut self, receiver: &mut impl GearReceiver) {
        let Some(pending) = self.nearest_slot() else {
            return;
        };
        let anchor = self.config.slot_anchors[pending];
        let from = self.to_snap_frame(self.lever);
        let to = self.snap_target(from, anchor);

        if self.config.snap_duration <= 0.0 {
            self.lever = self.from_snap_frame(to);
            self.select_slot(pending, receiver);
            return;
        }
        self.phase = LeverPhase::Snapping {
            pending,
            from,
            to,
            clock: 0.0,
        };
    }

    fn update_snap(&mut self, dt: f32, receiver: &mut impl GearReceiver) {
        let LeverPhase::Snapping {
            pending,
            from,
            to,
            clock,
        } = self.phase
        else {
            return;
        };
        let clock = clock + dt;
        let u = smoothstep(clock / self.snap_duration());
        let lever = self.to_snap_frame(self.lever);
        let eased = self.with_rail_coordinate(from.lerp(&to, u), lever);
        self.lever = self.from_snap_frame(eased);

        self.highlighted = if self.config.highlight_nearest_while_snapping {
            self.nearest_slot().or(Some(self.current_slot))
        } else {
            Some(pending)
        };

        if u >= 1.0 {
            self.select_slot(pending, receiver);
        } else {
            self.phase = LeverPhase::Snapping {
                pending,
                from,
                to,
                clock,
            };
        }
    }

    fn select_slot(&mut self, slot: usize, receiver: &mut impl GearReceiver) {
        self.phase = LeverPhase::Idle;
        self.current_slot = slot;
        self.highlighted = Some(slot);
        self.push_gear(slot, receiver);
    }

    fn push_gear(&self, slot: usize, receiver: &mut impl GearReceiver) {
        receiver.set_gear_table(&self.config.gear_max_speed_kph);
        let slot = self.layout.clamp_slot(slot);
        receiver.set_gear_slot_index(Some(slot));
        let gear = self.layout.gear_for_slot(slot);
        let kph = self.slot_kph(slot);
        let max_speed = if kph > 0.0 { kph * KPH_TO_MPS } else { 0.0 };
        receiver.set_gear(gear, max_speed);
        log::info!("shifter: slot {slot} -> gear {gear} (max {kph:.0} km/h)");
    }

    fn nearest_slot(&self) -> Option<usize> {
        self.config
            .slot_anchors
            .iter()
            .enumerate()
            .map(|(i, anchor)| (i, (anchor - self.lever).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Anchor's off-rail coordinates with `from`'s rail coordinate, in the snap frame.
    fn snap_target(&self, from: Vec3, anchor_world: Vec3) -> Vec3 {
        self.with_rail_coordinate(self.to_snap_frame(anchor_world), from)
    }

    /// `off_rail` moved along the rail axis to `rail`'s rail coordinate, in the snap frame.
    fn with_rail_coordinate(&self, off_rail: Vec3, rail: Vec3) -> Vec3 {
        let axis = self.rail_axis();
        off_rail + axis * (rail - off_rail).dot(&axis)
    }

    /// Unit rail direction in the snap frame. Degenerate rails fall back to X.
    fn rail_axis(&self) -> Vec3 {
        let along = self.to_snap_frame(self.config.rail_end) - self.to_snap_frame(self.config.rail_start);
        if along.norm_squared() < MIN_RAIL_LENGTH_SQ {
            Vec3::x()
        } else {
            along.normalize()
        }
    }

    fn to_snap_frame(&self, world: Vec3) -> Vec3 {
        if self.config.snap_in_local_space {
            self.config.parent.iso().inverse_transform_point(&world.into()).coords
        } else {
            world
        }
    }

    fn from_snap_frame(&self, snap: Vec3) -> Vec3 {
        if self.config.snap_in_local_space {
            self.config.parent.iso().transform_point(&snap.into()).coords
        } else {
            snap
        }
    }
}
