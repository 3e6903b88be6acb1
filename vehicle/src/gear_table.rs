//! Per-slot maximum forward speeds.
//!
//! # Model
//! - Tables are authored in km/h, one entry per shifter slot, and stored in m/s.
//! - A slot with a non-positive (or zero) entry is unlimited.
//! - Lookups past the end of the table clamp to the last entry.
//! - An empty table, or a missing slot, is unlimited.

use crate::constants::{KPH_TO_MPS, UNLIMITED_SPEED};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GearTable {
    limits_mps: Vec<f32>,
}

impl GearTable {
    pub fn new(values_kph: &[f32]) -> Self {
        let mut table = Self::default();
        table.set_table(values_kph);
        table
    }

    /// Replace the table with `values_kph`, converting each entry to m/s.
    ///
    /// The sign of an entry is ignored; zero stores as [`UNLIMITED_SPEED`].
    pub fn set_table(&mut self, values_kph: &[f32]) {
        self.limits_mps.clear();
        self.limits_mps.extend(values_kph.iter().map(|&kph| {
            let kph = kph.abs();
            if kph > 0.0 {
                kph * KPH_TO_MPS
            } else {
                UNLIMITED_SPEED
            }
        }));
    }

    /// Speed limit (m/s) for `slot`, or [`UNLIMITED_SPEED`].
    pub fn lookup(&self, slot: Option<usize>) -> f32 {
        let (Some(slot), Some(&last)) = (slot, self.limits_mps.last()) else {
            return UNLIMITED_SPEED;
        };
        self.limits_mps.get(slot).copied().unwrap_or(last)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.limits_mps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.limits_mps.is_empty()
    }
}

/// Resize an authored km/h array so it has exactly `slot_count` entries.
///
/// Missing trailing entries repeat the last authored value (or 0 if none). A zero
/// `slot_count` leaves the values untouched.
pub fn fit_to_slot_count(values_kph: &[f32], slot_count: usize) -> Vec<f32> {
    if slot_count == 0 || values_kph.len() == slot_count {
        return values_kph.to_vec();
    }
    let fallback = values_kph.last().copied().unwrap_or(0.0);
    (0..slot_count)
        .map(|i| values_kph.get(i).copied().unwrap_or(fallback))
        .collect()
}

/// Whether a stored limit actually caps speed.
#[inline]
pub fn is_limited(limit_mps: f32) -> bool {
    limit_mps > 0.0
}
