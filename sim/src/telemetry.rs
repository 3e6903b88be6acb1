//! Log-backed ports for the headless run: dashboard labels and avatar replication.

use bevy::prelude::Resource;
use vehicle::{DisplaySink, Replication};

/// Dashboard labels. A label is logged only when its text changes.
#[derive(Resource, Debug, Default)]
pub struct LogDisplay {
    fps: String,
    speed: String,
    gear: String,
}

impl LogDisplay {
    pub fn speed(&self) -> &str {
        &self.speed
    }

    pub fn gear(&self) -> &str {
        &self.gear
    }
}

fn replace(label: &mut String, text: &str) -> bool {
    if label == text {
        return false;
    }
    label.clear();
    label.push_str(text);
    true
}

impl DisplaySink for LogDisplay {
    fn show_fps(&mut self, text: &str, heat: f32) {
        if replace(&mut self.fps, text) {
            log::debug!("dashboard: {text} (heat {heat:.2})");
        }
    }

    fn show_speed(&mut self, text: &str) {
        if replace(&mut self.speed, text) {
            log::info!("dashboard: {text}");
        }
    }

    fn show_gear(&mut self, text: &str) {
        if replace(&mut self.gear, text) {
            log::info!("dashboard: {text}");
        }
    }
}

/// Stands in for the network layer: visibility changes are only logged.
#[derive(Debug, Default)]
pub struct LogReplication {
    pub avatar_visible: bool,
}

impl Replication for LogReplication {
    fn set_avatar_visible(&mut self, visible: bool) {
        self.avatar_visible = visible;
        log::info!("replication: driver avatar {}", if visible { "shown" } else { "hidden" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_keep_the_latest_text() {
        let mut display = LogDisplay::default();
        display.show_speed("Speed: 12 km/h");
        display.show_speed("Speed: 12 km/h");
        display.show_gear("Gear: 2");
        assert_eq!(display.speed(), "Speed: 12 km/h");
        assert_eq!(display.gear(), "Gear: 2");
    }

    #[test]
    fn replace_reports_changes_only() {
        let mut label = String::from("Gear: N");
        assert!(!replace(&mut label, "Gear: N"));
        assert!(replace(&mut label, "Gear: 1"));
        assert_eq!(label, "Gear: 1");
    }
}
