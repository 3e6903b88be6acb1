// Support configuring Bevy lints within code.
#![cfg_attr(bevy_lint, feature(register_tool), register_tool(bevy))]

mod cockpit;
mod config;
mod driver;
mod physics;
mod telemetry;

use std::time::Duration;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use config::SimConfig;

/// Headless cockpit run: a scripted driver shifts, accelerates, steers and brakes,
/// and every frame is stepped with a fixed duration so runs are reproducible.
fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins(AppPlugin);

    let config = match SimConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return AppExit::error();
        }
    };
    let frames = config.run.frame_count();
    info!(
        "sim: {} s at {} Hz physics, {} Hz frames",
        config.run.duration_secs, config.run.fixed_hz, config.run.frame_hz
    );

    app.insert_resource(Time::<Fixed>::from_hz(config.run.fixed_hz));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
        1.0 / config.run.frame_hz,
    )));
    app.insert_resource(config);

    app.finish();
    app.cleanup();
    for _ in 0..frames {
        app.update();
        if let Some(exit) = app.should_exit() {
            return exit;
        }
    }
    AppExit::Success
}

pub struct AppPlugin;
impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            MinimalPlugins,
            LogPlugin {
                filter: "wgpu=error,naga=warn,bevy_ecs=warn".to_string(),
                ..default()
            },
        ));

        app.add_plugins((
            driver::plugin,
            physics::plugin,
            cockpit::plugin,
        ));
    }
}
