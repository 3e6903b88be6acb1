use bevy::prelude::*;
use vehicle::{Cockpit, Hand, Pose, WheelId};

use crate::config::SimConfig;
use crate::driver::ControllerInput;
use crate::physics::{self, RapierVehicle};
use crate::telemetry::{LogDisplay, LogReplication};

#[derive(Resource, Debug)]
pub struct CockpitRig(pub Cockpit<LogReplication>);

/// Scene object posed from the cockpit every frame.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CockpitPart {
    Wheel(WheelId),
    SteeringWheel,
    Lever,
    Hand(Hand),
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<LogDisplay>();
    app.add_systems(Startup, setup);
    app.add_systems(FixedUpdate, (drive_vehicle, physics::step).chain());
    app.add_systems(Update, present);
}

fn setup(mut commands: Commands, config: Res<SimConfig>) {
    let mut cockpit = Cockpit::configure(config.cockpit.clone(), LogReplication::default());
    cockpit.activate();
    cockpit.on_driver_seated(true);
    commands.insert_resource(CockpitRig(cockpit));

    let parts = WheelId::ALL
        .map(CockpitPart::Wheel)
        .into_iter()
        .chain([
            CockpitPart::SteeringWheel,
            CockpitPart::Lever,
            CockpitPart::Hand(Hand::Left),
            CockpitPart::Hand(Hand::Right),
        ]);
    for part in parts {
        commands.spawn((Name::new(format!("{part:?}")), part, Transform::default()));
    }
}

fn drive_vehicle(
    time: Res<Time>,
    config: Res<SimConfig>,
    input: Res<ControllerInput>,
    mut rig: ResMut<CockpitRig>,
    mut car: ResMut<RapierVehicle>,
    mut ticks: Local<u32>,
) {
    let car: &mut RapierVehicle = &mut car;
    let Some(out) = rig.0.fixed_step(time.delta_secs(), &input.0, Some(car)) else {
        return;
    };

    // Roughly once per simulated second.
    *ticks += 1;
    if *ticks >= config.run.fixed_hz.round() as u32 {
        *ticks = 0;
        let state = rig.0.drivetrain().state();
        info!(
            "drive: gear {} slot {:?} | {:.1} m/s | motor {:.0} brake {:.0}/{:.0} | steer {:.1} deg",
            state.gear_index,
            state.gear_slot,
            out.velocity.norm(),
            out.motor_torque,
            out.brake.front,
            out.brake.rear,
            out.steer_angle,
        );
    }
}

fn present(
    time: Res<Time<Real>>,
    input: Res<ControllerInput>,
    car: Res<RapierVehicle>,
    mut rig: ResMut<CockpitRig>,
    mut display: ResMut<LogDisplay>,
    mut parts: Query<(&CockpitPart, &mut Transform)>,
) {
    let frame = rig
        .0
        .presentation_step(time.delta_secs(), &input.0, Some(&*car), &mut *display);

    let cockpit = &rig.0;
    for (part, mut transform) in &mut parts {
        let pose = match *part {
            CockpitPart::Wheel(wheel) => frame.wheel_poses[wheel.index()],
            CockpitPart::SteeringWheel => Some(Pose::new(
                cockpit.wheel().config().mount.translation,
                cockpit.wheel().wheel_rotation(),
            )),
            CockpitPart::Lever => Some(cockpit.shifter().lever_pose()),
            CockpitPart::Hand(hand) => Some(cockpit.hands().target(hand)),
        };
        if let Some(pose) = pose {
            *transform = to_transform(&pose);
        }
    }
}

pub fn to_transform(pose: &Pose) -> Transform {
    let (t, r) = (pose.translation, pose.rotation);
    Transform::from_xyz(t.x, t.y, t.z).with_rotation(Quat::from_xyzw(r.i, r.j, r.k, r.w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_matches_pose() {
        let pose = Pose::new(
            vehicle::Vec3::new(1.0, 2.0, 3.0),
            vehicle::Quat::from_axis_angle(&vehicle::Vec3::y_axis(), 0.5),
        );
        let transform = to_transform(&pose);
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
        let expected = Quat::from_rotation_y(0.5);
        assert!(transform.rotation.angle_between(expected) < 1.0e-5);
    }
}
