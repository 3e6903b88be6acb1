//! Rapier chassis standing in for the car body.
//!
//! The chassis is a single dynamic rigid body with zero gravity and only yaw rotation
//! enabled; the cockpit never simulates contact, so neither do we. Each fixed tick turns
//! the wheel actuation written by the drivetrain into velocity changes, then lets Rapier
//! integrate the pose.
//!
//! Conventions
//! - Forward is the chassis +Z axis, up is +Y, left is +X.
//! - Positive steer angles turn right.
//! - Motor torque drives along forward; brake torque opposes rolling but never reverses it.

use bevy::prelude::{App, Commands, Res, ResMut, Resource, Startup, Time};
use nalgebra::Quaternion;
use rapier3d::prelude::*;
use vehicle::{Pose, Quat, Vec3, VehicleBody, WheelId};

use crate::config::{ChassisConfig, SimConfig};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_chassis);
}

fn spawn_chassis(mut commands: Commands, config: Res<SimConfig>) {
    commands.insert_resource(RapierVehicle::new(&config.chassis));
    log::info!(
        "physics: chassis {} kg, wheelbase {} m",
        config.chassis.mass,
        config.chassis.wheelbase
    );
}

/// Advance the chassis by one fixed tick. Runs after the cockpit has actuated the wheels.
pub fn step(time: Res<Time>, mut car: ResMut<RapierVehicle>) {
    car.step(time.delta_secs());
}

#[derive(Clone, Copy, Debug, Default)]
struct WheelState {
    /// Hub position in the chassis frame.
    offset: Vec3,
    motor: f32,
    brake: f32,
    steer: f32,
    /// Accumulated roll angle (radians) for the visuals.
    spin: f32,
}

#[derive(Resource)]
pub struct RapierVehicle {
    chassis_config: ChassisConfig,
    wheels: [WheelState; 4],

    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    chassis: RigidBodyHandle,
}

impl RapierVehicle {
    pub fn new(config: &ChassisConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Chassis rests with its wheels' bottoms at y = 0.
        let ride_height = config.wheel_radius - config.wheel_height;
        let rb = RigidBodyBuilder::dynamic()
            .pose(Isometry::translation(0.0, ride_height, 0.0))
            .enabled_rotations(false, true, false)
            .build();
        let chassis = bodies.insert(rb);

        let [hx, hy, hz] = config.half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz).mass(config.mass).build();
        colliders.insert_with_parent(collider, chassis, &mut bodies);

        let half_track = config.track * 0.5;
        let half_base = config.wheelbase * 0.5;
        let wheels = WheelId::ALL.map(|wheel| {
            let x = if matches!(wheel, WheelId::FrontLeft | WheelId::RearLeft) {
                half_track
            } else {
                -half_track
            };
            let z = if wheel.is_front() { half_base } else { -half_base };
            WheelState {
                offset: Vec3::new(x, config.wheel_height, z),
                ..WheelState::default()
            }
        });

        Self {
            chassis_config: config.clone(),
            wheels,
            gravity: Vector::zeros(),
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            chassis,
        }
    }

    /// Chassis pose in world space.
    pub fn chassis_pose(&self) -> Option<Pose> {
        let body = self.bodies.get(self.chassis)?;
        Some(Pose::new(from_rapier(body.translation()), from_rapier_rotation(body.rotation())))
    }

    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let config = &self.chassis_config;
        let Some(body) = self.bodies.get_mut(self.chassis) else {
            return;
        };

        let forward = body.rotation() * Vector::<Real>::z();
        let velocity = *body.linvel();
        let mut along = velocity.dot(&forward);
        let mut lateral = velocity - forward * along;
        let per_newton = dt / config.mass;

        // 1) Drive force from wheel torque.
        let drive: f32 = self.wheels.iter().map(|w| w.motor).sum();
        along += drive / config.wheel_radius * per_newton;

        // 2) Brakes shed speed down to zero and stop there.
        let braking: f32 = self.wheels.iter().map(|w| w.brake.max(0.0)).sum();
        let shed = braking / config.wheel_radius * per_newton;
        along = along.signum() * (along.abs() - shed).max(0.0);

        // 3) Tyres bleed sideways slip.
        lateral *= (1.0 - config.lateral_grip * dt).clamp(0.0, 1.0);

        // 4) Yaw from the front steer angle (bicycle model).
        let front = [WheelId::FrontLeft, WheelId::FrontRight];
        let steer = front.iter().map(|w| self.wheels[w.index()].steer).sum::<f32>() * 0.5;
        let yaw_rate = -along * steer.to_radians().tan() / config.wheelbase;

        body.set_linvel(forward * along + lateral, true);
        body.set_angvel(Vector::<Real>::y() * yaw_rate, true);

        let roll = along / config.wheel_radius * dt;
        for wheel in &mut self.wheels {
            wheel.spin = (wheel.spin + roll) % std::f32::consts::TAU;
        }

        self.params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            &(),
            &(),
        );
    }
}

impl VehicleBody for RapierVehicle {
    fn linear_velocity(&self) -> Vec3 {
        self.bodies
            .get(self.chassis)
            .map_or_else(Vec3::zeros, |b| from_rapier(b.linvel()))
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(self.chassis) {
            body.set_linvel(to_rapier(velocity), true);
        }
    }

    fn forward(&self) -> Vec3 {
        self.chassis_pose()
            .map_or_else(Vec3::z, |pose| pose.rotation * Vec3::z())
    }

    fn set_motor_torque(&mut self, wheel: WheelId, torque: f32) {
        self.wheels[wheel.index()].motor = torque;
    }

    fn set_brake_torque(&mut self, wheel: WheelId, torque: f32) {
        self.wheels[wheel.index()].brake = torque;
    }

    fn set_steer_angle(&mut self, wheel: WheelId, degrees: f32) {
        self.wheels[wheel.index()].steer = degrees;
    }

    fn wheel_world_pose(&self, wheel: WheelId) -> Option<Pose> {
        let chassis = self.chassis_pose()?;
        let state = &self.wheels[wheel.index()];
        let steer = Quat::from_axis_angle(&Vec3::y_axis(), -state.steer.to_radians());
        let roll = Quat::from_axis_angle(&Vec3::x_axis(), state.spin);
        Some(Pose::new(
            chassis.translation + chassis.rotation * state.offset,
            chassis.rotation * steer * roll,
        ))
    }
}

#[inline]
fn to_rapier(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

#[inline]
fn from_rapier(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

#[inline]
fn from_rapier_rotation(r: &Rotation<Real>) -> Quat {
    Quat::new_normalize(Quaternion::new(r.w, r.i, r.j, r.k))
}
