// Shared doubles for the cockpit integration tests.
#![allow(dead_code)]

use vehicle::{ControllerFrame, DisplaySink, Hand, HandSample, Pose, Vec3, VehicleBody, WheelId};

// Rough sedan numbers; only used to turn wheel torque into acceleration.
pub const MASS_KG: f32 = 1200.0;
pub const WHEEL_RADIUS_M: f32 = 0.35;

// Records every actuation and integrates a point-mass along the forward axis.
#[derive(Debug, Clone)]
pub struct MockBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub motor: [f32; 4],
    pub brake: [f32; 4],
    pub steer: [f32; 4],
    pub velocity_writes: usize,
}

impl MockBody {
    pub fn at_rest() -> Self {
        Self {
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            forward: Vec3::z(),
            motor: [0.0; 4],
            brake: [0.0; 4],
            steer: [0.0; 4],
            velocity_writes: 0,
        }
    }

    pub fn moving(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..Self::at_rest()
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    pub fn forward_speed(&self) -> f32 {
        self.velocity.dot(&self.forward)
    }

    // Motor torque pushes along forward; brake torque opposes motion without reversing it.
    pub fn integrate(&mut self, dt: f32) {
        let per_newton = dt / (MASS_KG * WHEEL_RADIUS_M);
        let drive: f32 = self.motor.iter().sum();
        self.velocity += self.forward * drive * per_newton;

        let braking: f32 = self.brake.iter().sum::<f32>() * per_newton;
        let speed = self.velocity.norm();
        if speed > 0.0 {
            let slowed = (speed - braking).max(0.0);
            self.velocity *= slowed / speed;
        }
        self.position += self.velocity * dt;
    }
}

impl VehicleBody for MockBody {
    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.velocity_writes += 1;
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }

    fn set_motor_torque(&mut self, wheel: WheelId, torque: f32) {
        self.motor[wheel.index()] = torque;
    }

    fn set_brake_torque(&mut self, wheel: WheelId, torque: f32) {
        self.brake[wheel.index()] = torque;
    }

    fn set_steer_angle(&mut self, wheel: WheelId, degrees: f32) {
        self.steer[wheel.index()] = degrees;
    }

    fn wheel_world_pose(&self, wheel: WheelId) -> Option<Pose> {
        let x = if matches!(wheel, WheelId::FrontLeft | WheelId::RearLeft) { -0.8 } else { 0.8 };
        let z = if wheel.is_front() { 1.3 } else { -1.3 };
        Some(Pose::at(self.position + Vec3::new(x, 0.0, z)))
    }
}

// Last text written to each label.
#[derive(Debug, Default)]
pub struct Labels {
    pub fps: String,
    pub speed: String,
    pub gear: String,
}

impl DisplaySink for Labels {
    fn show_fps(&mut self, text: &str, _heat: f32) {
        self.fps = text.to_string();
    }

    fn show_speed(&mut self, text: &str) {
        self.speed = text.to_string();
    }

    fn show_gear(&mut self, text: &str) {
        self.gear = text.to_string();
    }
}

// Frame builder for scripted hands.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hands(pub ControllerFrame);

impl Hands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, hand: Hand, position: Vec3) -> Self {
        self.0.hand_mut(hand).pose = Some(Pose::at(position));
        self
    }

    pub fn grip(mut self, hand: Hand, grip: f32) -> Self {
        self.0.hand_mut(hand).grip = grip;
        self
    }

    pub fn trigger(mut self, hand: Hand, trigger: f32) -> Self {
        self.0.hand_mut(hand).trigger = trigger;
        self
    }

    pub fn frame(self) -> ControllerFrame {
        self.0
    }
}

pub fn sample(position: Vec3, grip: f32) -> HandSample {
    HandSample {
        pose: Some(Pose::at(position)),
        grip,
        trigger: 0.0,
    }
}
