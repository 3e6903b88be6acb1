mod support;

use support::{Hands, Labels, MockBody};
use vehicle::{
    Cockpit, CockpitConfig, ControllerFrame, Drivetrain, DrivetrainConfig, GearReceiver, Hand, KPH_TO_MPS,
    NullReplication, Pose, SteeringConfig, Vec3, VehicleBody, WheelId,
};

const DT: f32 = 1.0 / 60.0;
const WHEEL_MOUNT: Vec3 = Vec3::new(0.0, 1.0, 0.5);

// Wheel mounted well away from the lever so one hand never reaches both.
fn config() -> CockpitConfig {
    CockpitConfig {
        steering: SteeringConfig {
            mount: Pose::at(WHEEL_MOUNT),
            ..SteeringConfig::default()
        },
        ..CockpitConfig::default()
    }
}

fn seated_cockpit() -> Cockpit {
    let mut cockpit = Cockpit::configure(config(), NullReplication);
    cockpit.activate();
    cockpit.on_driver_seated(true);
    cockpit
}

fn step(cockpit: &mut Cockpit, body: &mut MockBody, frame: &ControllerFrame) {
    cockpit.fixed_step(DT, frame, Some(body));
    body.integrate(DT);
}

fn on_rim(angle_deg: f32) -> Vec3 {
    let a = angle_deg.to_radians();
    WHEEL_MOUNT + Vec3::new(a.cos() * 0.18, a.sin() * 0.18, 0.0)
}

#[test]
fn shifting_to_slot_three_caps_forward_speed() {
    let mut cockpit = seated_cockpit();
    let mut body = MockBody::at_rest();

    let lever = cockpit.shifter().lever_position();
    let slot3 = Vec3::new(0.3, 0.0, -0.02);
    step(&mut cockpit, &mut body, &Hands::new().at(Hand::Right, lever).grip(Hand::Right, 1.0).frame());
    step(&mut cockpit, &mut body, &Hands::new().at(Hand::Right, slot3).grip(Hand::Right, 1.0).frame());
    for _ in 0..20 {
        step(&mut cockpit, &mut body, &Hands::new().at(Hand::Right, slot3).frame());
    }
    assert_eq!(cockpit.shifter().current_slot(), 3);

    let state = *cockpit.drivetrain().state();
    let cap = 60.0 * KPH_TO_MPS;
    assert_eq!(state.gear_index, 2);
    assert!((state.gear_max_speed - cap).abs() < 1.0e-4);
    assert!((cap - 16.67).abs() < 0.01);

    let throttle = Hands::new().trigger(Hand::Right, 1.0).frame();
    let first = cockpit.fixed_step(DT, &throttle, Some(&mut body)).expect("body present");
    assert_eq!(first.motor_torque, 2500.0);
    body.integrate(DT);

    for _ in 0..(60 * 8) {
        step(&mut cockpit, &mut body, &throttle);
        assert!(body.forward_speed() <= cap + 1.0e-3, "overspeed: {}", body.forward_speed());
    }
    assert!(body.forward_speed() > cap - 0.05);
    assert_eq!(body.motor[WheelId::RearLeft.index()], 0.0);
    assert_eq!(body.motor[WheelId::FrontLeft.index()], 0.0);
}

#[test]
fn turning_the_wheel_steers_the_front_axle() {
    let mut cockpit = seated_cockpit();
    let mut body = MockBody::at_rest();

    let grab = Hands::new().at(Hand::Left, on_rim(180.0)).grip(Hand::Left, 1.0);
    step(&mut cockpit, &mut body, &grab.frame());
    assert!(cockpit.wheel().is_held_by(Hand::Left));
    assert!(cockpit.hands().is_locked(Hand::Left));

    let turned = Hands::new().at(Hand::Left, on_rim(225.0)).grip(Hand::Left, 1.0).frame();
    for _ in 0..120 {
        step(&mut cockpit, &mut body, &turned);
    }
    assert!((cockpit.wheel().current_angle() - 45.0).abs() < 0.05);
    assert!((body.steer[WheelId::FrontLeft.index()] - 17.5).abs() < 0.1);
    assert!((body.steer[WheelId::FrontRight.index()] - 17.5).abs() < 0.1);
    assert_eq!(body.steer[WheelId::RearLeft.index()], 0.0);
}

#[test]
fn released_wheel_recenters_the_steering() {
    let mut cockpit = seated_cockpit();
    let mut body = MockBody::at_rest();

    step(&mut cockpit, &mut body, &Hands::new().at(Hand::Left, on_rim(180.0)).grip(Hand::Left, 1.0).frame());
    let turned = Hands::new().at(Hand::Left, on_rim(210.0)).grip(Hand::Left, 1.0).frame();
    for _ in 0..60 {
        step(&mut cockpit, &mut body, &turned);
    }
    assert!(cockpit.wheel().current_angle() > 25.0);

    for _ in 0..(60 * 10) {
        step(&mut cockpit, &mut body, &ControllerFrame::idle());
    }
    assert_eq!(cockpit.wheel().current_angle(), 0.0);
    assert_eq!(cockpit.drivetrain().state().steering_input, 0.0);
    assert_eq!(body.steer[WheelId::FrontLeft.index()], 0.0);
}

#[test]
fn outputs_stay_within_configured_bounds() {
    let config = DrivetrainConfig::default();
    let mut drivetrain = Drivetrain::new(config.clone());
    drivetrain.set_gear_table(&[0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

    // Small LCG so the sweep is deterministic.
    let mut seed: u32 = 0x2545_f491;
    let mut next = move || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 8) as f32 / (1u32 << 24) as f32
    };

    for i in 0..2000 {
        let slot = i % 6;
        drivetrain.set_gear_slot_index(Some(slot));
        drivetrain.set_gear(slot as i32 - 1, 0.0);

        let mut frame = ControllerFrame::idle();
        frame.right.trigger = next() * 2.0 - 0.5;
        frame.left.trigger = next() * 2.0 - 0.5;
        let wheel = next() * 800.0 - 400.0;
        let mut body = MockBody::moving(Vec3::new(next() * 20.0 - 10.0, 0.0, next() * 60.0 - 30.0));

        let out = drivetrain.fixed_step(DT, &frame, Some(wheel), Some(&mut body)).expect("body present");
        assert!(out.motor_torque.abs() <= config.motor_power);
        assert!((0.0..=config.brake_power * 0.7 + 1.0e-3).contains(&out.brake.front));
        assert!((0.0..=config.brake_power * 0.3 + 1.0e-3).contains(&out.brake.rear));
        assert!(out.steer_angle.abs() <= config.max_steer_angle + 1.0e-4);
    }
}

#[test]
fn coasting_in_gear_comes_to_a_full_stop() {
    let mut drivetrain = Drivetrain::default();
    drivetrain.set_gear(1, 0.0);
    let mut body = MockBody::moving(Vec3::new(0.0, 0.0, 3.0));

    for _ in 0..(60 * 15) {
        drivetrain.fixed_step(DT, &ControllerFrame::idle(), None, Some(&mut body));
        body.integrate(DT);
    }
    assert_eq!(body.speed(), 0.0);
    assert!(body.velocity_writes > 0);
}

#[test]
fn neutral_holds_the_car_with_brakes() {
    let mut cockpit = seated_cockpit();
    let mut body = MockBody::moving(Vec3::new(0.0, 0.0, 2.0));
    let throttle = Hands::new().trigger(Hand::Right, 1.0).frame();
    let out = cockpit.fixed_step(DT, &throttle, Some(&mut body)).expect("body present");
    assert_eq!(out.motor_torque, 0.0);
    assert!((out.brake.front - 0.6 * 2500.0 * 0.7).abs() < 1.0e-3);
}

#[test]
fn missing_body_skips_actuation_but_controls_still_move() {
    let mut cockpit = seated_cockpit();
    let grab = Hands::new().at(Hand::Left, on_rim(180.0)).grip(Hand::Left, 1.0).frame();
    assert!(cockpit.fixed_step::<MockBody>(DT, &grab, None).is_none());
    assert!(cockpit.wheel().is_held_by(Hand::Left));
}

#[test]
fn leaving_the_seat_lets_go_of_everything() {
    let mut cockpit = seated_cockpit();
    let mut body = MockBody::at_rest();
    let holding = Hands::new().at(Hand::Left, on_rim(180.0)).grip(Hand::Left, 1.0).frame();
    step(&mut cockpit, &mut body, &holding);
    assert!(cockpit.hands().is_locked(Hand::Left));

    cockpit.on_driver_left();
    step(&mut cockpit, &mut body, &holding);

    assert!(!cockpit.wheel().is_held_by(Hand::Left));
    assert!(!cockpit.hands().is_locked(Hand::Left));
    assert_eq!(cockpit.hands().target(Hand::Left), Pose::default());
    assert_eq!(cockpit.drivetrain().state().gas_input, 0.0);
}

#[test]
fn presentation_follows_hands_and_refreshes_labels() {
    let mut cockpit = seated_cockpit();
    let body = MockBody::moving(Vec3::new(0.0, 0.0, 15.0));
    let mut labels = Labels::default();

    let tracked = Vec3::new(-0.3, 1.1, 0.2);
    let frame = Hands::new().at(Hand::Left, tracked).frame();
    let mut refreshed = false;
    let mut last = None;
    for _ in 0..30 {
        let out = cockpit.presentation_step(1.0 / 90.0, &frame, Some(&body), &mut labels);
        refreshed |= out.readout_refreshed;
        last = Some(out);
    }
    assert!(refreshed);
    assert_eq!(labels.speed, "Speed: 54 km/h");
    assert_eq!(labels.gear, "Gear: N");
    assert!(labels.fps.contains("FPS"));
    assert_eq!(cockpit.hands().target(Hand::Left).translation, tracked);

    let poses = last.expect("ran").wheel_poses;
    let front_left = poses[WheelId::FrontLeft.index()].expect("wheel pose");
    assert_eq!(front_left, body.wheel_world_pose(WheelId::FrontLeft).expect("wheel pose"));
}
