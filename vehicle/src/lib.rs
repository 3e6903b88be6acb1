pub mod cockpit;
pub mod constants;
pub mod drivetrain;
pub mod gear_table;
pub mod hands;
pub mod math;
pub mod readout;
pub mod shifter;
pub mod steering;
pub mod types;

pub use cockpit::{Cockpit, CockpitConfig, NullReplication, PresentationFrame, Replication};
pub use constants::{KPH_TO_MPS, MPS_TO_KPH, MPS_TO_MPH, UNLIMITED_SPEED};
pub use drivetrain::{
    Actuation, BrakeTorque, Drivetrain, DrivetrainConfig, GearReceiver, VehicleBody, VehicleState,
};
pub use gear_table::GearTable;
pub use hands::{ControllerFrame, HandOverrideLock, HandSample, HandTargetConfig, HandTargets};
pub use readout::{DisplaySink, FpsCounter, FpsSample, Readout, ReadoutConfig, SpeedUnits};
pub use shifter::{GearShifter, LeverPhase, ShifterConfig, SlotLayout};
pub use steering::{RotationAxis, SteeringConfig, SteeringWheel};
pub use types::{Hand, Pose, Quat, Vec3, WheelId};
