//! Control law interface and the quad-X implementation flown by the firmware.

pub mod mahony;
pub mod pid;
pub mod quad;

pub use quad::QuadController;

use crate::io::{MotorDemands, ReceiverInputs};
use crate::vector::Vector3;

/// Attitude estimation + control law, driven once per flight cycle.
pub trait FlightControl {
    fn setup(&mut self);

    /// Run one control step. `gyro` is bias corrected, in rad/s.
    fn process(
        &mut self,
        period_ms: u32,
        accel: &Vector3,
        gyro: &Vector3,
        mag: &Vector3,
        rc: &ReceiverInputs,
    ) -> MotorDemands;

    /// Per-axis offset added to the pilot commands
    fn set_trim(&mut self, trim: Vector3);

    fn set_pid_gains(&mut self, rate_p: f32, rate_d: f32, angle_p: f32);

    /// Yaw-rate loop gains; controllers without a separate yaw loop ignore them.
    fn set_yaw_rate_gains(&mut self, _p: f32, _d: f32) {}

    /// Current attitude as roll, pitch, yaw (rad)
    fn rotation(&self) -> Vector3;
}
