//! Angle-mode quad-X controller.
//!
//! Roll and pitch run an angle P loop feeding a rate PD loop; yaw is rate only.
//! Mixer sign convention: positive roll output lifts the left pair, positive
//! pitch lifts the front pair, positive yaw speeds up FR/RL (the CCW props).

use crate::config::{
    ARM_THROTTLE, DEFAULT_ANGLE_P, DEFAULT_RATE_D, DEFAULT_RATE_P, DEFAULT_YAW_RATE_D,
    DEFAULT_YAW_RATE_P, MAX_ANGLE_RAD, MAX_YAW_RATE_RAD_S,
};
use crate::control::mahony::Mahony;
use crate::control::pid::Pid;
use crate::control::FlightControl;
use crate::io::{MotorDemands, ReceiverInputs};
use crate::vector::Vector3;

const RATE_I: f32 = 0.0;
const RATE_I_LIMIT: f32 = 0.2;
const RATE_OUTPUT_LIMIT: f32 = 0.5;

pub struct QuadController {
    ahrs: Mahony,
    angle_p: f32,
    roll_rate: Pid,
    pitch_rate: Pid,
    yaw_rate: Pid,
    trim: Vector3,
    attitude: Vector3,
}

impl Default for QuadController {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadController {
    pub fn new() -> Self {
        let rate = || {
            Pid::new(
                DEFAULT_RATE_P,
                RATE_I,
                DEFAULT_RATE_D,
                RATE_I_LIMIT,
                RATE_OUTPUT_LIMIT,
            )
        };
        Self {
            ahrs: Mahony::default(),
            angle_p: DEFAULT_ANGLE_P,
            roll_rate: rate(),
            pitch_rate: rate(),
            yaw_rate: Pid::new(
                DEFAULT_YAW_RATE_P,
                RATE_I,
                DEFAULT_YAW_RATE_D,
                RATE_I_LIMIT,
                RATE_OUTPUT_LIMIT,
            ),
            trim: Vector3::ZERO,
            attitude: Vector3::ZERO,
        }
    }

    fn reset_loops(&mut self) {
        self.roll_rate.reset();
        self.pitch_rate.reset();
        self.yaw_rate.reset();
    }
}

impl FlightControl for QuadController {
    fn setup(&mut self) {
        self.ahrs = Mahony::default();
        self.attitude = Vector3::ZERO;
        self.reset_loops();
    }

    fn process(
        &mut self,
        period_ms: u32,
        accel: &Vector3,
        gyro: &Vector3,
        mag: &Vector3,
        rc: &ReceiverInputs,
    ) -> MotorDemands {
        let dt = period_ms as f32 / 1000.0;

        self.ahrs.update(dt, *gyro, *accel, *mag);
        self.attitude = self.ahrs.euler();

        if rc.throttle < ARM_THROTTLE {
            self.reset_loops();
            return MotorDemands::default();
        }

        let roll_sp = rc.roll * MAX_ANGLE_RAD + self.trim.x;
        let pitch_sp = rc.pitch * MAX_ANGLE_RAD + self.trim.y;
        let rate_sp = Vector3::new(
            self.angle_p * (roll_sp - self.attitude.x),
            self.angle_p * (pitch_sp - self.attitude.y),
            rc.yaw * MAX_YAW_RATE_RAD_S + self.trim.z,
        );

        let out = Vector3::new(
            self.roll_rate.update(dt, rate_sp.x, gyro.x),
            self.pitch_rate.update(dt, rate_sp.y, gyro.y),
            self.yaw_rate.update(dt, rate_sp.z, gyro.z),
        );

        mix(rc.throttle, out)
    }

    fn set_trim(&mut self, trim: Vector3) {
        self.trim = trim;
    }

    fn set_pid_gains(&mut self, rate_p: f32, rate_d: f32, angle_p: f32) {
        self.roll_rate.set_gains(rate_p, rate_d);
        self.pitch_rate.set_gains(rate_p, rate_d);
        self.angle_p = angle_p;
    }

    fn set_yaw_rate_gains(&mut self, p: f32, d: f32) {
        self.yaw_rate.set_gains(p, d);
    }

    fn rotation(&self) -> Vector3 {
        self.attitude
    }
}

fn mix(throttle: f32, u: Vector3) -> MotorDemands {
    let motor = |roll: f32, pitch: f32, yaw: f32| {
        (throttle + roll * u.x + pitch * u.y + yaw * u.z).clamp(0.0, 1.0)
    };
    MotorDemands {
        front_left: motor(1.0, 1.0, -1.0),
        front_right: motor(-1.0, 1.0, 1.0),
        rear_left: motor(1.0, -1.0, 1.0),
        rear_right: motor(-1.0, -1.0, -1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    fn hover() -> ReceiverInputs {
        ReceiverInputs {
            throttle: 0.5,
            ..Default::default()
        }
    }

    fn step(ctl: &mut QuadController, rc: &ReceiverInputs) -> MotorDemands {
        ctl.process(10, &DOWN, &Vector3::ZERO, &Vector3::ZERO, rc)
    }

    #[test]
    fn idle_throttle_keeps_motors_off() {
        let mut ctl = QuadController::new();
        let rc = ReceiverInputs {
            throttle: 0.0,
            roll: 1.0,
            ..Default::default()
        };
        assert_eq!(step(&mut ctl, &rc), MotorDemands::default());
    }

    #[test]
    fn level_hover_is_balanced() {
        let mut ctl = QuadController::new();
        let out = step(&mut ctl, &hover());
        assert_eq!(
            out,
            MotorDemands {
                front_left: 0.5,
                front_right: 0.5,
                rear_left: 0.5,
                rear_right: 0.5,
            }
        );
        assert_eq!(ctl.rotation(), Vector3::ZERO);
    }

    #[test]
    fn roll_stick_lifts_the_left_pair() {
        let mut ctl = QuadController::new();
        let rc = ReceiverInputs {
            roll: 0.5,
            ..hover()
        };
        let out = step(&mut ctl, &rc);
        assert!(out.front_left > out.front_right);
        assert!(out.rear_left > out.rear_right);
    }

    #[test]
    fn roll_trim_acts_without_stick() {
        let mut ctl = QuadController::new();
        ctl.set_trim(Vector3::new(0.1, 0.0, 0.0));
        let out = step(&mut ctl, &hover());
        assert!(out.front_left > out.front_right);
    }

    #[test]
    fn yaw_trim_is_independent_of_pitch_trim() {
        let mut ctl = QuadController::new();
        ctl.set_trim(Vector3::new(0.0, 0.0, 0.5));
        let out = step(&mut ctl, &hover());
        // Yaw only: front pair balanced in pitch, CCW pair faster
        assert!(out.front_right > out.front_left);
        assert!(out.rear_left > out.rear_right);
        assert_eq!(out.front_right, out.rear_left);
    }

    #[test]
    fn zero_gains_disable_correction() {
        let mut ctl = QuadController::new();
        ctl.set_pid_gains(0.0, 0.0, 0.0);
        ctl.set_yaw_rate_gains(0.0, 0.0);
        let rc = ReceiverInputs {
            roll: 1.0,
            pitch: -1.0,
            yaw: 1.0,
            ..hover()
        };
        let out = step(&mut ctl, &rc);
        assert_eq!(out.front_left, 0.5);
        assert_eq!(out.rear_right, 0.5);
    }

    #[test]
    fn mixer_saturates_at_full_scale() {
        let out = mix(0.95, Vector3::new(0.5, 0.5, 0.0));
        assert_eq!(out.front_left, 1.0);
        assert_eq!(out.rear_right, 0.0);
    }
}
