//! Build-time configuration of the flight task.

use embassy_time::Duration;

use crate::calibration::{CalibrationEntry, CalibrationTable};
use crate::vector::Vector3;

// ── Scheduling ────────────────────────────────────────────────────────────────

/// Flight cycle period in milliseconds (100 Hz).
pub const FLIGHT_TICK_MS: u32 = 10;
pub const FLIGHT_TICK: Duration = Duration::from_millis(FLIGHT_TICK_MS as u64);

// ── Units ─────────────────────────────────────────────────────────────────────

pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

// ── Receiver / ESC pulse widths (µs) ──────────────────────────────────────────

pub const RECEIVER_MIN_US: u32 = 1000;
pub const RECEIVER_CENTER_US: u32 = 1500;
pub const RECEIVER_RANGE_US: u32 = 1000;
/// ESC refresh rate for the motor outputs
pub const MOTOR_PWM_HZ: u32 = 400;

// ── LSM9DS0 ───────────────────────────────────────────────────────────────────

/// Would be 0x1E if SDO_XM is low
pub const LSM9DS0_XM_ADDR: u8 = 0x1D;
/// Would be 0x6A if SDO_G is low
pub const LSM9DS0_G_ADDR: u8 = 0x6B;

// ── Gyro bias vs. die temperature (raw LSM9DS0 temperature counts, dps) ──────

const GYRO_BIAS_ENTRIES: [CalibrationEntry; 2] = [
    CalibrationEntry::new(3, Vector3::new(-0.618, 0.900, 1.000)),
    CalibrationEntry::new(43, Vector3::new(-0.500, 0.380, 4.200)),
];

pub const GYRO_BIAS_TABLE: CalibrationTable<'static> = CalibrationTable::new(&GYRO_BIAS_ENTRIES);

// ── Control law defaults (used until the parameter table says otherwise) ─────

pub const DEFAULT_RATE_P: f32 = 0.12;
pub const DEFAULT_RATE_D: f32 = 0.004;
pub const DEFAULT_ANGLE_P: f32 = 4.0;
pub const DEFAULT_YAW_RATE_P: f32 = 0.2;
pub const DEFAULT_YAW_RATE_D: f32 = 0.0;

/// Full stick deflection in roll/pitch (rad)
pub const MAX_ANGLE_RAD: f32 = 30.0 * DEG_TO_RAD;
/// Full stick deflection in yaw (rad/s)
pub const MAX_YAW_RATE_RAD_S: f32 = 180.0 * DEG_TO_RAD;
/// Throttle below which the motors are held off and integrators reset
pub const ARM_THROTTLE: f32 = 0.05;

// ── Telemetry bus ─────────────────────────────────────────────────────────────

pub const TELEMETRY_CAP: usize = 4;
pub const TELEMETRY_SUBS: usize = 2;
pub const TELEMETRY_PUBS: usize = 1;
pub const LED_PATTERN_MAX: usize = 8;
