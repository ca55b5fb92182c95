//! Flight-control core of a quadrotor: a timer-resumed periodic task that
//! drains the IMU, corrects gyro bias against die temperature, runs the
//! control law and publishes telemetry.
//!
//! Hardware sits behind traits ([`imu::InertialSensor`], [`io::PulseIo`],
//! [`control::FlightControl`], [`params::ParamRegistry`]) so everything here
//! runs on the host under `cargo test`.
#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to the modules below.
mod fmt;

pub mod calibration;
pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod flight;
pub mod imu;
pub mod io;
pub mod params;
pub mod telemetry;
pub mod vector;

pub use error::{FlightError, FlightResult};
