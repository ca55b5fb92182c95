//! Sensor acquisition: FIFO drain, unit conversion and gyro bias correction.

use crate::calibration::CalibrationTable;
use crate::config::DEG_TO_RAD;
use crate::telemetry::FlightDetails;
use crate::vector::Vector3;

/// Inertial sensor as seen by the flight task.
///
/// Reads are infallible at this level: a bus fault is absorbed (and logged) by
/// the driver, which then keeps returning its last register values.
pub trait InertialSensor {
    /// Number of samples waiting in the gyro FIFO
    fn fifo_count_gyro(&mut self) -> u8;
    /// Number of samples waiting in the accel FIFO
    fn fifo_count_accel(&mut self) -> u8;

    /// Pop one gyro sample (raw counts)
    fn read_gyro(&mut self) -> [i16; 3];
    /// Pop one accel sample (raw counts)
    fn read_accel(&mut self) -> [i16; 3];
    fn read_mag(&mut self) -> [i16; 3];
    fn read_temp(&mut self) -> i16;

    /// Raw counts → dps
    fn calc_gyro(&self, raw: i16) -> f32;
    /// Raw counts → g
    fn calc_accel(&self, raw: i16) -> f32;
    /// Raw counts → gauss
    fn calc_mag(&self, raw: i16) -> f32;
}

/// One cycle's worth of calibrated sensor data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    /// g
    pub accel: Vector3,
    /// rad/s, bias corrected
    pub gyro: Vector3,
    /// gauss
    pub mag: Vector3,
    pub temperature: i16,
}

/// Drains the IMU FIFOs once per cycle.
///
/// The FIFOs are an overflow cushion, not a resampling buffer: every queued
/// sample is read but only the newest one is used. When a FIFO is empty the
/// previous cycle's reading (before bias correction) is reused.
#[derive(Default)]
pub struct SensorPipeline {
    gyro_dps: Vector3,
    accel_g: Vector3,
}

impl SensorPipeline {
    pub const fn new() -> Self {
        Self {
            gyro_dps: Vector3::ZERO,
            accel_g: Vector3::ZERO,
        }
    }

    pub fn acquire<S: InertialSensor>(
        &mut self,
        sensor: &mut S,
        table: &CalibrationTable<'_>,
        details: &mut FlightDetails,
    ) -> ImuSample {
        let count = sensor.fifo_count_gyro();
        details.gyro_samples = details.gyro_samples.wrapping_add(u32::from(count));
        for _ in 0..count {
            let raw = sensor.read_gyro();
            self.gyro_dps = convert(raw, |r| sensor.calc_gyro(r));
        }

        let count = sensor.fifo_count_accel();
        details.accel_samples = details.accel_samples.wrapping_add(u32::from(count));
        for _ in 0..count {
            let raw = sensor.read_accel();
            self.accel_g = convert(raw, |r| sensor.calc_accel(r));
        }

        let raw = sensor.read_mag();
        let mag = convert(raw, |r| sensor.calc_mag(r));

        // Bias is expressed in dps, so subtract before converting to rad/s
        let temperature = sensor.read_temp();
        let bias = table.bias_at(temperature);
        let gyro = (self.gyro_dps - bias) * DEG_TO_RAD;

        ImuSample {
            accel: self.accel_g,
            gyro,
            mag,
            temperature,
        }
    }
}

fn convert(raw: [i16; 3], scale: impl Fn(i16) -> f32) -> Vector3 {
    Vector3::new(scale(raw[0]), scale(raw[1]), scale(raw[2]))
}
