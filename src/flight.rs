//! The periodic flight task: one sensor → control → motors pass per tick.

use crate::calibration::CalibrationTable;
use crate::config::FLIGHT_TICK_MS;
use crate::control::FlightControl;
use crate::cycle::CycleGate;
use crate::error::FlightResult;
use crate::imu::{InertialSensor, SensorPipeline};
use crate::io::{PulseIo, ReceiverInputs};
use crate::params::{ParamBridge, ParamHandle, ParamRegistry};
use crate::telemetry::{FlightDetails, LedPattern, Publish, Telemetry};

/// Everything the flight task touches, owned by the task itself.
pub struct FlightTask<'a, S, P, C, H, B> {
    sensor: S,
    io: P,
    control: C,
    params: ParamBridge<H>,
    table: CalibrationTable<'a>,
    bus: B,
    pipeline: SensorPipeline,
    details: FlightDetails,
}

impl<'a, S, P, C, H, B> FlightTask<'a, S, P, C, H, B>
where
    S: InertialSensor,
    P: PulseIo,
    C: FlightControl,
    H: ParamHandle,
    B: Publish,
{
    /// Start-up: flight LED pattern, control law setup, parameter lookup.
    ///
    /// Fails if a required gain is not registered; the loop is never entered
    /// in that case.
    pub fn new<R>(
        sensor: S,
        io: P,
        mut control: C,
        registry: &R,
        table: CalibrationTable<'a>,
        bus: B,
    ) -> FlightResult<Self>
    where
        R: ParamRegistry<Handle = H>,
    {
        bus.publish(Telemetry::LedPattern(LedPattern::flight()));
        control.setup();
        let params = ParamBridge::resolve(registry)?;

        Ok(Self {
            sensor,
            io,
            control,
            params,
            table,
            bus,
            pipeline: SensorPipeline::new(),
            details: FlightDetails::default(),
        })
    }

    /// One cycle body. Never blocks.
    pub fn run_cycle(&mut self, gate: &CycleGate) {
        self.details.cycles_run = self.details.cycles_run.wrapping_add(1);

        self.params.push(&mut self.control);

        let imu = self
            .pipeline
            .acquire(&mut self.sensor, &self.table, &mut self.details);

        let rc = ReceiverInputs::read(&self.io);
        let demands = self
            .control
            .process(FLIGHT_TICK_MS, &imu.accel, &imu.gyro, &imu.mag, &rc);
        demands.write(&mut self.io);

        self.details.attitude = self.control.rotation();
        self.details.attitude_rate = imu.gyro;
        self.details.missed_deadlines = gate.missed_deadlines();

        self.bus.publish(Telemetry::FlightDetails(self.details));
    }

    /// Arm the timer and run one cycle per resume, forever.
    pub async fn run(mut self, gate: &CycleGate) -> ! {
        gate.start();
        info!("flight task running, {} ms period", FLIGHT_TICK_MS);

        loop {
            gate.begin_cycle();
            self.run_cycle(gate);
            gate.end_cycle().await;
        }
    }

    pub fn details(&self) -> &FlightDetails {
        &self.details
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn io_mut(&mut self) -> &mut P {
        &mut self.io
    }

    pub fn control(&self) -> &C {
        &self.control
    }
}
