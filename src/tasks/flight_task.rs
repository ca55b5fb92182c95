use embassy_executor::task;
use embassy_stm32::peripherals::{I2C1, TIM3};
use embassy_time::Ticker;

use quad_flight::config::FLIGHT_TICK;
use quad_flight::control::QuadController;
use quad_flight::cycle::{CycleGate, TickOutcome};
use quad_flight::flight::FlightTask;
use quad_flight::params::Param;
use quad_flight::telemetry::TelemetryBus;

use crate::drivers::lsm9ds0::Lsm9ds0;
use crate::drivers::pulse::RcPulseIo;

pub type Flight = FlightTask<
    'static,
    Lsm9ds0<'static, I2C1>,
    RcPulseIo<'static, TIM3>,
    QuadController,
    &'static Param,
    &'static TelemetryBus,
>;

/// Flight task. Runs on the thread executor, one cycle per timer resume.
#[task]
pub async fn flight_task(flight: Flight, gate: &'static CycleGate) -> ! {
    flight.run(gate).await
}

/// Periodic timer. Runs on the interrupt executor so it preempts a late
/// cycle body and can count the miss.
#[task]
pub async fn cycle_timer_task(gate: &'static CycleGate) -> ! {
    gate.wait_started().await;
    let mut ticker = Ticker::every(FLIGHT_TICK);

    loop {
        ticker.next().await;
        if gate.on_tick() == TickOutcome::Missed {
            defmt::debug!("flight deadline missed ({})", gate.missed_deadlines());
        }
    }
}
