#![no_std]
#![no_main]

mod board;
mod drivers;
mod tasks;
mod usb;

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::dma::NoDma;
use embassy_stm32::exti::{Channel as _, ExtiInput};
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pin, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::CountingMode;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

use quad_flight::config::{
    DEFAULT_ANGLE_P, DEFAULT_RATE_D, DEFAULT_RATE_P, DEFAULT_YAW_RATE_D, DEFAULT_YAW_RATE_P,
    GYRO_BIAS_TABLE, MOTOR_PWM_HZ,
};
use quad_flight::control::QuadController;
use quad_flight::cycle::CycleGate;
use quad_flight::flight::FlightTask;
use quad_flight::io::RxChannel;
use quad_flight::params::*;
use quad_flight::telemetry::TelemetryBus;

use crate::drivers::lsm9ds0::{Lsm9ds0, WHO_AM_I};
use crate::drivers::pulse::{capture_task, RcPulseIo};
use crate::tasks::flight_task::{cycle_timer_task, flight_task};
use crate::tasks::led_task::led_task;
use crate::tasks::telemetry_task::telemetry_task;

// ── Shared state ──────────────────────────────────────────────────────────────
static CYCLE_GATE: CycleGate = CycleGate::new();
static TELEMETRY: TelemetryBus = TelemetryBus::new();

static PARAMS: [Param; 8] = [
    Param::new(TRIM_ROLL, 0.0),
    Param::new(TRIM_PITCH, 0.0),
    Param::new(TRIM_YAW, 0.0),
    Param::new(PID_GAIN_RATE_P, DEFAULT_RATE_P),
    Param::new(PID_GAIN_RATE_D, DEFAULT_RATE_D),
    Param::new(PID_GAIN_ANGLE_P, DEFAULT_ANGLE_P),
    Param::new(PID_GAIN_RATE_YAW_P, DEFAULT_YAW_RATE_P),
    Param::new(PID_GAIN_RATE_YAW_D, DEFAULT_YAW_RATE_D),
];
static PARAM_TABLE: ParamTable<'static> = ParamTable::new(&PARAMS);

// Cycle timer runs here, above the thread executor
static EXECUTOR_TIMER: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_TIMER.on_interrupt()
}

bind_interrupts!(struct Irqs {
    I2C1_EV => embassy_stm32::i2c::EventInterruptHandler<peripherals::I2C1>;
    I2C1_ER => embassy_stm32::i2c::ErrorInterruptHandler<peripherals::I2C1>;
});

const STARTUP_BLINKS: usize = 3;
const STARTUP_BLINK_MS: u64 = 100;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Clocks (168 MHz)
    let p = board::init();
    defmt::info!("quad-flight starting");

    // 2. Startup blink on the status LED (PC13)
    let mut led = Output::new(p.PC13, Level::Low, Speed::Low);
    for _ in 0..STARTUP_BLINKS {
        led.set_high();
        Timer::after_millis(STARTUP_BLINK_MS / 2).await;
        led.set_low();
        Timer::after_millis(STARTUP_BLINK_MS / 2).await;
    }

    // 3. USB console
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();

    // 4. I2C1 @ 400 kHz: LSM9DS0 (SCL=PB8, SDA=PB9)
    let i2c = I2c::new(
        p.I2C1,
        p.PB8,
        p.PB9,
        Irqs,
        NoDma,
        NoDma,
        Hertz(400_000),
        Default::default(),
    );
    let mut imu = Lsm9ds0::new(i2c);
    match imu.begin() {
        Ok(id) if id == WHO_AM_I => defmt::info!("lsm9ds0 whoami={:04x}", id),
        Ok(id) => defmt::warn!("lsm9ds0 whoami={:04x}, expected {:04x}", id, WHO_AM_I),
        Err(e) => defmt::error!("lsm9ds0 setup failed: {}", e),
    }

    // 5. Motors on TIM3 CH1..CH4 (PB4, PB5, PB0, PB1)
    let pwm = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new_ch1(p.PB4, OutputType::PushPull)),
        Some(PwmPin::new_ch2(p.PB5, OutputType::PushPull)),
        Some(PwmPin::new_ch3(p.PB0, OutputType::PushPull)),
        Some(PwmPin::new_ch4(p.PB1, OutputType::PushPull)),
        Hertz(MOTOR_PWM_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let pulses = RcPulseIo::new(pwm);

    // 6. Receiver capture: roll, pitch, throttle, yaw, aux A, aux B
    let captures = [
        ExtiInput::new(Input::new(p.PC6.degrade(), Pull::Down), p.EXTI6.degrade()),
        ExtiInput::new(Input::new(p.PC7.degrade(), Pull::Down), p.EXTI7.degrade()),
        ExtiInput::new(Input::new(p.PC8.degrade(), Pull::Down), p.EXTI8.degrade()),
        ExtiInput::new(Input::new(p.PC9.degrade(), Pull::Down), p.EXTI9.degrade()),
        ExtiInput::new(Input::new(p.PA10.degrade(), Pull::Down), p.EXTI10.degrade()),
        ExtiInput::new(Input::new(p.PA15.degrade(), Pull::Down), p.EXTI15.degrade()),
    ];
    for (pin, channel) in captures.into_iter().zip(RxChannel::ALL) {
        spawner.spawn(capture_task(pin, channel)).unwrap();
    }

    // 7. Subscribers first, so they see the start-up LED pattern
    let led_sub = TELEMETRY.subscriber().unwrap();
    let usb_sub = TELEMETRY.subscriber().unwrap();
    spawner.spawn(led_task(led, led_sub)).unwrap();
    spawner
        .spawn(telemetry_task(usb_serial, usb_sub, PARAM_TABLE))
        .unwrap();

    // 8. Cycle timer on the interrupt executor
    interrupt::UART4.set_priority(Priority::P6);
    let timer_spawner = EXECUTOR_TIMER.start(interrupt::UART4);
    timer_spawner.spawn(cycle_timer_task(&CYCLE_GATE)).unwrap();

    // 9. Flight task
    match FlightTask::new(
        imu,
        pulses,
        QuadController::new(),
        &PARAM_TABLE,
        GYRO_BIAS_TABLE,
        &TELEMETRY,
    ) {
        Ok(flight) => spawner.spawn(flight_task(flight, &CYCLE_GATE)).unwrap(),
        Err(e) => defmt::error!("flight task not started: {}", e),
    }
}
