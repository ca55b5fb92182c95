use core::sync::atomic::{AtomicU32, Ordering};

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::AnyPin;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_stm32::timer::{CaptureCompare16bitInstance, Channel};
use embassy_time::Instant;

use quad_flight::config::MOTOR_PWM_HZ;
use quad_flight::io::{MotorChannel, PulseIo, RxChannel};

/// A channel with no pulse for this long reads as 0 µs (no signal)
const SIGNAL_TIMEOUT_MS: u32 = 100;

const PWM_PERIOD_US: u32 = 1_000_000 / MOTOR_PWM_HZ;

struct Capture {
    width_us: AtomicU32,
    seen_ms: AtomicU32,
}

impl Capture {
    const fn new() -> Self {
        Self {
            width_us: AtomicU32::new(0),
            seen_ms: AtomicU32::new(0),
        }
    }
}

static CAPTURES: [Capture; RxChannel::ALL.len()] = [const { Capture::new() }; RxChannel::ALL.len()];

fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Measures the high time of one receiver channel, forever.
#[embassy_executor::task(pool_size = 6)]
pub async fn capture_task(mut pin: ExtiInput<'static, AnyPin>, channel: RxChannel) -> ! {
    let slot = &CAPTURES[channel as usize];
    loop {
        pin.wait_for_rising_edge().await;
        let rise = Instant::now();
        pin.wait_for_falling_edge().await;

        let width = (Instant::now() - rise).as_micros() as u32;
        slot.width_us.store(width, Ordering::Relaxed);
        slot.seen_ms.store(now_ms(), Ordering::Relaxed);
    }
}

/// Receiver capture (filled by [`capture_task`]) plus four ESC outputs on one
/// 16-bit timer.
pub struct RcPulseIo<'d, T: CaptureCompare16bitInstance> {
    pwm: SimplePwm<'d, T>,
    max_duty: u16,
}

impl<'d, T: CaptureCompare16bitInstance> RcPulseIo<'d, T> {
    /// `pwm` must already run at `MOTOR_PWM_HZ`; all outputs start at 0 µs.
    pub fn new(mut pwm: SimplePwm<'d, T>) -> Self {
        let max_duty = pwm.get_max_duty();
        for ch in [Channel::Ch1, Channel::Ch2, Channel::Ch3, Channel::Ch4] {
            pwm.set_duty(ch, 0);
            pwm.enable(ch);
        }
        Self { pwm, max_duty }
    }
}

fn timer_channel(motor: MotorChannel) -> Channel {
    match motor {
        MotorChannel::FrontLeft => Channel::Ch1,
        MotorChannel::FrontRight => Channel::Ch2,
        MotorChannel::RearLeft => Channel::Ch3,
        MotorChannel::RearRight => Channel::Ch4,
    }
}

impl<'d, T: CaptureCompare16bitInstance> PulseIo for RcPulseIo<'d, T> {
    fn input_pulse_width(&self, channel: RxChannel) -> u32 {
        let slot = &CAPTURES[channel as usize];
        let age = now_ms().wrapping_sub(slot.seen_ms.load(Ordering::Relaxed));
        if age > SIGNAL_TIMEOUT_MS {
            return 0;
        }
        slot.width_us.load(Ordering::Relaxed)
    }

    fn set_output_pulse_width(&mut self, channel: MotorChannel, width_us: u32) {
        let width_us = width_us.min(PWM_PERIOD_US);
        let duty = u32::from(self.max_duty) * width_us / PWM_PERIOD_US;
        self.pwm.set_duty(timer_channel(channel), duty as u16);
    }
}
