use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::PC13;
use embassy_time::{Duration, Instant, Timer};

use quad_flight::telemetry::{LedPattern, Telemetry, TelemetrySubscriber};

/// Status LED: blinks the most recently published pattern.
///
/// Even steps are "on", odd steps "off". An empty pattern leaves the LED off.
#[task]
pub async fn led_task(mut led: Output<'static, PC13>, mut telemetry: TelemetrySubscriber<'static>) {
    let mut pattern = LedPattern::new(&[]);
    let mut step = 0usize;

    loop {
        let Some(&ms) = pattern.steps_ms.get(step) else {
            led.set_low();
            pattern = next_pattern(&mut telemetry).await;
            step = 0;
            continue;
        };

        if step % 2 == 0 {
            led.set_high();
        } else {
            led.set_low();
        }

        let deadline = Instant::now() + Duration::from_millis(u64::from(ms));
        loop {
            match select(Timer::at(deadline), telemetry.next_message_pure()).await {
                Either::First(()) => {
                    step = (step + 1) % pattern.steps_ms.len();
                    break;
                }
                Either::Second(Telemetry::LedPattern(p)) => {
                    defmt::debug!("led pattern: {} steps", p.steps_ms.len());
                    pattern = p;
                    step = 0;
                    break;
                }
                // Flight details also come through here; keep waiting
                Either::Second(_) => {}
            }
        }
    }
}

async fn next_pattern(telemetry: &mut TelemetrySubscriber<'static>) -> LedPattern {
    loop {
        if let Telemetry::LedPattern(p) = telemetry.next_message_pure().await {
            return p;
        }
    }
}
