use core::fmt::Write;

use embassy_executor::task;
use embassy_futures::join::join;
use embassy_sync::pubsub::WaitResult;
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use heapless::String;

use quad_flight::config::RAD_TO_DEG;
use quad_flight::params::ParamTable;
use quad_flight::telemetry::{FlightDetails, Telemetry, TelemetrySubscriber};

use crate::usb::{UsbDriver, UsbSerial, MAX_PACKET};

/// One USB line per this many flight cycles (10 Hz at 100 Hz)
const DETAILS_EVERY: u32 = 10;
const LINE_MAX: usize = 64;

/// USB console: streams flight details and accepts `Name=value` tuning
/// commands.
#[task]
pub async fn telemetry_task(
    usb_serial: UsbSerial,
    mut telemetry: TelemetrySubscriber<'static>,
    params: ParamTable<'static>,
) {
    let (mut tx, mut rx) = usb_serial.split();
    join(
        stream_details(&mut tx, &mut telemetry),
        read_commands(&mut rx, params),
    )
    .await;
}

async fn stream_details(
    tx: &mut Sender<'static, UsbDriver>,
    telemetry: &mut TelemetrySubscriber<'static>,
) -> ! {
    loop {
        tx.wait_connection().await;
        defmt::info!("usb console connected");

        loop {
            let details = match telemetry.next_message().await {
                WaitResult::Message(Telemetry::FlightDetails(d)) => d,
                WaitResult::Message(_) => continue,
                WaitResult::Lagged(n) => {
                    defmt::debug!("usb console lagged by {} messages", n);
                    continue;
                }
            };
            if details.cycles_run % DETAILS_EVERY != 0 || !tx.dtr() {
                continue;
            }

            let line = format_details(&details);
            let mut sent = Ok(());
            for chunk in line.as_bytes().chunks(MAX_PACKET) {
                sent = tx.write_packet(chunk).await;
                if sent.is_err() {
                    break;
                }
            }
            if sent.is_err() {
                break;
            }
        }
    }
}

fn format_details(d: &FlightDetails) -> String<128> {
    let mut line = String::new();
    let _ = write!(
        line,
        "[FLT] n={} g={} a={} miss={} r={:.1} p={:.1} y={:.1} gz={:.1}\r\n",
        d.cycles_run,
        d.gyro_samples,
        d.accel_samples,
        d.missed_deadlines,
        d.attitude.x * RAD_TO_DEG,
        d.attitude.y * RAD_TO_DEG,
        d.attitude.z * RAD_TO_DEG,
        d.attitude_rate.z * RAD_TO_DEG,
    );
    line
}

async fn read_commands(rx: &mut Receiver<'static, UsbDriver>, params: ParamTable<'static>) -> ! {
    let mut buf = [0u8; MAX_PACKET];
    let mut line = String::<LINE_MAX>::new();

    loop {
        rx.wait_connection().await;

        while let Ok(n) = rx.read_packet(&mut buf).await {
            for &byte in &buf[..n] {
                match byte {
                    b'\r' | b'\n' => {
                        if !line.is_empty() {
                            apply_command(params, &line);
                            line.clear();
                        }
                    }
                    _ => {
                        if line.push(char::from(byte)).is_err() {
                            defmt::warn!("console line longer than {} bytes dropped", LINE_MAX);
                            line.clear();
                        }
                    }
                }
            }
        }
        line.clear();
    }
}

fn apply_command(params: ParamTable<'static>, line: &str) {
    match params.apply(line) {
        Ok(param) => defmt::info!("{} = {}", param.name(), param.get()),
        Err(e) => defmt::warn!("`{}` rejected: {}", line, e),
    }
}
