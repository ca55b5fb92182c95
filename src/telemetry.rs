//! Telemetry snapshot and the publish-subscribe bus it goes out on.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use heapless::Vec;

use crate::config::{LED_PATTERN_MAX, TELEMETRY_CAP, TELEMETRY_PUBS, TELEMETRY_SUBS};
use crate::vector::Vector3;

/// Per-cycle statistics. Owned by the flight task; a copy is published every
/// cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlightDetails {
    pub cycles_run: u32,
    pub gyro_samples: u32,
    pub accel_samples: u32,
    pub missed_deadlines: u32,
    /// Roll, pitch, yaw (rad)
    pub attitude: Vector3,
    /// Last bias-corrected gyro reading (rad/s)
    pub attitude_rate: Vector3,
}

/// Alternating on/off durations in milliseconds, starting with "on".
#[derive(Clone, Debug, PartialEq)]
pub struct LedPattern {
    pub steps_ms: Vec<u16, LED_PATTERN_MAX>,
}

impl LedPattern {
    pub fn new(steps_ms: &[u16]) -> Self {
        let mut steps = Vec::new();
        for &ms in steps_ms.iter().take(LED_PATTERN_MAX) {
            // Capacity is checked by `take`
            let _ = steps.push(ms);
        }
        Self { steps_ms: steps }
    }

    /// Slow 1 Hz blink shown while the flight task is running.
    pub fn flight() -> Self {
        Self::new(&[500, 500])
    }
}

/// One variant per topic.
#[derive(Clone, Debug, PartialEq)]
pub enum Telemetry {
    FlightDetails(FlightDetails),
    LedPattern(LedPattern),
}

pub type TelemetryBus =
    PubSubChannel<CriticalSectionRawMutex, Telemetry, TELEMETRY_CAP, TELEMETRY_SUBS, TELEMETRY_PUBS>;

pub type TelemetrySubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    Telemetry,
    TELEMETRY_CAP,
    TELEMETRY_SUBS,
    TELEMETRY_PUBS,
>;

/// Fire-and-forget publication: never blocks, never reports back-pressure.
pub trait Publish {
    fn publish(&self, msg: Telemetry);
}

impl<M: RawMutex, const CAP: usize, const SUBS: usize, const PUBS: usize> Publish
    for PubSubChannel<M, Telemetry, CAP, SUBS, PUBS>
{
    fn publish(&self, msg: Telemetry) {
        // Oldest queued message is dropped for lagging subscribers
        self.immediate_publisher().publish_immediate(msg);
    }
}

impl<T: Publish + ?Sized> Publish for &T {
    fn publish(&self, msg: Telemetry) {
        (**self).publish(msg)
    }
}
