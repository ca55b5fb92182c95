//! Timer-resumed cooperative cycle gate.
//!
//! Two contexts share a `CycleGate`: the flight task, which runs one cycle body
//! and then parks in [`CycleGate::end_cycle`], and a periodic timer that calls
//! [`CycleGate::on_tick`] from a higher-priority (interrupt) executor. The gate
//! holds at most one pending resume, so at most one cycle body is ever in
//! flight and overrun ticks are counted instead of queued.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Previous cycle had finished; the task was released
    Resumed,
    /// Previous cycle still running; counted as a missed deadline
    Missed,
}

pub struct CycleGate {
    completed: AtomicBool,
    missed: AtomicU32,
    resume: Signal<CriticalSectionRawMutex, ()>,
    started: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for CycleGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleGate {
    pub const fn new() -> Self {
        Self {
            completed: AtomicBool::new(false),
            missed: AtomicU32::new(0),
            resume: Signal::new(),
            started: Signal::new(),
        }
    }

    /// Arm the periodic timer. Called once by the task before its first cycle.
    pub fn start(&self) {
        self.started.signal(());
    }

    /// Timer side: wait until the task has armed the timer.
    pub async fn wait_started(&self) {
        self.started.wait().await
    }

    /// Timer callback. Never blocks; safe from interrupt context.
    pub fn on_tick(&self) -> TickOutcome {
        if self.completed.load(Ordering::Acquire) {
            self.resume.signal(());
            TickOutcome::Resumed
        } else {
            self.missed.fetch_add(1, Ordering::Relaxed);
            TickOutcome::Missed
        }
    }

    /// Mark the task `Running`.
    ///
    /// A tick that landed between the last resume and this call would leave a
    /// second resume pending; it is dropped here so an overrun never turns into
    /// a back-to-back catch-up cycle.
    pub fn begin_cycle(&self) {
        self.completed.store(false, Ordering::Release);
        self.resume.reset();
    }

    /// Mark the task `Suspended` and park until the next tick releases it.
    pub async fn end_cycle(&self) {
        self.completed.store(true, Ordering::Release);
        self.resume.wait().await
    }

    pub fn is_running(&self) -> bool {
        !self.completed.load(Ordering::Acquire)
    }

    pub fn missed_deadlines(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, Poll, Waker};

    fn poll_once<F: Future>(fut: core::pin::Pin<&mut F>) -> Poll<F::Output> {
        let waker = Waker::noop();
        fut.poll(&mut Context::from_waker(waker))
    }

    #[test]
    fn tick_during_a_cycle_is_counted_not_resumed() {
        let gate = CycleGate::new();
        gate.begin_cycle();

        assert_eq!(gate.on_tick(), TickOutcome::Missed);
        assert_eq!(gate.missed_deadlines(), 1);
        assert!(gate.is_running());

        // The late cycle still parks until the next tick
        let mut parked = pin!(gate.end_cycle());
        assert!(poll_once(parked.as_mut()).is_pending());
        assert_eq!(gate.on_tick(), TickOutcome::Resumed);
        assert!(poll_once(parked.as_mut()).is_ready());
        assert_eq!(gate.missed_deadlines(), 1);
    }

    #[test]
    fn burst_of_misses_does_not_queue_resumes() {
        let gate = CycleGate::new();
        gate.begin_cycle();
        for _ in 0..5 {
            assert_eq!(gate.on_tick(), TickOutcome::Missed);
        }
        assert_eq!(gate.missed_deadlines(), 5);

        let mut parked = pin!(gate.end_cycle());
        assert!(poll_once(parked.as_mut()).is_pending());
    }

    #[test]
    fn stale_resume_is_dropped_at_cycle_start() {
        let gate = CycleGate::new();
        gate.begin_cycle();
        {
            let mut parked = pin!(gate.end_cycle());
            assert!(poll_once(parked.as_mut()).is_pending());
            assert_eq!(gate.on_tick(), TickOutcome::Resumed);
            assert!(poll_once(parked.as_mut()).is_ready());
        }

        // Woken but not yet running again when the next tick lands
        assert_eq!(gate.on_tick(), TickOutcome::Resumed);

        gate.begin_cycle();
        let mut parked = pin!(gate.end_cycle());
        assert!(poll_once(parked.as_mut()).is_pending());
        assert_eq!(gate.missed_deadlines(), 0);
    }

    #[test]
    fn one_cycle_per_tick() {
        let gate = CycleGate::new();
        let mut cycles = 0;
        embassy_futures::block_on(async {
            for _ in 0..3 {
                gate.begin_cycle();
                cycles += 1;
                let mut parked = pin!(gate.end_cycle());
                assert!(poll_once(parked.as_mut()).is_pending());
                assert_eq!(gate.on_tick(), TickOutcome::Resumed);
                parked.await;
            }
        });
        assert_eq!(cycles, 3);
        assert_eq!(gate.missed_deadlines(), 0);
    }

    #[test]
    fn first_tick_can_race_the_first_cycle() {
        let gate = CycleGate::new();
        gate.start();
        assert!(poll_once(pin!(gate.wait_started())).is_ready());
        // The timer is armed before the first cycle body has finished
        assert_eq!(gate.on_tick(), TickOutcome::Missed);
    }
}
