//! One-second tick source shared between timer and control-loop contexts
//!
//! Two monotonic counters advance once per second: elapsed time since
//! the last beacon transmission and elapsed time since startup. The
//! timer context only ever calls [`ClockHandle::tick`]; the control loop
//! reads snapshots and consumes beacon intervals. Every read-modify-write
//! is a single critical section on the shared mutex, so a tick can never
//! interleave with a snapshot or an interval decrement.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    since_last_tx: u64,
    since_startup: u64,
}

/// A consistent read of both counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Seconds since the beacon interval was last consumed
    pub since_last_tx: u64,
    /// Seconds since startup (ledger timestamp domain)
    pub since_startup: u64,
}

/// Shared clock state. Cheap to clone; all clones observe the same
/// counters.
#[derive(Debug, Clone, Default)]
pub struct ClockHandle {
    inner: Arc<Mutex<Counters>>,
}

impl ClockHandle {
    /// Advance both counters by one second.
    ///
    /// Called from the timer context. Infallible; no side effects beyond
    /// the counter mutation.
    pub fn tick(&self) {
        let mut counters = self.inner.lock().unwrap();
        counters.since_last_tx += 1;
        counters.since_startup += 1;
    }

    /// Read both counters in one critical section.
    pub fn snapshot(&self) -> ClockSnapshot {
        let counters = self.inner.lock().unwrap();
        ClockSnapshot {
            since_last_tx: counters.since_last_tx,
            since_startup: counters.since_startup,
        }
    }

    /// If a full beacon interval has elapsed, consume it and return true.
    ///
    /// The counter is decremented by the interval rather than reset to
    /// zero: any ticks that arrived beyond the interval boundary carry
    /// over, so jitter in control-loop timing does not accumulate into
    /// long-term beacon drift.
    pub fn consume_beacon_elapsed(&self, interval_secs: u64) -> bool {
        let mut counters = self.inner.lock().unwrap();
        if counters.since_last_tx >= interval_secs {
            counters.since_last_tx -= interval_secs;
            true
        } else {
            false
        }
    }

    /// Current seconds-since-startup (ledger timestamps).
    pub fn now(&self) -> u64 {
        self.inner.lock().unwrap().since_startup
    }
}

/// The station clock: a handle plus ownership of the ticker driving it.
#[derive(Debug)]
pub struct ClockSource {
    handle: ClockHandle,
}

impl ClockSource {
    /// Create a clock with both counters at zero. Nothing advances the
    /// counters until [`ClockSource::spawn_ticker`] is called (or tests
    /// drive [`ClockHandle::tick`] directly).
    pub fn new() -> Self {
        Self {
            handle: ClockHandle::default(),
        }
    }

    /// Get a handle for tick/snapshot access.
    pub fn handle(&self) -> ClockHandle {
        self.handle.clone()
    }

    /// Spawn the 1 Hz ticker thread, the host stand-in for the hardware
    /// timer interrupt. The thread runs for the life of the process.
    pub fn spawn_ticker(&self) {
        let handle = self.handle.clone();
        thread::Builder::new()
            .name("clock-tick".to_string())
            .spawn(move || loop {
                thread::sleep(Duration::from_secs(1));
                handle.tick();
            })
            .expect("failed to spawn clock ticker");
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_both_counters() {
        let clock = ClockHandle::default();
        clock.tick();
        clock.tick();
        clock.tick();

        let snap = clock.snapshot();
        assert_eq!(snap.since_last_tx, 3);
        assert_eq!(snap.since_startup, 3);
    }

    #[test]
    fn test_consume_decrements_not_resets() {
        let clock = ClockHandle::default();
        for _ in 0..65 {
            clock.tick();
        }

        assert!(clock.consume_beacon_elapsed(60));

        // The five surplus ticks carry over instead of being discarded.
        let snap = clock.snapshot();
        assert_eq!(snap.since_last_tx, 5);
        assert_eq!(snap.since_startup, 65);
    }

    #[test]
    fn test_consume_before_interval_is_noop() {
        let clock = ClockHandle::default();
        for _ in 0..59 {
            clock.tick();
        }
        assert!(!clock.consume_beacon_elapsed(60));
        assert_eq!(clock.snapshot().since_last_tx, 59);
    }

    #[test]
    fn test_startup_counter_unaffected_by_consume() {
        let clock = ClockHandle::default();
        for _ in 0..120 {
            clock.tick();
        }
        assert!(clock.consume_beacon_elapsed(60));
        assert!(clock.consume_beacon_elapsed(60));
        assert_eq!(clock.now(), 120);
    }

    #[test]
    fn test_concurrent_ticks_are_not_lost() {
        let clock = ClockHandle::default();
        let mut threads = Vec::new();
        for _ in 0..4 {
            let handle = clock.clone();
            threads.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    handle.tick();
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(clock.now(), 4000);
    }
}
