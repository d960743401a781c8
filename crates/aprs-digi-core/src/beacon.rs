//! Periodic position beacon scheduler
//!
//! The scheduler is a two-state machine (WAITING / DUE) driven by the
//! shared clock. It goes DUE when a full beacon interval has been
//! consumed from the seconds-since-last-TX counter, and back to WAITING
//! the moment the beacon packet is taken for transmission. Consuming the
//! interval decrements the counter instead of zeroing it, so residual
//! ticks carry into the next cycle and the beacon cadence stays exact
//! under irregular control-loop timing.

use crate::clock::ClockHandle;
use crate::geo::{format_latitude, format_longitude};
use crate::packet::AprsPacket;
use serde::{Deserialize, Serialize};

/// Fixed APRS destination for self-originated beacons.
pub const BEACON_DESTINATION: &str = "APLG0";

/// What kind of station the beacon advertises, which selects the APRS
/// symbol-table and symbol characters of the position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StationKind {
    /// Radio-only digipeater: overlay `R`, symbol `#`
    #[default]
    Relay,
    /// Internet gateway: overlay `I`, symbol `&`
    InternetGate,
}

impl StationKind {
    /// (symbol table char, symbol code char) per APRS convention.
    pub fn symbol(&self) -> (char, char) {
        match self {
            StationKind::Relay => ('R', '#'),
            StationKind::InternetGate => ('I', '&'),
        }
    }
}

/// Schedules and constructs the station's own position beacon.
///
/// This is the only component that originates new packets; everything
/// else in the node relays.
#[derive(Debug)]
pub struct BeaconScheduler {
    callsign: String,
    latitude: f64,
    longitude: f64,
    comment: String,
    kind: StationKind,
    interval_secs: u64,
    due: bool,
}

impl BeaconScheduler {
    pub fn new(
        callsign: &str,
        latitude: f64,
        longitude: f64,
        comment: &str,
        kind: StationKind,
        interval_mins: u64,
    ) -> Self {
        Self {
            callsign: callsign.to_string(),
            latitude,
            longitude,
            comment: comment.to_string(),
            kind,
            interval_secs: interval_mins * 60,
            due: true, // first beacon goes out on startup
        }
    }

    /// Beacon interval in seconds.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Advance the state machine: WAITING -> DUE when a full interval
    /// has elapsed on the clock.
    pub fn poll(&mut self, clock: &ClockHandle) {
        if clock.consume_beacon_elapsed(self.interval_secs) {
            self.due = true;
        }
    }

    /// Whether a beacon is pending transmission.
    pub fn is_due(&self) -> bool {
        self.due
    }

    /// If DUE, construct the beacon packet and return to WAITING.
    pub fn take_due(&mut self) -> Option<AprsPacket> {
        if !self.due {
            return None;
        }
        self.due = false;
        Some(self.build_beacon())
    }

    /// Construct the position report:
    /// `=<lat><table><lng><symbol><comment>`.
    fn build_beacon(&self) -> AprsPacket {
        let (table, symbol) = self.kind.symbol();
        let body = format!(
            "={}{}{}{}{}",
            format_latitude(self.latitude),
            table,
            format_longitude(self.longitude),
            symbol,
            self.comment
        );
        AprsPacket::new(&self.callsign, BEACON_DESTINATION, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(interval_mins: u64) -> BeaconScheduler {
        BeaconScheduler::new(
            "OE5XYZ-1",
            47.825,
            -13.5,
            "LoRa APRS Digi",
            StationKind::Relay,
            interval_mins,
        )
    }

    #[test]
    fn test_first_beacon_due_at_startup() {
        let mut sched = scheduler(15);
        let beacon = sched.take_due().unwrap();
        assert_eq!(beacon.source, "OE5XYZ-1");
        assert_eq!(beacon.destination, BEACON_DESTINATION);
        assert!(sched.take_due().is_none());
    }

    #[test]
    fn test_beacon_body_format() {
        let mut sched = scheduler(15);
        let beacon = sched.take_due().unwrap();
        assert_eq!(beacon.body, "=4749.50NR01330.00W#LoRa APRS Digi");
    }

    #[test]
    fn test_igate_symbol_codes() {
        let mut sched = BeaconScheduler::new(
            "OE5XYZ-10",
            47.825,
            -13.5,
            "igate",
            StationKind::InternetGate,
            15,
        );
        let beacon = sched.take_due().unwrap();
        assert_eq!(beacon.body, "=4749.50NI01330.00W&igate");
    }

    #[test]
    fn test_periodicity_exact_interval() {
        let clock = ClockHandle::default();
        let mut sched = scheduler(1); // 60 s
        sched.take_due(); // consume the startup beacon

        let mut due_count = 0;
        for _ in 0..180 {
            clock.tick();
            sched.poll(&clock);
            if sched.take_due().is_some() {
                due_count += 1;
            }
        }
        assert_eq!(due_count, 3);
    }

    #[test]
    fn test_residual_carry_under_sparse_polling() {
        let clock = ClockHandle::default();
        let mut sched = scheduler(1);
        sched.take_due();

        // The loop stalls: 65 ticks pass before the next poll. The
        // 5-second overshoot must carry, so the following beacon is due
        // after only 55 further ticks.
        for _ in 0..65 {
            clock.tick();
        }
        sched.poll(&clock);
        assert!(sched.take_due().is_some());

        for _ in 0..54 {
            clock.tick();
            sched.poll(&clock);
            assert!(sched.take_due().is_none());
        }
        clock.tick();
        sched.poll(&clock);
        assert!(sched.take_due().is_some());
    }

    #[test]
    fn test_due_flag_holds_until_taken() {
        let clock = ClockHandle::default();
        let mut sched = scheduler(1);
        sched.take_due();

        for _ in 0..60 {
            clock.tick();
        }
        sched.poll(&clock);
        assert!(sched.is_due());
        // Extra polls while DUE must not produce additional beacons.
        sched.poll(&clock);
        assert!(sched.take_due().is_some());
        assert!(sched.take_due().is_none());
    }
}
