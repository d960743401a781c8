//! Digipeat decision engine
//!
//! For every inbound packet exactly one of three outcomes occurs,
//! checked in priority order:
//!
//! 1. **Own echo**: the source contains our call sign, a stale
//!    self-transmission arriving back at the receiver. Dropped without
//!    touching the ledger.
//! 2. **Duplicate**: the ledger holds a packet with the same
//!    (source, destination, body) triple whose forward timeout has not
//!    elapsed. Dropped; the existing entry is left untouched, its
//!    timestamp is not refreshed.
//! 3. **Forward**: the packet gets our call sign appended to its path
//!    with the has-repeated marker and is handed back for transmission;
//!    the pre-mutation packet is recorded in the ledger for future
//!    duplicate checks.
//!
//! Duplicates and echoes are routine, not errors; they are logged for
//! observability and counted in [`DigiStats`].

use crate::ledger::RecentLedger;
use crate::packet::AprsPacket;
use crate::transport::Received;
use tracing::{debug, info};

/// Result of the forwarding decision for one inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Source contains our own call sign; dropped.
    OwnEcho,
    /// Already forwarded within the timeout window; dropped.
    Duplicate,
    /// Retransmit this (path-mutated) packet.
    Forward(AprsPacket),
}

/// Counters for digipeater operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigiStats {
    /// Inbound packets handed to the engine
    pub packets_rx: u64,
    /// Packets retransmitted
    pub packets_forwarded: u64,
    /// Duplicates dropped within the timeout window
    pub duplicates_dropped: u64,
    /// Own echoes dropped
    pub own_echoes_dropped: u64,
    /// Beacons transmitted
    pub beacons_tx: u64,
    /// Ledger entries removed by pruning
    pub entries_pruned: u64,
}

/// The duplicate-suppression and forwarding decision engine.
#[derive(Debug)]
pub struct Digipeater {
    callsign: String,
    ledger: RecentLedger,
    forward_timeout_secs: u64,
    stats: DigiStats,
}

impl Digipeater {
    pub fn new(callsign: &str, forward_timeout_mins: u64) -> Self {
        Self {
            callsign: callsign.to_string(),
            ledger: RecentLedger::new(),
            forward_timeout_secs: forward_timeout_mins * 60,
            stats: DigiStats::default(),
        }
    }

    /// Decide the fate of one inbound packet received at `now` (seconds
    /// since startup). A forwarded packet is recorded in the ledger under
    /// its pre-mutation identity. Signal quality never influences the
    /// decision, it is carried along for the decision-point logs.
    pub fn handle_inbound(&mut self, received: &Received, now: u64) -> Outcome {
        let packet = &received.packet;
        self.stats.packets_rx += 1;

        if packet.is_from(&self.callsign) {
            self.stats.own_echoes_dropped += 1;
            debug!(
                rssi = received.rssi,
                snr = received.snr,
                "message already received as repeater: '{}'",
                packet
            );
            return Outcome::OwnEcho;
        }

        if self.ledger.find_duplicate(packet).is_some() {
            self.stats.duplicates_dropped += 1;
            info!(
                rssi = received.rssi,
                snr = received.snr,
                "message already received (timeout): '{}'",
                packet
            );
            return Outcome::Duplicate;
        }

        self.ledger.insert(now, packet.clone());

        let mut outbound = packet.clone();
        outbound.mark_repeated(&self.callsign);
        self.stats.packets_forwarded += 1;
        info!(
            rssi = received.rssi,
            snr = received.snr,
            "forwarding packet '{}'",
            outbound
        );
        Outcome::Forward(outbound)
    }

    /// Drop ledger entries older than the forward timeout.
    pub fn prune(&mut self, now: u64) -> usize {
        let removed = self.ledger.prune_expired(now, self.forward_timeout_secs);
        if removed > 0 {
            self.stats.entries_pruned += removed as u64;
            debug!(removed, ledger_len = self.ledger.len(), "pruned ledger");
        }
        removed
    }

    /// Count a transmitted beacon (the scheduler owns construction; the
    /// engine owns the statistics).
    pub fn record_beacon(&mut self) {
        self.stats.beacons_tx += 1;
    }

    /// Operation counters.
    pub fn stats(&self) -> DigiStats {
        self.stats
    }

    /// Number of packets currently recorded in the ledger.
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    /// Our call sign.
    pub fn callsign(&self) -> &str {
        &self.callsign
    }
}
