//! The digipeater node: one cooperative control loop
//!
//! [`DigiNode`] composes the clock, the beacon scheduler, the decision
//! engine and the two transports. Each [`DigiNode::poll`] is one
//! iteration of the forever loop:
//!
//! 1. evaluate the beacon scheduler and transmit if DUE;
//! 2. pull at most one inbound packet through the decision engine;
//! 3. if no packet was available, prune the ledger instead.
//!
//! Nothing here blocks. An empty receive queue and a not-yet-due beacon
//! are routine no-ops, not errors. The only shared mutable state between
//! the timer context and this loop are the clock counters, and those are
//! only touched through the clock's critical sections; the ledger and
//! all packets are owned exclusively by the loop.

use crate::beacon::BeaconScheduler;
use crate::clock::{ClockHandle, ClockSource};
use crate::config::{ConfigError, DigiConfig};
use crate::digipeater::{DigiStats, Digipeater, Outcome};
use crate::packet::AprsPacket;
use crate::transport::{RadioTransport, UplinkTransport};
use tracing::{debug, info, warn};

/// Seconds between uplink reconnect attempts.
const UPLINK_RETRY_SECS: u64 = 30;

/// What one control-loop iteration did, for callers that drive displays
/// or statistics off the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// Nothing to do this iteration
    Idle,
    /// A beacon was transmitted
    Beacon,
    /// An inbound packet was forwarded
    Forwarded,
    /// An inbound packet was dropped as a duplicate
    DuplicateDropped,
    /// An inbound packet was dropped as our own echo
    OwnEchoDropped,
}

/// A complete digipeater station bound to a radio and an optional
/// internet uplink.
#[derive(Debug)]
pub struct DigiNode<R: RadioTransport, U: UplinkTransport> {
    clock_source: ClockSource,
    clock: ClockHandle,
    scheduler: BeaconScheduler,
    engine: Digipeater,
    radio: R,
    uplink: U,
    /// Startup-counter time of the last failed uplink connect attempt
    last_uplink_attempt: Option<u64>,
}

impl<R: RadioTransport, U: UplinkTransport> DigiNode<R, U> {
    /// Build a node, rejecting an invalid configuration.
    ///
    /// The clock starts at zero; call [`DigiNode::spawn_ticker`] (or
    /// drive the returned handle manually in tests) to advance it.
    pub fn new(config: DigiConfig, radio: R, uplink: U) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock_source = ClockSource::new();
        let clock = clock_source.handle();

        let scheduler = BeaconScheduler::new(
            &config.callsign,
            config.latitude,
            config.longitude,
            &config.comment,
            config.kind,
            config.beacon_interval_mins,
        );
        let engine = Digipeater::new(&config.callsign, config.forward_timeout_mins);

        Ok(Self {
            clock_source,
            clock,
            scheduler,
            engine,
            radio,
            uplink,
            last_uplink_attempt: None,
        })
    }

    /// Start the 1 Hz ticker thread for this node's clock.
    pub fn spawn_ticker(&self) {
        self.clock_source.spawn_ticker();
    }

    /// Clock handle (tests drive ticks through this).
    pub fn clock(&self) -> ClockHandle {
        self.clock.clone()
    }

    /// Mutable access to the radio, for harnesses that feed the node.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// One cooperative control-loop iteration.
    pub fn poll(&mut self) -> PollEvent {
        self.maintain_uplink();

        // Beacon first: timer-driven transmission is independent of
        // inbound traffic.
        self.scheduler.poll(&self.clock);
        if let Some(beacon) = self.scheduler.take_due() {
            info!("<< beaconing myself >> {}", beacon);
            if let Err(err) = self.radio.transmit(&beacon) {
                warn!("beacon transmission failed: {}", err);
            }
            self.send_uplink(&beacon);
            self.engine.record_beacon();
            return PollEvent::Beacon;
        }

        // At most one inbound packet per iteration.
        if let Some(received) = self.radio.poll_receive() {
            let now = self.clock.now();
            debug!(
                rssi = received.rssi,
                snr = received.snr,
                "received packet '{}'",
                received.packet
            );
            return match self.engine.handle_inbound(&received, now) {
                Outcome::Forward(outbound) => {
                    if let Err(err) = self.radio.transmit(&outbound) {
                        warn!("retransmission failed: {}", err);
                    }
                    self.send_uplink(&outbound);
                    PollEvent::Forwarded
                }
                Outcome::Duplicate => PollEvent::DuplicateDropped,
                Outcome::OwnEcho => PollEvent::OwnEchoDropped,
            };
        }

        // Quiet iteration: age out the ledger.
        self.engine.prune(self.clock.now());
        PollEvent::Idle
    }

    /// Seconds until the next scheduled beacon, for status displays.
    pub fn seconds_to_next_beacon(&self) -> u64 {
        let elapsed = self.clock.snapshot().since_last_tx;
        self.scheduler.interval_secs().saturating_sub(elapsed)
    }

    /// Operation counters.
    pub fn stats(&self) -> DigiStats {
        self.engine.stats()
    }

    /// Number of packets currently in the dedup ledger.
    pub fn ledger_len(&self) -> usize {
        self.engine.ledger_len()
    }

    fn send_uplink(&mut self, packet: &AprsPacket) {
        if !self.uplink.is_connected() {
            return;
        }
        if let Err(err) = self.uplink.send(packet) {
            warn!("uplink send failed, will reconnect: {}", err);
        }
    }

    /// Fixed-backoff reconnect: at most one attempt per retry window,
    /// measured on the startup counter. Never fatal.
    fn maintain_uplink(&mut self) {
        if self.uplink.is_connected() {
            return;
        }
        let now = self.clock.now();
        if let Some(last) = self.last_uplink_attempt {
            if now < last + UPLINK_RETRY_SECS {
                return;
            }
        }
        self.last_uplink_attempt = Some(now);
        if let Err(err) = self.uplink.connect() {
            warn!(retry_secs = UPLINK_RETRY_SECS, "uplink connect failed: {}", err);
        }
    }
}
