//! Transport seams: the radio and the optional internet uplink
//!
//! The node never talks to hardware directly. The LoRa modem sits behind
//! [`RadioTransport`] and the APRS-IS gateway behind [`UplinkTransport`],
//! so the same control loop runs against real radios, UDP sockets, or
//! the in-memory [`ChannelSim`] used by tests and the traffic simulator.

use crate::packet::AprsPacket;
use std::collections::VecDeque;
use thiserror::Error;

/// Transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Transport could not be brought up. Fatal: the node cannot start.
    #[error("transport init failed: {0}")]
    InitFailed(String),

    /// Uplink not (or no longer) connected. Transient: retried with
    /// fixed backoff.
    #[error("not connected")]
    NotConnected,

    /// A transmission was not accepted
    #[error("transmit failed: {0}")]
    TxFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A packet received off the air, with signal-quality metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Received {
    pub packet: AprsPacket,
    /// Received signal strength in dBm
    pub rssi: f32,
    /// Signal-to-noise ratio in dB
    pub snr: f32,
}

/// The radio seam: non-blocking receive polling plus transmit.
pub trait RadioTransport {
    /// Transmit an encoded packet.
    fn transmit(&mut self, packet: &AprsPacket) -> Result<(), TransportError>;

    /// Return the next pending inbound packet, if any. Must not block;
    /// `None` simply means nothing arrived since the last poll.
    fn poll_receive(&mut self) -> Option<Received>;
}

/// The internet-uplink seam (APRS-IS gateway variant).
pub trait UplinkTransport {
    /// Whether the uplink currently has a usable connection.
    fn is_connected(&self) -> bool;

    /// (Re)establish the connection. Transient failures are expected;
    /// the node retries with fixed backoff.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Relay a packet to the gateway.
    fn send(&mut self, packet: &AprsPacket) -> Result<(), TransportError>;
}

/// Uplink for radio-only stations: permanently connected, drops
/// everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUplink;

impl UplinkTransport for NoUplink {
    fn is_connected(&self) -> bool {
        true
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn send(&mut self, _packet: &AprsPacket) -> Result<(), TransportError> {
        Ok(())
    }
}

/// In-memory radio channel for tests and simulation.
///
/// Inbound packets are injected with [`ChannelSim::inject`];
/// transmissions are appended to a log the harness can drain.
#[derive(Debug, Default)]
pub struct ChannelSim {
    inbound: VecDeque<Received>,
    transmitted: Vec<AprsPacket>,
}

impl ChannelSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a packet for the node to receive, with default signal
    /// quality.
    pub fn inject(&mut self, packet: AprsPacket) {
        self.inject_with_signal(packet, -120.0, 5.0);
    }

    /// Queue a packet with explicit RSSI/SNR.
    pub fn inject_with_signal(&mut self, packet: AprsPacket, rssi: f32, snr: f32) {
        self.inbound.push_back(Received { packet, rssi, snr });
    }

    /// Drain everything the node has transmitted so far.
    pub fn take_transmitted(&mut self) -> Vec<AprsPacket> {
        std::mem::take(&mut self.transmitted)
    }

    /// Transmitted packets, in order, without draining.
    pub fn transmitted(&self) -> &[AprsPacket] {
        &self.transmitted
    }
}

impl RadioTransport for ChannelSim {
    fn transmit(&mut self, packet: &AprsPacket) -> Result<(), TransportError> {
        self.transmitted.push(packet.clone());
        Ok(())
    }

    fn poll_receive(&mut self) -> Option<Received> {
        self.inbound.pop_front()
    }
}
