//! # LoRa APRS Digipeater Core
//!
//! This crate implements the station logic of a LoRa APRS digipeater:
//! a node that periodically beacons its own position and retransmits
//! ("digipeats") APRS packets heard on the air, while suppressing
//! duplicate retransmission within a time window.
//!
//! The radio itself is behind the [`RadioTransport`] seam; an optional
//! [`UplinkTransport`] mirrors the same traffic to an APRS-IS internet
//! gateway. Everything else is pure station logic and runs the same on
//! hardware, over UDP, or inside the traffic simulator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         DigiNode                             │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌────────────────┐   │
//! │  │ ClockSource  │─►│ BeaconScheduler │  │   Digipeater   │   │
//! │  │ (1 Hz tick)  │  │ (WAITING / DUE) │  │ (echo / dup /  │   │
//! │  └──────────────┘  └─────────────────┘  │    forward)    │   │
//! │                                         │  RecentLedger  │   │
//! │                                         └────────────────┘   │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 ▼                               ▼
//!         RadioTransport                   UplinkTransport
//!        (LoRa / UDP / sim)                  (APRS-IS TCP)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use aprs_digi_core::{ChannelSim, DigiConfig, DigiNode, NoUplink};
//!
//! let config = DigiConfig {
//!     callsign: "OE5XYZ-1".into(),
//!     ..DigiConfig::default()
//! };
//!
//! let mut node = DigiNode::new(config, ChannelSim::new(), NoUplink).unwrap();
//!
//! // One cooperative control-loop iteration: beacon check, at most one
//! // inbound packet, otherwise ledger pruning.
//! node.poll();
//! ```

pub mod beacon;
pub mod clock;
pub mod config;
pub mod digipeater;
pub mod geo;
pub mod igate;
pub mod ledger;
pub mod node;
pub mod packet;
pub mod simulation;
pub mod transport;

// Re-export main types
pub use beacon::{BeaconScheduler, StationKind};
pub use clock::{ClockHandle, ClockSnapshot, ClockSource};
pub use config::{ConfigError, DigiConfig, IgateConfig};
pub use digipeater::{DigiStats, Digipeater, Outcome};
pub use geo::{format_latitude, format_longitude};
pub use igate::{aprs_passcode, IsUplink};
pub use ledger::RecentLedger;
pub use node::{DigiNode, PollEvent};
pub use packet::AprsPacket;
pub use simulation::{SimConfig, SimReport, TrafficSim};
pub use transport::{ChannelSim, NoUplink, RadioTransport, Received, TransportError, UplinkTransport};
