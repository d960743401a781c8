//! APRS-IS internet uplink
//!
//! Minimal client for the APRS-IS network: connect over TCP, send the
//! login line, then write raw TNC2-encoded frames terminated with CRLF.
//! No reading of server traffic beyond discarding it; this station only
//! relays outward. Connection loss is a transient condition; the node
//! retries with fixed backoff, never gives up.

use crate::config::IgateConfig;
use crate::packet::AprsPacket;
use crate::transport::{TransportError, UplinkTransport};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;
use tracing::{info, warn};

/// Software identification sent with the login line.
const CLIENT_VERSION: &str = concat!("aprs-digi ", env!("CARGO_PKG_VERSION"));

/// Derive the APRS-IS login passcode for a call sign.
///
/// The well-known 15-bit hash over the uppercased base call sign (SSID
/// stripped).
pub fn aprs_passcode(callsign: &str) -> i16 {
    let base = callsign.split('-').next().unwrap_or(callsign).to_uppercase();
    let mut hash: u16 = 0x73e2;
    for (i, byte) in base.bytes().enumerate() {
        if i % 2 == 0 {
            hash ^= (byte as u16) << 8;
        } else {
            hash ^= byte as u16;
        }
    }
    (hash & 0x7fff) as i16
}

/// TCP uplink to an APRS-IS server.
#[derive(Debug)]
pub struct IsUplink {
    callsign: String,
    config: IgateConfig,
    stream: Option<TcpStream>,
}

impl IsUplink {
    pub fn new(callsign: &str, config: IgateConfig) -> Self {
        Self {
            callsign: callsign.to_string(),
            config,
            stream: None,
        }
    }

    fn login_line(&self) -> String {
        format!(
            "user {} pass {} vers {}\r\n",
            self.callsign, self.config.passcode, CLIENT_VERSION
        )
    }
}

impl UplinkTransport for IsUplink {
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        let addr = (self.config.host.as_str(), self.config.port);
        let mut stream = TcpStream::connect(addr)?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        stream.write_all(self.login_line().as_bytes())?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            "connected to APRS-IS"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, packet: &AprsPacket) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let frame = format!("{}\r\n", packet.encode());

        if let Err(err) = stream.write_all(frame.as_bytes()) {
            warn!("APRS-IS connection lost: {}", err);
            self.stream = None;
            return Err(TransportError::Io(err));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passcode_known_values() {
        // Reference values from the de-facto standard implementation.
        assert_eq!(aprs_passcode("N0CALL"), 13023);
        assert_eq!(aprs_passcode("OE5BPA"), 22948);
    }

    #[test]
    fn test_passcode_ignores_ssid_and_case() {
        assert_eq!(aprs_passcode("n0call-10"), aprs_passcode("N0CALL"));
    }

    #[test]
    fn test_login_line_format() {
        let uplink = IsUplink::new(
            "OE5XYZ-10",
            IgateConfig {
                host: "euro.aprs2.net".to_string(),
                port: 14580,
                passcode: 12345,
            },
        );
        let line = uplink.login_line();
        assert!(line.starts_with("user OE5XYZ-10 pass 12345 vers "));
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn test_send_requires_connection() {
        let mut uplink = IsUplink::new(
            "OE5XYZ-10",
            IgateConfig {
                host: "localhost".to_string(),
                port: 14580,
                passcode: 0,
            },
        );
        let err = uplink.send(&AprsPacket::new("A", "B", "x")).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}
