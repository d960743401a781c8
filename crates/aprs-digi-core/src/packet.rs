//! APRS packet model and TNC2 text framing
//!
//! A packet is carried on the wire in TNC2 monitor format:
//!
//! ```text
//! SOURCE>DESTINATION,PATH1,PATH2*:body
//! ```
//!
//! The path is the digipeater trail; a trailing `*` on a path element
//! marks it as has-been-repeated. For duplicate suppression a packet is
//! identified by the (source, destination, body) triple only: the path
//! is exactly what changes on each hop, so it is excluded from the
//! identity test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded APRS packet.
///
/// Immutable once received, except for the path mutation applied when
/// the packet is forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AprsPacket {
    /// Originating station call sign
    pub source: String,
    /// APRS destination (tocall)
    pub destination: String,
    /// Digipeater trail, in hop order
    pub path: Vec<String>,
    /// Raw information field (position report, free text, ...)
    pub body: String,
}

impl AprsPacket {
    /// Create a packet with an empty path.
    pub fn new(source: &str, destination: &str, body: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            path: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Duplicate-identity test: same source, destination and body.
    ///
    /// The path is deliberately ignored: a packet relayed by a different
    /// node, or by this node a second time, is still the same message if
    /// the payload triple matches.
    pub fn is_duplicate_of(&self, other: &AprsPacket) -> bool {
        self.source == other.source
            && self.destination == other.destination
            && self.body == other.body
    }

    /// Whether the packet originated from (or was already handled by)
    /// the given call sign. Substring containment, matching how a
    /// call sign shows up with SSID suffixes.
    pub fn is_from(&self, callsign: &str) -> bool {
        self.source.contains(callsign)
    }

    /// Append our call sign to the path, marked as has-been-repeated.
    pub fn mark_repeated(&mut self, callsign: &str) {
        self.path.push(format!("{}*", callsign));
    }

    /// Encode to TNC2 monitor format.
    pub fn encode(&self) -> String {
        if self.path.is_empty() {
            format!("{}>{}:{}", self.source, self.destination, self.body)
        } else {
            format!(
                "{}>{},{}:{}",
                self.source,
                self.destination,
                self.path.join(","),
                self.body
            )
        }
    }

    /// Decode from TNC2 monitor format.
    ///
    /// Returns `None` for frames without the `SRC>DST:` skeleton. The
    /// body may be empty; body semantics are not interpreted here.
    pub fn decode(frame: &str) -> Option<Self> {
        let (header, body) = frame.split_once(':')?;
        let (source, dest_and_path) = header.split_once('>')?;
        if source.is_empty() {
            return None;
        }

        let mut parts = dest_and_path.split(',');
        let destination = parts.next()?;
        if destination.is_empty() {
            return None;
        }
        let path: Vec<String> = parts.map(str::to_string).collect();

        Some(Self {
            source: source.to_string(),
            destination: destination.to_string(),
            path,
            body: body.to_string(),
        })
    }
}

impl fmt::Display for AprsPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_no_path() {
        let packet = AprsPacket::new("OE5ABC", "APLG0", "hello");
        assert_eq!(packet.encode(), "OE5ABC>APLG0:hello");
    }

    #[test]
    fn test_encode_with_path() {
        let mut packet = AprsPacket::new("OE5ABC", "APLG0", "hello");
        packet.path.push("WIDE1-1".to_string());
        packet.mark_repeated("OE5XYZ");
        assert_eq!(packet.encode(), "OE5ABC>APLG0,WIDE1-1,OE5XYZ*:hello");
    }

    #[test]
    fn test_decode_roundtrip() {
        let frame = "OE5ABC-7>APRS,WIDE1-1,OE5XYZ*:=4749.50N/01330.00E-test";
        let packet = AprsPacket::decode(frame).unwrap();
        assert_eq!(packet.source, "OE5ABC-7");
        assert_eq!(packet.destination, "APRS");
        assert_eq!(packet.path, vec!["WIDE1-1", "OE5XYZ*"]);
        assert_eq!(packet.body, "=4749.50N/01330.00E-test");
        assert_eq!(packet.encode(), frame);
    }

    #[test]
    fn test_decode_body_with_colons() {
        let packet = AprsPacket::decode("A>B::OE5XYZ   :ack001").unwrap();
        assert_eq!(packet.body, ":OE5XYZ   :ack001");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(AprsPacket::decode("no frame here").is_none());
        assert!(AprsPacket::decode(">APRS:body").is_none());
        assert!(AprsPacket::decode("A>:body").is_none());
    }

    #[test]
    fn test_duplicate_identity_ignores_path() {
        let a = AprsPacket::decode("A>B,WIDE1-1:hello").unwrap();
        let b = AprsPacket::decode("A>B,DIGI1*,DIGI2*:hello").unwrap();
        assert!(a.is_duplicate_of(&b));
        assert!(b.is_duplicate_of(&a)); // symmetric
        assert!(a.is_duplicate_of(&a)); // reflexive
    }

    #[test]
    fn test_duplicate_identity_triple() {
        let a = AprsPacket::new("A", "B", "hello");
        assert!(!a.is_duplicate_of(&AprsPacket::new("C", "B", "hello")));
        assert!(!a.is_duplicate_of(&AprsPacket::new("A", "C", "hello")));
        assert!(!a.is_duplicate_of(&AprsPacket::new("A", "B", "other")));
    }

    #[test]
    fn test_is_from_matches_ssid_variants() {
        let packet = AprsPacket::new("OE5XYZ-10", "APRS", "x");
        assert!(packet.is_from("OE5XYZ"));
        assert!(!packet.is_from("OE5ABC"));
    }
}
