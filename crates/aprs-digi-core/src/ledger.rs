//! Recent-message ledger for duplicate suppression
//!
//! A time-indexed record of packets this station has forwarded. Entries
//! are keyed by their insertion timestamp (seconds since startup), so
//! pruning walks keys in ascending order and expires a whole prefix in
//! one cut. Several packets forwarded within the same second share a
//! key; their relative order is immaterial.
//!
//! There is no capacity ceiling; entries only ever leave through
//! time-based pruning. Unbounded growth is theoretically possible if
//! traffic rate times the forward timeout outruns memory, but LoRa
//! traffic volumes make that an accepted risk rather than something the
//! ledger mitigates.

use crate::packet::AprsPacket;
use std::collections::BTreeMap;

/// Ordered record of recently forwarded packets.
#[derive(Debug, Default)]
pub struct RecentLedger {
    entries: BTreeMap<u64, Vec<AprsPacket>>,
}

impl RecentLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record a forwarded packet at the given timestamp.
    ///
    /// No uniqueness is enforced here; the duplicate check happens at the
    /// decision-engine level before insertion.
    pub fn insert(&mut self, timestamp: u64, packet: AprsPacket) {
        self.entries.entry(timestamp).or_default().push(packet);
    }

    /// Find a recorded packet with the same (source, destination, body)
    /// triple. Linear scan in ascending timestamp order; the first match
    /// is returned (any match suffices, the identity is coarse-grained).
    pub fn find_duplicate(&self, packet: &AprsPacket) -> Option<(u64, &AprsPacket)> {
        for (&timestamp, bucket) in &self.entries {
            for entry in bucket {
                if entry.is_duplicate_of(packet) {
                    return Some((timestamp, entry));
                }
            }
        }
        None
    }

    /// Remove every entry whose age has reached the forward timeout,
    /// i.e. all entries with `now >= timestamp + timeout_secs`. Returns
    /// the number of packets removed. Safe on an empty ledger.
    pub fn prune_expired(&mut self, now: u64, timeout_secs: u64) -> usize {
        // Entries survive iff timestamp + timeout > now; the keys are
        // ordered, so everything below the cutoff expires in one cut.
        let cutoff = (now + 1).saturating_sub(timeout_secs);
        let retained = self.entries.split_off(&cutoff);
        let removed = self.entries.values().map(Vec::len).sum();
        self.entries = retained;
        removed
    }

    /// Number of recorded packets.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether the ledger holds no packets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(source: &str, body: &str) -> AprsPacket {
        AprsPacket::new(source, "APRS", body)
    }

    #[test]
    fn test_insert_and_find() {
        let mut ledger = RecentLedger::new();
        ledger.insert(10, packet("A", "hello"));

        let (ts, entry) = ledger.find_duplicate(&packet("A", "hello")).unwrap();
        assert_eq!(ts, 10);
        assert_eq!(entry.body, "hello");
        assert!(ledger.find_duplicate(&packet("B", "hello")).is_none());
    }

    #[test]
    fn test_find_ignores_path() {
        let mut ledger = RecentLedger::new();
        let mut recorded = packet("A", "hello");
        recorded.path.push("DIGI1*".to_string());
        ledger.insert(0, recorded);

        let mut probe = packet("A", "hello");
        probe.path.push("DIGI2*".to_string());
        assert!(ledger.find_duplicate(&probe).is_some());
    }

    #[test]
    fn test_same_second_entries_coexist() {
        let mut ledger = RecentLedger::new();
        ledger.insert(5, packet("A", "one"));
        ledger.insert(5, packet("B", "two"));

        assert_eq!(ledger.len(), 2);
        assert!(ledger.find_duplicate(&packet("A", "one")).is_some());
        assert!(ledger.find_duplicate(&packet("B", "two")).is_some());
    }

    #[test]
    fn test_prune_removes_expired_only() {
        let mut ledger = RecentLedger::new();
        ledger.insert(0, packet("A", "old"));
        ledger.insert(100, packet("B", "newer"));
        ledger.insert(250, packet("C", "newest"));

        // timeout 300: at t=300 only the t=0 entry has aged out.
        let removed = ledger.prune_expired(300, 300);
        assert_eq!(removed, 1);
        assert!(ledger.find_duplicate(&packet("A", "old")).is_none());
        assert!(ledger.find_duplicate(&packet("B", "newer")).is_some());
        assert!(ledger.find_duplicate(&packet("C", "newest")).is_some());
    }

    #[test]
    fn test_prune_boundary_is_inclusive() {
        // An entry expires exactly when now - timestamp == timeout.
        let mut ledger = RecentLedger::new();
        ledger.insert(100, packet("A", "x"));

        assert_eq!(ledger.prune_expired(399, 300), 0);
        assert_eq!(ledger.prune_expired(400, 300), 1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_prune_empty_ledger() {
        let mut ledger = RecentLedger::new();
        assert_eq!(ledger.prune_expired(1000, 300), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_prune_monotonic_under_advancing_now() {
        let mut ledger = RecentLedger::new();
        for t in 0..10 {
            ledger.insert(t * 50, packet("A", &format!("msg{}", t)));
        }

        let mut prev_len = ledger.len();
        for now in [100u64, 200, 300, 450, 450, 600, 1000] {
            ledger.prune_expired(now, 300);
            // No surviving entry may have reached the timeout age.
            for t in 0..10u64 {
                let p = packet("A", &format!("msg{}", t));
                if let Some((ts, _)) = ledger.find_duplicate(&p) {
                    assert!(now < ts + 300);
                }
            }
            assert!(ledger.len() <= prev_len);
            prev_len = ledger.len();
        }
    }

    #[test]
    fn test_prune_near_startup_does_not_underflow() {
        let mut ledger = RecentLedger::new();
        ledger.insert(0, packet("A", "boot"));
        // now < timeout: nothing can have expired yet.
        assert_eq!(ledger.prune_expired(5, 300), 0);
        assert_eq!(ledger.len(), 1);
    }
}
