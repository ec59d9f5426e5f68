//! Destination table: per-MAC local neighbors and their
//! acknowledgment sub-state-machine.
//!
//! ```text
//!              send UP               UP_ACK recv                     change
//!  IDLE ─────────────────▶ UP_SENT ─────────────▶ UP_ACKED ──▶ (emit UPDATE)
//!    ▲                       │                        │
//!    │                   ack timeout               send DOWN
//!    │                       │                        ▼
//!    └──────── ack timeout ──┴─────────────────── DOWN_SENT ── DOWN_ACK ──▶ removed
//! ```
//!
//! Entries in `UP_SENT` or `DOWN_SENT` always carry an armed ack
//! deadline; reaching `DOWN_ACKED` or an ack timeout removes the entry.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::util::MacAddress;

/// Acknowledgment state of one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborState {
    /// Created but never announced.
    Idle,
    /// DESTINATION_UP sent, waiting for the ack.
    UpSent,
    /// DESTINATION_UP acknowledged.
    UpAcked,
    /// DESTINATION_DOWN sent, waiting for the ack.
    DownSent,
    /// DESTINATION_DOWN acknowledged; the entry is about to go away.
    DownAcked,
}

/// One destination the session has announced (or is announcing).
#[derive(Debug, Clone)]
pub struct LocalNeighbor {
    /// Endpoint MAC, possibly a proxied Ethernet address.
    pub addr: MacAddress,
    /// Acknowledgment state.
    state: NeighborState,
    /// Destination data changed while an UP was still unacked.
    changed: bool,
    /// Wireless neighbor the endpoint is proxied behind, if any.
    pub neigh_addr: Option<MacAddress>,
    /// Ack deadline; armed exactly in the two SENT states.
    ack_deadline: Option<Instant>,
}

impl LocalNeighbor {
    fn new(addr: MacAddress) -> Self {
        Self {
            addr,
            state: NeighborState::Idle,
            changed: false,
            neigh_addr: None,
            ack_deadline: None,
        }
    }

    /// Current acknowledgment state.
    pub fn state(&self) -> NeighborState {
        self.state
    }

    /// True if the destination changed while an UP was unacked.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Record a data change to be flushed after the pending UP_ACK.
    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    /// Armed ack deadline, if any.
    pub fn ack_deadline(&self) -> Option<Instant> {
        self.ack_deadline
    }

    /// Enter `UP_SENT` with a fresh ack deadline.
    pub fn up_sent(&mut self, deadline: Instant) {
        self.state = NeighborState::UpSent;
        self.changed = false;
        self.ack_deadline = Some(deadline);
    }

    /// Enter `UP_ACKED`, disarming the ack deadline.
    pub fn up_acked(&mut self) {
        self.state = NeighborState::UpAcked;
        self.ack_deadline = None;
    }

    /// Enter `DOWN_SENT` with a fresh ack deadline.
    pub fn down_sent(&mut self, deadline: Instant) {
        self.state = NeighborState::DownSent;
        self.ack_deadline = Some(deadline);
    }
}

/// MAC-keyed table of local neighbors.
#[derive(Debug, Default)]
pub struct NeighborTable {
    entries: BTreeMap<MacAddress, LocalNeighbor>,
}

impl NeighborTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry.
    pub fn get(&self, mac: &MacAddress) -> Option<&LocalNeighbor> {
        self.entries.get(mac)
    }

    /// Look up an entry mutably.
    pub fn get_mut(&mut self, mac: &MacAddress) -> Option<&mut LocalNeighbor> {
        self.entries.get_mut(mac)
    }

    /// Get or create the entry for a MAC; new entries start `Idle`.
    pub fn add(&mut self, mac: MacAddress) -> &mut LocalNeighbor {
        self.entries
            .entry(mac)
            .or_insert_with(|| LocalNeighbor::new(mac))
    }

    /// Remove an entry.
    pub fn remove(&mut self, mac: &MacAddress) -> Option<LocalNeighbor> {
        self.entries.remove(mac)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no destinations are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries.
    pub fn iter(&self) -> impl Iterator<Item = &LocalNeighbor> {
        self.entries.values()
    }

    /// Earliest armed ack deadline across all entries.
    pub fn next_ack_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter_map(|n| n.ack_deadline)
            .min()
    }

    /// MACs whose ack deadline has expired at `now`.
    pub fn expired(&self, now: Instant) -> Vec<MacAddress> {
        self.entries
            .values()
            .filter(|n| n.ack_deadline.is_some_and(|d| d <= now))
            .map(|n| n.addr)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last])
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut table = NeighborTable::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        table.add(mac(1)).up_sent(deadline);
        // second add must not reset state
        assert_eq!(table.add(mac(1)).state(), NeighborState::UpSent);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sent_states_have_deadline() {
        let mut table = NeighborTable::new();
        let deadline = Instant::now() + Duration::from_secs(10);

        let n = table.add(mac(1));
        n.up_sent(deadline);
        assert!(n.ack_deadline().is_some());

        n.up_acked();
        assert!(n.ack_deadline().is_none());

        n.down_sent(deadline);
        assert!(n.ack_deadline().is_some());
    }

    #[test]
    fn test_expired_and_next_deadline() {
        let mut table = NeighborTable::new();
        let now = Instant::now();

        table.add(mac(1)).up_sent(now + Duration::from_secs(5));
        table.add(mac(2)).up_sent(now + Duration::from_secs(1));
        table.add(mac(3)).up_acked();

        assert_eq!(table.next_ack_deadline(), Some(now + Duration::from_secs(1)));
        assert!(table.expired(now).is_empty());

        let expired = table.expired(now + Duration::from_secs(2));
        assert_eq!(expired, vec![mac(2)]);
    }

    #[test]
    fn test_changed_flag() {
        let mut table = NeighborTable::new();
        let n = table.add(mac(1));
        n.up_sent(Instant::now() + Duration::from_secs(10));
        assert!(!n.changed());
        n.set_changed(true);
        assert!(n.changed());
        // a fresh UP announcement clears the pending-change flag
        n.up_sent(Instant::now() + Duration::from_secs(10));
        assert!(!n.changed());
    }
}
