//! Layer-2 neighbor table.
//!
//! One table per radio interface. The radio side is fed by whatever
//! tracks the actual wireless links (driver events, management daemons,
//! test fixtures) and mirrored into DLEP sessions; the router side
//! maintains the table as a projection of inbound DLEP signals.
//!
//! Entries are tagged with the origin that created them; a session must
//! only remove entries carrying its own origin. Mutations append
//! [`Layer2Event`]s which the runner drains and fans out to the
//! interface's sessions.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::util::MacAddress;

/// Identifies which session (or external feeder) owns a table entry.
pub type OriginId = u32;

/// Origin of entries written by the external link tracker rather than a
/// DLEP session.
pub const ORIGIN_EXTERNAL: OriginId = 0;

/// Link metrics of a neighbor or of the whole interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layer2Data {
    /// Maximum receive datarate, bit/s.
    pub max_rx_bitrate: Option<u64>,
    /// Maximum transmit datarate, bit/s.
    pub max_tx_bitrate: Option<u64>,
    /// Current receive datarate, bit/s.
    pub cur_rx_bitrate: Option<u64>,
    /// Current transmit datarate, bit/s.
    pub cur_tx_bitrate: Option<u64>,
    /// Latency in microseconds.
    pub latency: Option<u64>,
    /// Resources, percent.
    pub resources: Option<u8>,
    /// Relative receive link quality, percent.
    pub rx_link_quality: Option<u8>,
    /// Relative transmit link quality, percent.
    pub tx_link_quality: Option<u8>,
}

impl Layer2Data {
    /// True if no metric is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One layer-2 neighbor: a directly reachable wireless peer and the
/// destinations proxied behind it.
#[derive(Debug, Clone)]
pub struct Layer2Neighbor {
    /// MAC of the wireless interface.
    pub addr: MacAddress,
    /// Link metrics.
    pub data: Layer2Data,
    /// Origin that created the entry.
    pub origin: OriginId,
    /// Ethernet destinations reached through this neighbor.
    pub destinations: BTreeSet<MacAddress>,
}

/// Change notification produced by table mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer2Event {
    /// A direct neighbor appeared.
    NeighborAdded(MacAddress),
    /// A direct neighbor's data changed.
    NeighborChanged(MacAddress),
    /// A direct neighbor went away.
    NeighborRemoved(MacAddress),
    /// A proxied destination appeared behind a neighbor.
    DestinationAdded {
        /// Owning wireless neighbor.
        neighbor: MacAddress,
        /// Proxied endpoint.
        destination: MacAddress,
    },
    /// A proxied destination went away.
    DestinationRemoved {
        /// Owning wireless neighbor.
        neighbor: MacAddress,
        /// Proxied endpoint.
        destination: MacAddress,
    },
}

/// MAC-keyed neighbor table of one interface.
#[derive(Debug, Default)]
pub struct Layer2Table {
    name: String,
    neighbors: BTreeMap<MacAddress, Layer2Neighbor>,
    /// Interface-wide metrics (session defaults from PEER updates).
    net_data: Layer2Data,
    events: VecDeque<Layer2Event>,
    /// Entry limit; `None` is unbounded.
    capacity: Option<usize>,
}

impl Layer2Table {
    /// Create a table for the named interface.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a table holding at most `capacity` neighbors.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface-wide metrics.
    pub fn net_data(&self) -> &Layer2Data {
        &self.net_data
    }

    /// Interface-wide metrics, mutable.
    pub fn net_data_mut(&mut self) -> &mut Layer2Data {
        &mut self.net_data
    }

    /// Look up a neighbor.
    pub fn get(&self, mac: &MacAddress) -> Option<&Layer2Neighbor> {
        self.neighbors.get(mac)
    }

    /// Number of neighbors.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// True if the table has no neighbors.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Iterate all neighbors.
    pub fn neighbors(&self) -> impl Iterator<Item = &Layer2Neighbor> {
        self.neighbors.values()
    }

    /// Find the neighbor a destination MAC belongs to: the neighbor
    /// itself, or the owner of a proxied destination.
    pub fn find_endpoint(&self, mac: &MacAddress) -> Option<&Layer2Neighbor> {
        if let Some(neigh) = self.neighbors.get(mac) {
            return Some(neigh);
        }
        self.neighbors
            .values()
            .find(|n| n.destinations.contains(mac))
    }

    /// Get or create a neighbor entry tagged with `origin`.
    ///
    /// Fails when the table is at capacity, which the caller answers
    /// with a REQUEST_DENIED status.
    pub fn add_neighbor(
        &mut self,
        mac: MacAddress,
        origin: OriginId,
    ) -> Option<&mut Layer2Neighbor> {
        if !self.neighbors.contains_key(&mac) {
            if self
                .capacity
                .is_some_and(|limit| self.neighbors.len() >= limit)
            {
                return None;
            }
            self.neighbors.insert(
                mac,
                Layer2Neighbor {
                    addr: mac,
                    data: Layer2Data::default(),
                    origin,
                    destinations: BTreeSet::new(),
                },
            );
            self.events.push_back(Layer2Event::NeighborAdded(mac));
        }
        self.neighbors.get_mut(&mac)
    }

    /// Announce that a neighbor's data changed.
    pub fn notify_changed(&mut self, mac: MacAddress) {
        if self.neighbors.contains_key(&mac) {
            self.events.push_back(Layer2Event::NeighborChanged(mac));
        }
    }

    /// Remove a neighbor if it is tagged with `origin`.
    pub fn remove_neighbor(&mut self, mac: &MacAddress, origin: OriginId) -> bool {
        if !self
            .neighbors
            .get(mac)
            .is_some_and(|neigh| neigh.origin == origin)
        {
            return false;
        }
        if let Some(neigh) = self.neighbors.remove(mac) {
            for dest in &neigh.destinations {
                self.events.push_back(Layer2Event::DestinationRemoved {
                    neighbor: *mac,
                    destination: *dest,
                });
            }
            self.events.push_back(Layer2Event::NeighborRemoved(*mac));
        }
        true
    }

    /// Remove every entry tagged with `origin`. Used when a session
    /// terminates and its projection must be withdrawn.
    pub fn remove_origin(&mut self, origin: OriginId) {
        let macs: Vec<MacAddress> = self
            .neighbors
            .values()
            .filter(|n| n.origin == origin)
            .map(|n| n.addr)
            .collect();
        for mac in macs {
            self.remove_neighbor(&mac, origin);
        }
    }

    /// Register a proxied destination behind a neighbor.
    pub fn add_destination(&mut self, neighbor: &MacAddress, destination: MacAddress) -> bool {
        match self.neighbors.get_mut(neighbor) {
            Some(neigh) => {
                if neigh.destinations.insert(destination) {
                    self.events.push_back(Layer2Event::DestinationAdded {
                        neighbor: *neighbor,
                        destination,
                    });
                }
                true
            }
            None => false,
        }
    }

    /// Remove a proxied destination.
    pub fn remove_destination(&mut self, neighbor: &MacAddress, destination: &MacAddress) -> bool {
        match self.neighbors.get_mut(neighbor) {
            Some(neigh) => {
                let removed = neigh.destinations.remove(destination);
                if removed {
                    self.events.push_back(Layer2Event::DestinationRemoved {
                        neighbor: *neighbor,
                        destination: *destination,
                    });
                }
                removed
            }
            None => false,
        }
    }

    /// Drain the pending change notifications.
    pub fn take_events(&mut self) -> Vec<Layer2Event> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([2, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_add_and_find() {
        let mut table = Layer2Table::new("wlan0");
        table.add_neighbor(mac(1), ORIGIN_EXTERNAL).unwrap();
        table.add_destination(&mac(1), mac(9));

        assert_eq!(table.find_endpoint(&mac(1)).unwrap().addr, mac(1));
        assert_eq!(table.find_endpoint(&mac(9)).unwrap().addr, mac(1));
        assert!(table.find_endpoint(&mac(7)).is_none());
    }

    #[test]
    fn test_events() {
        let mut table = Layer2Table::new("wlan0");
        table.add_neighbor(mac(1), ORIGIN_EXTERNAL).unwrap();
        table.notify_changed(mac(1));
        table.remove_neighbor(&mac(1), ORIGIN_EXTERNAL);

        assert_eq!(
            table.take_events(),
            vec![
                Layer2Event::NeighborAdded(mac(1)),
                Layer2Event::NeighborChanged(mac(1)),
                Layer2Event::NeighborRemoved(mac(1)),
            ]
        );
        assert!(table.take_events().is_empty());
    }

    #[test]
    fn test_origin_protection() {
        let mut table = Layer2Table::new("wlan0");
        table.add_neighbor(mac(1), 7).unwrap();

        // a different origin must not remove the entry
        assert!(!table.remove_neighbor(&mac(1), 8));
        assert_eq!(table.len(), 1);

        table.add_neighbor(mac(2), 8).unwrap();
        table.remove_origin(8);
        assert!(table.get(&mac(2)).is_none());
        assert!(table.get(&mac(1)).is_some());
    }

    #[test]
    fn test_capacity_limit() {
        let mut table = Layer2Table::with_capacity("wlan0", 1);
        assert!(table.add_neighbor(mac(1), ORIGIN_EXTERNAL).is_some());
        assert!(table.add_neighbor(mac(2), ORIGIN_EXTERNAL).is_none());
        // existing entries still resolve
        assert!(table.add_neighbor(mac(1), ORIGIN_EXTERNAL).is_some());
    }

    #[test]
    fn test_remove_neighbor_drops_destinations() {
        let mut table = Layer2Table::new("wlan0");
        table.add_neighbor(mac(1), ORIGIN_EXTERNAL).unwrap();
        table.add_destination(&mac(1), mac(9));
        table.take_events();

        table.remove_neighbor(&mac(1), ORIGIN_EXTERNAL);
        assert_eq!(
            table.take_events(),
            vec![
                Layer2Event::DestinationRemoved {
                    neighbor: mac(1),
                    destination: mac(9)
                },
                Layer2Event::NeighborRemoved(mac(1)),
            ]
        );
    }
}
