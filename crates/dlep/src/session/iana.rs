//! DLEP protocol numbering: signal types, TLV types, status codes and
//! well-known transport addresses.
//!
//! All ids live in this one module so a wire-compatibility audit only has
//! to look in one place. Multi-byte values are big-endian on the wire.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Well-known DLEP TCP/UDP port.
pub const DLEP_PORT: u16 = 854;

/// Link-local IPv4 multicast group for peer discovery.
pub const DLEP_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 117);

/// Link-local IPv6 multicast group for peer discovery.
pub const DLEP_MULTICAST_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 1, 7);

/// DLEP signal types.
///
/// `PEER_DISCOVERY` and `PEER_OFFER` travel in UDP datagrams, everything
/// else on the TCP session.
pub struct SignalId;

impl SignalId {
    /// Router solicits radios on the discovery multicast group.
    pub const PEER_DISCOVERY: u16 = 1;
    /// Radio answers a discovery with its connection points.
    pub const PEER_OFFER: u16 = 2;
    /// First signal on the TCP session, router to radio.
    pub const PEER_INITIALIZATION: u16 = 3;
    /// Radio's answer completing session setup.
    pub const PEER_INITIALIZATION_ACK: u16 = 4;
    /// Session-wide data update.
    pub const PEER_UPDATE: u16 = 5;
    pub const PEER_UPDATE_ACK: u16 = 6;
    /// Orderly shutdown request.
    pub const PEER_TERMINATION: u16 = 7;
    pub const PEER_TERMINATION_ACK: u16 = 8;
    /// A destination became reachable.
    pub const DESTINATION_UP: u16 = 9;
    pub const DESTINATION_UP_ACK: u16 = 10;
    /// A destination was lost.
    pub const DESTINATION_DOWN: u16 = 11;
    pub const DESTINATION_DOWN_ACK: u16 = 12;
    /// Metric refresh for an established destination.
    pub const DESTINATION_UPDATE: u16 = 13;
    /// Keepalive, sent at the negotiated interval.
    pub const HEARTBEAT: u16 = 14;
    pub const LINK_CHARACTERISTICS_REQUEST: u16 = 15;
    pub const LINK_CHARACTERISTICS_ACK: u16 = 16;
}

/// DLEP TLV (data item) types.
pub struct TlvId;

impl TlvId {
    /// Status code plus optional UTF-8 text.
    pub const STATUS: u16 = 1;
    /// IPv4 connection point: flags, address, port.
    pub const IPV4_CONPOINT: u16 = 2;
    /// IPv6 connection point: flags, address, port.
    pub const IPV6_CONPOINT: u16 = 3;
    /// Free-form peer description.
    pub const PEER_TYPE: u16 = 4;
    /// Local heartbeat interval in milliseconds.
    pub const HEARTBEAT_INTERVAL: u16 = 5;
    /// List of extension ids the sender supports.
    pub const EXTENSIONS_SUPPORTED: u16 = 6;
    /// EUI-48 destination address.
    pub const MAC_ADDRESS: u16 = 7;
    /// IPv4 address of a destination (parsed, not acted on).
    pub const IPV4_ADDRESS: u16 = 8;
    /// IPv6 address of a destination (parsed, not acted on).
    pub const IPV6_ADDRESS: u16 = 9;
    /// Maximum datarate receive, bit/s.
    pub const MDRR: u16 = 12;
    /// Maximum datarate transmit, bit/s.
    pub const MDRT: u16 = 13;
    /// Current datarate receive, bit/s.
    pub const CDRR: u16 = 14;
    /// Current datarate transmit, bit/s.
    pub const CDRT: u16 = 15;
    /// Latency in microseconds.
    pub const LATENCY: u16 = 16;
    /// Resources, percentage 0-100.
    pub const RESOURCES: u16 = 17;
    /// Relative link quality receive, 0-100.
    pub const RLQR: u16 = 18;
    /// Relative link quality transmit, 0-100.
    pub const RLQT: u16 = 19;
}

/// Status codes carried in [`TlvId::STATUS`] TLVs.
pub struct StatusCode;

impl StatusCode {
    pub const SUCCESS: u8 = 0;
    pub const NOT_INTERESTED: u8 = 1;
    pub const REQUEST_DENIED: u8 = 2;
    pub const INVALID_DATA: u8 = 6;
}

/// Connection point TLV flag: endpoint expects TLS.
pub const CONPOINT_FLAG_TLS: u8 = 0x01;

/// Extension id of the base protocol itself. Never negotiated, always
/// active, never put on the wire in EXTENSIONS_SUPPORTED.
pub const BASE_PROTO_EXTENSION: u16 = 0;

/// Human-readable signal name for logging.
pub fn signal_name(signal: u16) -> &'static str {
    match signal {
        SignalId::PEER_DISCOVERY => "PEER_DISCOVERY",
        SignalId::PEER_OFFER => "PEER_OFFER",
        SignalId::PEER_INITIALIZATION => "PEER_INITIALIZATION",
        SignalId::PEER_INITIALIZATION_ACK => "PEER_INITIALIZATION_ACK",
        SignalId::PEER_UPDATE => "PEER_UPDATE",
        SignalId::PEER_UPDATE_ACK => "PEER_UPDATE_ACK",
        SignalId::PEER_TERMINATION => "PEER_TERMINATION",
        SignalId::PEER_TERMINATION_ACK => "PEER_TERMINATION_ACK",
        SignalId::DESTINATION_UP => "DESTINATION_UP",
        SignalId::DESTINATION_UP_ACK => "DESTINATION_UP_ACK",
        SignalId::DESTINATION_DOWN => "DESTINATION_DOWN",
        SignalId::DESTINATION_DOWN_ACK => "DESTINATION_DOWN_ACK",
        SignalId::DESTINATION_UPDATE => "DESTINATION_UPDATE",
        SignalId::HEARTBEAT => "HEARTBEAT",
        SignalId::LINK_CHARACTERISTICS_REQUEST => "LINK_CHARACTERISTICS_REQUEST",
        SignalId::LINK_CHARACTERISTICS_ACK => "LINK_CHARACTERISTICS_ACK",
        _ => "UNKNOWN",
    }
}
