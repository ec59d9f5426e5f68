//! Radio role of the base protocol: answer discovery, accept session
//! initialization, mirror the layer-2 neighbor table into destination
//! signals.

use std::net::IpAddr;

use tracing::{debug, info};

use super::super::error::{Error, Result};
use super::super::extension::{Extension, TlvDecl};
use super::super::iana::{BASE_PROTO_EXTENSION, SignalId, StatusCode};
use super::super::neighbor::NeighborState;
use super::super::reader;
use super::super::session::{DlepSession, SignalRestriction};
use crate::l2::{Layer2Event, Layer2Table};
use crate::util::MacAddress;

/// Base protocol handlers for radio sessions.
#[derive(Debug, Default)]
pub struct BaseProtoRadio;

impl BaseProtoRadio {
    /// Create the extension instance.
    pub fn new() -> Self {
        Self
    }

    fn process_peer_discovery(&self, session: &mut DlepSession, l2: &Layer2Table) -> Result<()> {
        if session.restrict() != SignalRestriction::Only(SignalId::PEER_DISCOVERY) {
            // ignore unless we are in discovery mode
            return Ok(());
        }
        session.generate_signal(l2, SignalId::PEER_OFFER, None)
    }

    fn process_peer_init(&self, session: &mut DlepSession, l2: &mut Layer2Table) -> Result<()> {
        if session.restrict() != SignalRestriction::Only(SignalId::PEER_INITIALIZATION) {
            // ignore unless we are in initialization mode
            return Ok(());
        }

        let interval = reader::heartbeat_interval(session.parser())?;
        session.set_remote_heartbeat_interval(interval);
        debug!(
            interface = %session.if_name(),
            remote_heartbeat_ms = interval.as_millis(),
            "peer initialization"
        );

        session.start_local_heartbeat();
        session.arm_remote_watchdog();
        super::log_peer_type(session);

        let announced = reader::extension_ids(session.parser())?;
        session.update_extensions(&announced)?;

        session.generate_signal(l2, SignalId::PEER_INITIALIZATION_ACK, None)?;

        // trigger DESTINATION_UP for everything already in the l2 table
        let mut destinations: Vec<(MacAddress, Option<MacAddress>)> = Vec::new();
        for neigh in l2.neighbors() {
            if session.cfg().send_neighbors {
                destinations.push((neigh.addr, None));
            }
            if session.cfg().send_proxied {
                for dest in &neigh.destinations {
                    destinations.push((*dest, Some(neigh.addr)));
                }
            }
        }
        for (mac, via) in destinations {
            debug!(interface = %session.if_name(), destination = %mac, "announce local neighbor");
            announce_destination(session, l2, mac, via)?;
        }

        session.set_next_restrict(SignalRestriction::Any);
        Ok(())
    }

    fn process_destination_up(&self, session: &mut DlepSession, l2: &Layer2Table) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        // no IP address exchange with the router at the moment
        session.generate_signal(l2, SignalId::DESTINATION_UP_ACK, Some(&mac))
    }

    fn process_destination_up_ack(
        &self,
        session: &mut DlepSession,
        l2: &Layer2Table,
    ) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        if super::log_status(session)? != StatusCode::SUCCESS {
            return Ok(());
        }

        let mut emit_update = false;
        if let Some(entry) = session.neighbors_mut().get_mut(&mac) {
            if entry.state() == NeighborState::UpSent {
                entry.up_acked();
                if entry.changed() {
                    entry.set_changed(false);
                    emit_update = true;
                }
            }
        }
        if emit_update {
            session.generate_signal(l2, SignalId::DESTINATION_UPDATE, Some(&mac))?;
        }
        Ok(())
    }

    fn process_destination_down(&self, session: &mut DlepSession, l2: &Layer2Table) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        session.generate_signal(l2, SignalId::DESTINATION_DOWN_ACK, Some(&mac))
    }

    fn process_destination_down_ack(&self, session: &mut DlepSession) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        if super::log_status(session)? != StatusCode::SUCCESS {
            return Ok(());
        }
        if session
            .neighbors()
            .get(&mac)
            .is_some_and(|entry| entry.state() == NeighborState::DownSent)
        {
            session.neighbors_mut().remove(&mac);
        }
        Ok(())
    }

    fn process_link_char_request(
        &self,
        session: &mut DlepSession,
        l2: &Layer2Table,
    ) -> Result<()> {
        // no link characteristic negotiation; confirm receipt
        let mac = reader::mac_address(session.parser())?;
        session.generate_signal(l2, SignalId::LINK_CHARACTERISTICS_ACK, Some(&mac))
    }

    fn write_peer_offer(&self, session: &mut DlepSession) -> Result<()> {
        let conpoints = session.local_conpoints().to_vec();
        let writer = session.writer_mut();
        for cp in conpoints {
            // no support for TLS at the moment
            match cp.addr {
                IpAddr::V4(addr) => writer.add_ipv4_conpoint_tlv(addr, cp.port, false)?,
                IpAddr::V6(addr) => writer.add_ipv6_conpoint_tlv(addr, cp.port, false)?,
            }
        }
        Ok(())
    }

    fn write_peer_init_ack(&self, session: &mut DlepSession) -> Result<()> {
        let heartbeat = session.cfg().heartbeat_interval;
        let ids = session.negotiable_extension_ids();
        let peer_type = session.cfg().peer_type.clone();

        let writer = session.writer_mut();
        writer.add_heartbeat_tlv(heartbeat)?;
        if !ids.is_empty() {
            writer.add_supported_extensions(&ids)?;
        }
        if !peer_type.is_empty() {
            writer.add_peer_type_tlv(&peer_type)?;
        }
        Ok(())
    }

    fn write_destination(
        &self,
        session: &mut DlepSession,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
    ) -> Result<()> {
        let mac = *mac.ok_or_else(|| {
            Error::InternalError(format!("signal {signal} generated without destination"))
        })?;
        session.writer_mut().add_mac_tlv(&mac)?;

        if signal == SignalId::DESTINATION_UP || signal == SignalId::DESTINATION_UPDATE {
            write_metrics(session, l2, &mac)?;
        }
        Ok(())
    }
}

impl Extension for BaseProtoRadio {
    fn id(&self) -> u16 {
        BASE_PROTO_EXTENSION
    }

    fn tlv_decls(&self) -> &[TlvDecl] {
        super::TLV_DECLS
    }

    fn process_signal(
        &self,
        session: &mut DlepSession,
        l2: &mut Layer2Table,
        signal: u16,
    ) -> Result<()> {
        match signal {
            SignalId::PEER_DISCOVERY => self.process_peer_discovery(session, l2),
            SignalId::PEER_INITIALIZATION => self.process_peer_init(session, l2),
            SignalId::PEER_UPDATE => {
                // no IP address exchange support; confirm unconditionally
                session.generate_signal(l2, SignalId::PEER_UPDATE_ACK, None)
            }
            SignalId::PEER_UPDATE_ACK => super::log_status(session).map(|_| ()),
            SignalId::PEER_TERMINATION => super::process_peer_termination(session, l2),
            SignalId::PEER_TERMINATION_ACK => super::process_peer_termination_ack(session, l2),
            SignalId::DESTINATION_UP => self.process_destination_up(session, l2),
            SignalId::DESTINATION_UP_ACK => self.process_destination_up_ack(session, l2),
            SignalId::DESTINATION_DOWN => self.process_destination_down(session, l2),
            SignalId::DESTINATION_DOWN_ACK => self.process_destination_down_ack(session),
            SignalId::DESTINATION_UPDATE => Ok(()),
            SignalId::HEARTBEAT => super::process_heartbeat(session),
            SignalId::LINK_CHARACTERISTICS_REQUEST => self.process_link_char_request(session, l2),
            _ => Ok(()),
        }
    }

    fn write_signal(
        &self,
        session: &mut DlepSession,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
    ) -> Result<()> {
        match signal {
            SignalId::PEER_OFFER => self.write_peer_offer(session),
            SignalId::PEER_INITIALIZATION_ACK => self.write_peer_init_ack(session),
            SignalId::DESTINATION_UP
            | SignalId::DESTINATION_UP_ACK
            | SignalId::DESTINATION_DOWN
            | SignalId::DESTINATION_DOWN_ACK
            | SignalId::DESTINATION_UPDATE
            | SignalId::LINK_CHARACTERISTICS_ACK => self.write_destination(session, l2, signal, mac),
            _ => Ok(()),
        }
    }

    fn session_init(&self, session: &mut DlepSession, _l2: &Layer2Table) -> Result<()> {
        if session.restrict() == SignalRestriction::Only(SignalId::PEER_INITIALIZATION) {
            // waiting for a Peer Init; watch the peer with our own
            // interval until it announces one
            let interval = session.cfg().heartbeat_interval;
            session.set_remote_heartbeat_interval(interval);
            session.arm_remote_watchdog();
        }
        Ok(())
    }
}

/// Write every metric the l2 table knows about the destination's
/// endpoint.
fn write_metrics(session: &mut DlepSession, l2: &Layer2Table, mac: &MacAddress) -> Result<()> {
    use super::super::iana::TlvId;

    let Some(endpoint) = l2.find_endpoint(mac) else {
        return Ok(());
    };
    let data = endpoint.data;

    let writer = session.writer_mut();
    if let Some(v) = data.max_rx_bitrate {
        writer.add_u64_tlv(TlvId::MDRR, v)?;
    }
    if let Some(v) = data.max_tx_bitrate {
        writer.add_u64_tlv(TlvId::MDRT, v)?;
    }
    if let Some(v) = data.cur_rx_bitrate {
        writer.add_u64_tlv(TlvId::CDRR, v)?;
    }
    if let Some(v) = data.cur_tx_bitrate {
        writer.add_u64_tlv(TlvId::CDRT, v)?;
    }
    if let Some(v) = data.latency {
        writer.add_u64_tlv(TlvId::LATENCY, v)?;
    }
    if let Some(v) = data.resources {
        writer.add_u8_tlv(TlvId::RESOURCES, v)?;
    }
    if let Some(v) = data.rx_link_quality {
        writer.add_u8_tlv(TlvId::RLQR, v)?;
    }
    if let Some(v) = data.tx_link_quality {
        writer.add_u8_tlv(TlvId::RLQT, v)?;
    }
    Ok(())
}

/// Announce one destination: emit DESTINATION_UP and move the local
/// neighbor to UP_SENT with a fresh ack deadline.
fn announce_destination(
    session: &mut DlepSession,
    l2: &Layer2Table,
    mac: MacAddress,
    via: Option<MacAddress>,
) -> Result<()> {
    session.neighbors_mut().add(mac).neigh_addr = via;
    session.generate_signal(l2, SignalId::DESTINATION_UP, Some(&mac))?;
    let deadline = session.now() + session.cfg().ack_timeout();
    if let Some(entry) = session.neighbors_mut().get_mut(&mac) {
        entry.up_sent(deadline);
    }
    Ok(())
}

fn passes_filter(session: &DlepSession, via: Option<&MacAddress>) -> bool {
    if session.is_terminated() || session.restrict() != SignalRestriction::Any {
        // sessions still in handshake announce the whole table afterwards;
        // terminating sessions drop l2 events
        return false;
    }
    match via {
        Some(_) => session.cfg().send_proxied,
        None => session.cfg().send_neighbors,
    }
}

/// Layer-2 bridge: a neighbor or proxied destination appeared.
pub fn l2_neighbor_added(
    session: &mut DlepSession,
    l2: &Layer2Table,
    mac: MacAddress,
    via: Option<MacAddress>,
    now: std::time::Instant,
) -> Result<()> {
    if !passes_filter(session, via.as_ref()) {
        return Ok(());
    }
    session.set_now(now);
    announce_destination(session, l2, mac, via)
}

/// Layer-2 bridge: a neighbor or proxied destination changed.
pub fn l2_neighbor_changed(
    session: &mut DlepSession,
    l2: &Layer2Table,
    mac: MacAddress,
    via: Option<MacAddress>,
    now: std::time::Instant,
) -> Result<()> {
    if !passes_filter(session, via.as_ref()) {
        return Ok(());
    }
    session.set_now(now);

    session.neighbors_mut().add(mac).neigh_addr = via;
    let state = match session.neighbors().get(&mac) {
        Some(entry) => entry.state(),
        None => return Ok(()),
    };
    match state {
        NeighborState::UpSent => {
            // flush once the pending UP is acked
            if let Some(entry) = session.neighbors_mut().get_mut(&mac) {
                entry.set_changed(true);
            }
            Ok(())
        }
        NeighborState::UpAcked => {
            session.generate_signal(l2, SignalId::DESTINATION_UPDATE, Some(&mac))?;
            if let Some(entry) = session.neighbors_mut().get_mut(&mac) {
                entry.set_changed(false);
            }
            Ok(())
        }
        NeighborState::Idle | NeighborState::DownSent | NeighborState::DownAcked => {
            // destination reappeared, announce it again
            announce_destination(session, l2, mac, via)
        }
    }
}

/// Layer-2 bridge: a neighbor or proxied destination went away.
pub fn l2_neighbor_removed(
    session: &mut DlepSession,
    l2: &Layer2Table,
    mac: MacAddress,
    via: Option<MacAddress>,
    now: std::time::Instant,
) -> Result<()> {
    if !passes_filter(session, via.as_ref()) {
        return Ok(());
    }
    session.set_now(now);
    let matches = session
        .neighbors()
        .get(&mac)
        .is_some_and(|entry| entry.neigh_addr == via);
    if !matches {
        return Ok(());
    }

    info!(interface = %session.if_name(), destination = %mac, "destination lost");
    session.generate_signal(l2, SignalId::DESTINATION_DOWN, Some(&mac))?;
    let deadline = session.now() + session.cfg().ack_timeout();
    if let Some(entry) = session.neighbors_mut().get_mut(&mac) {
        entry.down_sent(deadline);
    }
    Ok(())
}

/// Fan one layer-2 table event into the session's destination signals.
pub fn l2_event(
    session: &mut DlepSession,
    l2: &Layer2Table,
    event: &Layer2Event,
    now: std::time::Instant,
) -> Result<()> {
    match event {
        Layer2Event::NeighborAdded(mac) => l2_neighbor_added(session, l2, *mac, None, now),
        Layer2Event::NeighborChanged(mac) => {
            l2_neighbor_changed(session, l2, *mac, None, now)?;
            // metrics of proxied destinations follow their owner
            let proxied: Vec<MacAddress> = l2
                .get(mac)
                .map(|neigh| neigh.destinations.iter().copied().collect())
                .unwrap_or_default();
            for dest in proxied {
                l2_neighbor_changed(session, l2, dest, Some(*mac), now)?;
            }
            Ok(())
        }
        Layer2Event::NeighborRemoved(mac) => l2_neighbor_removed(session, l2, *mac, None, now),
        Layer2Event::DestinationAdded {
            neighbor,
            destination,
        } => l2_neighbor_added(session, l2, *destination, Some(*neighbor), now),
        Layer2Event::DestinationRemoved {
            neighbor,
            destination,
        } => l2_neighbor_removed(session, l2, *destination, Some(*neighbor), now),
    }
}
