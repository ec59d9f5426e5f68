//! Router role of the base protocol: discover radios, open the session,
//! project destination signals into the layer-2 table.

use std::net::{IpAddr, SocketAddr};

use tracing::{debug, info, warn};

use super::super::error::{Error, Result};
use super::super::extension::{Extension, TlvDecl};
use super::super::iana::{BASE_PROTO_EXTENSION, DLEP_PORT, SignalId, StatusCode};
use super::super::reader;
use super::super::session::{DlepSession, SessionEvent, SignalRestriction};
use crate::l2::Layer2Table;
use crate::util::MacAddress;

/// Base protocol handlers for router sessions.
#[derive(Debug, Default)]
pub struct BaseProtoRouter;

impl BaseProtoRouter {
    /// Create the extension instance.
    pub fn new() -> Self {
        Self
    }

    /// Pick the connection point to dial: first link-local IPv6, else
    /// first IPv6, else first IPv4, TLS entries skipped; fall back to
    /// the radio's own address when the offer carries nothing usable.
    fn process_peer_offer(&self, session: &mut DlepSession) -> Result<()> {
        if session.restrict() != SignalRestriction::Only(SignalId::PEER_OFFER) {
            // ignore unless we are in discovery mode
            return Ok(());
        }
        super::log_peer_type(session);

        let parser = session.parser();
        let mut v6_link_local: Option<SocketAddr> = None;
        let mut v6_any: Option<SocketAddr> = None;
        let mut v4_any: Option<SocketAddr> = None;

        let mut value = parser.get_first_value(super::super::iana::TlvId::IPV6_CONPOINT);
        while let Some(v) = value {
            let (addr, port, tls) = reader::ipv6_conpoint(parser, v)?;
            if !tls {
                let candidate = SocketAddr::new(IpAddr::V6(addr), port);
                if addr.segments()[0] & 0xffc0 == 0xfe80 {
                    v6_link_local.get_or_insert(candidate);
                } else {
                    v6_any.get_or_insert(candidate);
                }
            }
            value = parser.get_next_value(v);
        }

        let mut value = parser.get_first_value(super::super::iana::TlvId::IPV4_CONPOINT);
        while let Some(v) = value {
            let (addr, port, tls) = reader::ipv4_conpoint(parser, v)?;
            if !tls {
                v4_any.get_or_insert(SocketAddr::new(IpAddr::V4(addr), port));
            }
            value = parser.get_next_value(v);
        }

        let remote = v6_link_local
            .or(v6_any)
            .or(v4_any)
            .or_else(|| {
                // no usable connection point: dial the sender itself
                session
                    .remote_addr()
                    .map(|src| SocketAddr::new(src.ip(), DLEP_PORT))
            })
            .ok_or_else(|| Error::InternalError("peer offer without usable address".into()))?;

        info!(interface = %session.if_name(), %remote, "peer offer accepted");
        session.push_event(SessionEvent::Connect { remote });
        Ok(())
    }

    fn process_peer_init_ack(&self, session: &mut DlepSession, l2: &mut Layer2Table) -> Result<()> {
        if session.restrict() != SignalRestriction::Only(SignalId::PEER_INITIALIZATION_ACK) {
            // ignore unless we are in initialization mode
            return Ok(());
        }

        let interval = reader::heartbeat_interval(session.parser())?;
        session.set_remote_heartbeat_interval(interval);

        let announced = reader::extension_ids(session.parser())?;
        session.update_extensions(&announced)?;

        // session-wide metrics become the interface defaults
        let mut data = *l2.net_data();
        reader::map_l2_data(session.parser(), &mut data)?;
        *l2.net_data_mut() = data;

        debug!(
            interface = %session.if_name(),
            remote_heartbeat_ms = interval.as_millis(),
            "session initialized"
        );

        session.start_local_heartbeat();
        session.arm_remote_watchdog();
        super::log_status(session)?;

        session.set_next_restrict(SignalRestriction::Any);
        Ok(())
    }

    fn process_peer_update(&self, session: &mut DlepSession, l2: &mut Layer2Table) -> Result<()> {
        let mut data = *l2.net_data();
        reader::map_l2_data(session.parser(), &mut data)?;
        *l2.net_data_mut() = data;

        // no IP address exchange at the moment
        session.generate_signal(l2, SignalId::PEER_UPDATE_ACK, None)
    }

    fn process_destination_up(&self, session: &mut DlepSession, l2: &mut Layer2Table) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;

        if l2.add_neighbor(mac, session.l2_origin()).is_none() {
            warn!(interface = %session.if_name(), destination = %mac, "l2 table full");
            return session.generate_signal_status(
                l2,
                SignalId::DESTINATION_UP_ACK,
                Some(&mac),
                StatusCode::REQUEST_DENIED,
                "Not enough memory",
            );
        }

        let mut data = l2.get(&mac).map(|n| n.data).unwrap_or_default();
        reader::map_l2_data(session.parser(), &mut data)?;
        if let Some(entry) = l2.add_neighbor(mac, session.l2_origin()) {
            entry.data = data;
        }

        session.generate_signal(l2, SignalId::DESTINATION_UP_ACK, Some(&mac))
    }

    fn process_destination_down(
        &self,
        session: &mut DlepSession,
        l2: &mut Layer2Table,
    ) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        if l2.get(&mac).is_none() {
            // we never saw the destination up signal
            return Ok(());
        }
        l2.remove_neighbor(&mac, session.l2_origin());
        session.generate_signal(l2, SignalId::DESTINATION_DOWN_ACK, Some(&mac))
    }

    fn process_destination_update(
        &self,
        session: &mut DlepSession,
        l2: &mut Layer2Table,
    ) -> Result<()> {
        let mac = reader::mac_address(session.parser())?;
        let Some(entry) = l2.get(&mac) else {
            // we never saw the destination up signal
            return Ok(());
        };
        let mut data = entry.data;
        reader::map_l2_data(session.parser(), &mut data)?;
        if let Some(entry) = l2.add_neighbor(mac, session.l2_origin()) {
            entry.data = data;
        }
        l2.notify_changed(mac);
        Ok(())
    }

    fn write_peer_init(&self, session: &mut DlepSession) -> Result<()> {
        let heartbeat = session.cfg().heartbeat_interval;
        let ids = session.negotiable_extension_ids();
        let peer_type = session.cfg().peer_type.clone();

        let writer = session.writer_mut();
        if !ids.is_empty() {
            writer.add_supported_extensions(&ids)?;
        }
        writer.add_heartbeat_tlv(heartbeat)?;
        if !peer_type.is_empty() {
            writer.add_peer_type_tlv(&peer_type)?;
        }
        Ok(())
    }

    fn write_mac(&self, session: &mut DlepSession, signal: u16, mac: Option<&MacAddress>) -> Result<()> {
        let mac = *mac.ok_or_else(|| {
            Error::InternalError(format!("signal {signal} generated without destination"))
        })?;
        session.writer_mut().add_mac_tlv(&mac)
    }
}

impl Extension for BaseProtoRouter {
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
            SignalId::PEER_OFFER => self.process_peer_offer(session),
            SignalId::PEER_INITIALIZATION_ACK => self.process_peer_init_ack(session, l2),
            SignalId::PEER_UPDATE => self.process_peer_update(session, l2),
            SignalId::PEER_UPDATE_ACK => super::log_status(session).map(|_| ()),
            SignalId::PEER_TERMINATION => super::process_peer_termination(session, l2),
            SignalId::PEER_TERMINATION_ACK => super::process_peer_termination_ack(session, l2),
            SignalId::DESTINATION_UP => self.process_destination_up(session, l2),
            SignalId::DESTINATION_UP_ACK => super::log_status(session).map(|_| ()),
            SignalId::DESTINATION_DOWN => self.process_destination_down(session, l2),
            SignalId::DESTINATION_DOWN_ACK => super::log_status(session).map(|_| ()),
            SignalId::DESTINATION_UPDATE => self.process_destination_update(session, l2),
            SignalId::HEARTBEAT => super::process_heartbeat(session),
            SignalId::LINK_CHARACTERISTICS_ACK => super::log_status(session).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn write_signal(
        &self,
        session: &mut DlepSession,
        _l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
    ) -> Result<()> {
        match signal {
            SignalId::PEER_DISCOVERY => {
                if session.restrict() != SignalRestriction::Only(SignalId::PEER_OFFER) {
                    return Err(Error::InternalError(
                        "peer discovery generated outside discovery phase".into(),
                    ));
                }
                Ok(())
            }
            SignalId::PEER_INITIALIZATION => self.write_peer_init(session),
            SignalId::DESTINATION_UP_ACK | SignalId::DESTINATION_DOWN_ACK => {
                self.write_mac(session, signal, mac)
            }
            _ => Ok(()),
        }
    }

    fn session_init(&self, session: &mut DlepSession, l2: &Layer2Table) -> Result<()> {
        match session.restrict() {
            SignalRestriction::Only(SignalId::PEER_INITIALIZATION_ACK) => {
                // waiting for a Peer Init Ack, so we need to send a Peer Init
                session.generate_signal(l2, SignalId::PEER_INITIALIZATION, None)?;
                session.arm_remote_watchdog();
            }
            SignalRestriction::Only(SignalId::PEER_OFFER) => {
                debug!(
                    interface = %session.if_name(),
                    interval_ms = session.cfg().discovery_interval.as_millis(),
                    "activate discovery"
                );
                session.start_discovery();
            }
            _ => {}
        }
        Ok(())
    }

    fn session_cleanup(&self, session: &mut DlepSession, l2: &mut Layer2Table) {
        // withdraw everything this session projected into the l2 table
        l2.remove_origin(session.l2_origin());
    }
}
