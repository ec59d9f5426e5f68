//! The DLEP session: restrict-signal discipline, dispatch, outbound
//! signal generation and the timer families.
//!
//! A session is synchronous and transport-free. The runner feeds it
//! received bytes (`process_buffer` for the TCP stream, `process_datagram`
//! for discovery), drives its deadlines (`next_timeout` / `handle_timers`)
//! and drains two outputs: the writer buffer, flushed to the TCP stream
//! after every call, and the event queue for everything that is not a
//! plain stream write (datagrams, connect requests, termination).

use std::collections::VecDeque;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::error::{Error, Result};
use super::extension::{Extension, ExtensionRegistry};
use super::iana::{self, BASE_PROTO_EXTENSION, SignalId};
use super::neighbor::NeighborTable;
use super::parser::SessionParser;
use super::tlv::{SIGNAL_HDRLEN, SignalHeader};
use super::writer::SignalWriter;
use crate::l2::{Layer2Table, OriginId};
use crate::util::MacAddress;

/// Which side of the protocol this session speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Advertises its wireless neighbors.
    Radio,
    /// Tracks the radio's advertisements.
    Router,
}

/// The set of inbound signal types the session currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRestriction {
    /// Steady state: all signals.
    Any,
    /// Handshake phase: exactly one signal type.
    Only(u16),
}

/// Address family of a discovery datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// No remote heartbeat within twice the announced interval.
    HeartbeatTimeout,
    /// The peer ran the termination handshake.
    PeerTerminated,
    /// The TCP transport went away.
    TransportLost,
    /// A parser or handler error.
    ProtocolError(String),
    /// Local shutdown.
    Shutdown,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::PeerTerminated => write!(f, "peer terminated"),
            Self::TransportLost => write!(f, "transport lost"),
            Self::ProtocolError(msg) => write!(f, "protocol error: {msg}"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Instruction to the runner, queued by session processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Send a datagram on the discovery transport.
    SendDatagram {
        /// Which discovery socket to use.
        family: AddressFamily,
        /// Complete signal bytes.
        payload: Vec<u8>,
    },
    /// Router only: open the TCP session to the offered connection point.
    Connect {
        /// Address to connect to.
        remote: SocketAddr,
    },
    /// The session is gone. `final_bytes` is flushed best-effort before
    /// the transport closes (carries the TERMINATION_ACK when the peer
    /// initiated the shutdown).
    Terminated {
        /// Last bytes to put on the wire, possibly empty.
        final_bytes: Vec<u8>,
    },
}

/// A local TCP connection point advertised in PEER_OFFER signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPoint {
    /// Local address of the listening socket.
    pub addr: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Endpoint expects TLS (never set by this implementation).
    pub tls: bool,
}

/// One DLEP session, radio or router, TCP or discovery phase.
pub struct DlepSession {
    cfg: SessionConfig,
    role: Role,
    restrict: SignalRestriction,
    next_restrict: Option<SignalRestriction>,
    registry: Arc<ExtensionRegistry>,
    /// Ids of the currently active extensions, always containing the
    /// base protocol.
    active_extensions: Vec<u16>,
    parser: SessionParser,
    writer: SignalWriter,
    neighbors: NeighborTable,
    l2_origin: OriginId,
    if_name: String,
    /// Connection points offered to routers (radio discovery sessions).
    local_conpoints: Vec<ConnectionPoint>,
    /// Source of the most recent datagram, or the TCP peer.
    remote_addr: Option<SocketAddr>,
    remote_heartbeat_interval: Duration,
    /// Local heartbeat emission, or discovery emission while a router
    /// session is in the discovery phase.
    local_event_deadline: Option<Instant>,
    /// Remote heartbeat liveness watchdog.
    remote_watchdog_deadline: Option<Instant>,
    now: Instant,
    events: VecDeque<SessionEvent>,
    terminated: Option<TerminationReason>,
}

impl DlepSession {
    /// Create a session. `restrict` selects the phase the session starts
    /// in: `PEER_INITIALIZATION` for an accepted radio TCP connection,
    /// `PEER_INITIALIZATION_ACK` for a router TCP connection,
    /// `PEER_DISCOVERY` / `PEER_OFFER` for the discovery sessions.
    ///
    /// All extensions registered for the role start active; the set is
    /// narrowed once EXTENSIONS_SUPPORTED is negotiated.
    pub fn new(
        cfg: SessionConfig,
        role: Role,
        registry: Arc<ExtensionRegistry>,
        l2_origin: OriginId,
        if_name: impl Into<String>,
        restrict: SignalRestriction,
        now: Instant,
    ) -> Result<Self> {
        let active_extensions: Vec<u16> =
            registry.for_role(role).iter().map(|ext| ext.id()).collect();
        let remote_heartbeat_interval = cfg.heartbeat_interval;

        let mut session = Self {
            cfg,
            role,
            restrict,
            next_restrict: None,
            registry,
            active_extensions,
            parser: SessionParser::new(),
            writer: SignalWriter::new(),
            neighbors: NeighborTable::new(),
            l2_origin,
            if_name: if_name.into(),
            local_conpoints: Vec::new(),
            remote_addr: None,
            remote_heartbeat_interval,
            local_event_deadline: None,
            remote_watchdog_deadline: None,
            now,
            events: VecDeque::new(),
            terminated: None,
        };
        session.rebuild_allowed_tlvs()?;
        Ok(session)
    }

    /// Run the active extensions' init hooks. Separate from [`new`](Self::new)
    /// because the hooks may already generate signals (a router session
    /// opens with PEER_INITIALIZATION).
    pub fn initialize(&mut self, l2: &Layer2Table) -> Result<()> {
        for ext in self.active_extension_objects() {
            ext.session_init(self, l2)?;
        }
        Ok(())
    }

    // Accessors used by extension handlers.

    /// Session configuration.
    pub fn cfg(&self) -> &SessionConfig {
        &self.cfg
    }

    /// Radio or router.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Currently accepted inbound signal set.
    pub fn restrict(&self) -> SignalRestriction {
        self.restrict
    }

    /// Install a new restriction once the current signal finishes
    /// processing.
    pub fn set_next_restrict(&mut self, restrict: SignalRestriction) {
        self.next_restrict = Some(restrict);
    }

    /// Parser state of the signal being processed.
    pub fn parser(&self) -> &SessionParser {
        &self.parser
    }

    /// Writer for the in-progress outbound signal.
    pub fn writer_mut(&mut self) -> &mut SignalWriter {
        &mut self.writer
    }

    /// Destination table.
    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// Destination table, mutable.
    pub fn neighbors_mut(&mut self) -> &mut NeighborTable {
        &mut self.neighbors
    }

    /// Origin tag for layer-2 entries owned by this session.
    pub fn l2_origin(&self) -> OriginId {
        self.l2_origin
    }

    /// Interface this session runs on.
    pub fn if_name(&self) -> &str {
        &self.if_name
    }

    /// Monotonic time of the call currently being processed.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Record the time of an externally driven entry point (layer-2
    /// bridge calls).
    pub(crate) fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    /// Heartbeat interval announced by the peer.
    pub fn remote_heartbeat_interval(&self) -> Duration {
        self.remote_heartbeat_interval
    }

    /// Record the peer's heartbeat interval.
    pub fn set_remote_heartbeat_interval(&mut self, interval: Duration) {
        self.remote_heartbeat_interval = interval;
    }

    /// Connection points advertised in PEER_OFFER.
    pub fn local_conpoints(&self) -> &[ConnectionPoint] {
        &self.local_conpoints
    }

    /// Configure the connection points a radio offers.
    pub fn set_local_conpoints(&mut self, conpoints: Vec<ConnectionPoint>) {
        self.local_conpoints = conpoints;
    }

    /// Peer address: TCP remote, or source of the datagram being
    /// processed.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Record the peer address.
    pub fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    /// Extension ids to advertise in EXTENSIONS_SUPPORTED.
    pub fn negotiable_extension_ids(&self) -> Vec<u16> {
        self.registry.negotiable_ids(self.role)
    }

    /// Queue an instruction for the runner.
    pub fn push_event(&mut self, event: SessionEvent) {
        self.events.push_back(event);
    }

    /// Drain queued runner instructions.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Bytes queued for the TCP stream.
    pub fn has_output(&self) -> bool {
        !self.writer.is_empty()
    }

    /// Drain the bytes queued for the TCP stream.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.writer.take()
    }

    /// Termination state, if the session has ended.
    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.terminated.as_ref()
    }

    /// True once the session has ended.
    pub fn is_terminated(&self) -> bool {
        self.terminated.is_some()
    }

    // Timer discipline.

    /// Arm periodic local heartbeat emission.
    pub fn start_local_heartbeat(&mut self) {
        self.local_event_deadline = Some(self.now + self.cfg.heartbeat_interval);
    }

    /// Arm periodic discovery emission (router discovery phase).
    pub fn start_discovery(&mut self) {
        self.local_event_deadline = Some(self.now + self.cfg.discovery_interval);
    }

    /// (Re)arm the remote heartbeat watchdog at twice the remote
    /// interval.
    pub fn arm_remote_watchdog(&mut self) {
        self.remote_watchdog_deadline = Some(self.now + self.remote_heartbeat_interval * 2);
    }

    /// Earliest pending deadline of any timer family.
    pub fn next_timeout(&self) -> Option<Instant> {
        [
            self.local_event_deadline,
            self.remote_watchdog_deadline,
            self.neighbors.next_ack_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire every deadline that has expired at `now`.
    pub fn handle_timers(&mut self, l2: &mut Layer2Table, now: Instant) -> Result<()> {
        self.now = now;
        if self.terminated.is_some() {
            return Ok(());
        }

        if self.remote_watchdog_deadline.is_some_and(|d| d <= now) {
            self.terminate(l2, TerminationReason::HeartbeatTimeout);
            return Ok(());
        }

        if self.local_event_deadline.is_some_and(|d| d <= now) {
            if self.in_discovery_phase() {
                self.emit_discovery(l2)?;
                self.local_event_deadline = Some(now + self.cfg.discovery_interval);
            } else {
                self.generate_signal(l2, SignalId::HEARTBEAT, None)?;
                self.local_event_deadline = Some(now + self.cfg.heartbeat_interval);
            }
        }

        for mac in self.neighbors.expired(now) {
            info!(
                interface = %self.if_name,
                destination = %mac,
                "destination ack timeout, removing"
            );
            self.neighbors.remove(&mac);
        }
        Ok(())
    }

    fn in_discovery_phase(&self) -> bool {
        self.role == Role::Router && self.restrict == SignalRestriction::Only(SignalId::PEER_OFFER)
    }

    /// Emit one PEER_DISCOVERY datagram per address family.
    fn emit_discovery(&mut self, l2: &Layer2Table) -> Result<()> {
        debug!(interface = %self.if_name, "generate peer discovery");
        self.generate_signal(l2, SignalId::PEER_DISCOVERY, None)?;
        let payload = self.writer.take();
        self.events.push_back(SessionEvent::SendDatagram {
            family: AddressFamily::V4,
            payload: payload.clone(),
        });
        self.events.push_back(SessionEvent::SendDatagram {
            family: AddressFamily::V6,
            payload,
        });
        Ok(())
    }

    // Inbound processing.

    /// Consume as many complete signals from `buffer` as possible and
    /// return the number of bytes consumed. The caller keeps the
    /// unconsumed suffix for the next call.
    ///
    /// Any error has already terminated the session when this returns.
    pub fn process_buffer(
        &mut self,
        l2: &mut Layer2Table,
        buffer: &[u8],
        now: Instant,
    ) -> Result<usize> {
        self.now = now;
        let mut consumed = 0;

        while self.terminated.is_none() {
            let rest = &buffer[consumed..];
            if rest.len() < SIGNAL_HDRLEN {
                break;
            }
            let header = SignalHeader::from_bytes(rest)?;
            let total = SIGNAL_HDRLEN + header.signal_length.get() as usize;
            if rest.len() < total {
                break;
            }
            let signal_type = header.signal_type.get();
            self.process_signal(l2, signal_type, &rest[SIGNAL_HDRLEN..total])?;
            consumed += total;
        }
        Ok(consumed)
    }

    /// Process one discovery datagram from `src`.
    ///
    /// Unlike the TCP stream, malformed or out-of-phase datagrams are
    /// dropped with a log entry instead of ending the discovery session;
    /// anything can send to the multicast group. A reply generated by
    /// the handler (PEER_OFFER) is queued as a datagram to `src`.
    pub fn process_datagram(
        &mut self,
        l2: &mut Layer2Table,
        datagram: &[u8],
        src: SocketAddr,
        now: Instant,
    ) -> Result<()> {
        self.now = now;
        self.remote_addr = Some(src);

        if datagram.len() < SIGNAL_HDRLEN {
            warn!(interface = %self.if_name, %src, "runt discovery datagram");
            return Ok(());
        }
        let header = SignalHeader::from_bytes(datagram)?;
        let signal_type = header.signal_type.get();
        let total = SIGNAL_HDRLEN + header.signal_length.get() as usize;
        if datagram.len() < total {
            warn!(interface = %self.if_name, %src, "truncated discovery datagram");
            return Ok(());
        }

        if let SignalRestriction::Only(expected) = self.restrict {
            if signal_type != expected {
                debug!(
                    interface = %self.if_name,
                    signal = iana::signal_name(signal_type),
                    "ignoring datagram outside discovery phase"
                );
                return Ok(());
            }
        }

        if let Err(err) = self.parse_and_dispatch(l2, signal_type, &datagram[SIGNAL_HDRLEN..total])
        {
            warn!(interface = %self.if_name, %src, %err, "dropping bad discovery datagram");
            self.writer.clear();
            return Ok(());
        }
        self.apply_next_restrict();

        if !self.writer.is_empty() {
            let family = match src {
                SocketAddr::V4(_) => AddressFamily::V4,
                SocketAddr::V6(_) => AddressFamily::V6,
            };
            let payload = self.writer.take();
            self.events
                .push_back(SessionEvent::SendDatagram { family, payload });
        }
        Ok(())
    }

    /// Validate, parse and dispatch one signal from the TCP stream.
    fn process_signal(&mut self, l2: &mut Layer2Table, signal_type: u16, tlvs: &[u8]) -> Result<()> {
        if let SignalRestriction::Only(expected) = self.restrict {
            if signal_type != expected {
                let err = Error::InternalError(format!(
                    "got signal {} while restricted to {}",
                    iana::signal_name(signal_type),
                    iana::signal_name(expected),
                ));
                self.terminate(l2, TerminationReason::ProtocolError(err.to_string()));
                return Err(err);
            }
        }

        debug!(
            interface = %self.if_name,
            signal = iana::signal_name(signal_type),
            len = tlvs.len(),
            "process signal"
        );

        if let Err(err) = self.parse_and_dispatch(l2, signal_type, tlvs) {
            if self.terminated.is_none() {
                self.terminate(l2, TerminationReason::ProtocolError(err.to_string()));
            }
            return Err(err);
        }
        self.apply_next_restrict();
        Ok(())
    }

    fn parse_and_dispatch(
        &mut self,
        l2: &mut Layer2Table,
        signal_type: u16,
        tlvs: &[u8],
    ) -> Result<()> {
        self.parser.parse_signal(signal_type, tlvs)?;
        for ext in self.active_extension_objects() {
            ext.process_signal(self, l2, signal_type)?;
            if self.terminated.is_some() {
                break;
            }
        }
        Ok(())
    }

    fn apply_next_restrict(&mut self) {
        if let Some(next) = self.next_restrict.take() {
            self.restrict = next;
        }
    }

    // Outbound generation.

    /// Generate one signal: every active extension contributes its TLVs.
    /// On failure the in-progress signal is removed from the buffer.
    pub fn generate_signal(
        &mut self,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
    ) -> Result<()> {
        self.generate(l2, signal, mac, None)
    }

    /// Generate a signal with an explicit trailing status TLV.
    pub fn generate_signal_status(
        &mut self,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
        status: u8,
        text: &str,
    ) -> Result<()> {
        self.generate(l2, signal, mac, Some((status, text)))
    }

    fn generate(
        &mut self,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
        status: Option<(u8, &str)>,
    ) -> Result<()> {
        debug!(
            interface = %self.if_name,
            signal = iana::signal_name(signal),
            "generate signal"
        );
        let pre_len = self.writer.len();
        let result = self.write_signal(l2, signal, mac, status);
        if result.is_err() {
            self.writer.abort_signal();
            self.writer.truncate(pre_len);
        }
        result
    }

    fn write_signal(
        &mut self,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
        status: Option<(u8, &str)>,
    ) -> Result<()> {
        self.writer.start_signal(signal)?;
        for ext in self.active_extension_objects() {
            ext.write_signal(self, l2, signal, mac)?;
        }
        if let Some((code, text)) = status {
            self.writer.add_status_tlv(code, text)?;
        }
        self.writer.finish_signal()
    }

    // Extension management.

    fn active_extension_objects(&self) -> Vec<Arc<dyn Extension>> {
        self.registry
            .for_role(self.role)
            .iter()
            .filter(|ext| self.active_extensions.contains(&ext.id()))
            .cloned()
            .collect()
    }

    /// Ids of the currently active extensions.
    pub fn active_extensions(&self) -> &[u16] {
        &self.active_extensions
    }

    /// Narrow the active extension set to the peer-announced ids
    /// (intersected with what is registered locally; unknown ids are
    /// ignored) and rebuild the allowed-TLV map. The base protocol is
    /// always retained.
    pub fn update_extensions(&mut self, announced: &[u16]) -> Result<()> {
        let mut active = Vec::new();
        for ext in self.registry.for_role(self.role) {
            let id = ext.id();
            if id == BASE_PROTO_EXTENSION || announced.contains(&id) {
                active.push(id);
            }
        }
        debug!(interface = %self.if_name, ?active, "negotiated extensions");
        self.active_extensions = active;
        self.rebuild_allowed_tlvs()
    }

    fn rebuild_allowed_tlvs(&mut self) -> Result<()> {
        let registry = Arc::clone(&self.registry);
        let extensions: Vec<&dyn Extension> = registry
            .for_role(self.role)
            .iter()
            .filter(|ext| self.active_extensions.contains(&ext.id()))
            .map(|ext| ext.as_ref())
            .collect();
        self.parser.update_allowed_tlvs(&extensions)
    }

    // Termination.

    /// Start an orderly shutdown: send PEER_TERMINATION and accept
    /// nothing but the ack. Only meaningful in steady state; the session
    /// is torn down when PEER_TERMINATION_ACK arrives (or the watchdog
    /// fires first).
    pub fn request_termination(&mut self, l2: &Layer2Table) -> Result<()> {
        if self.restrict != SignalRestriction::Any {
            return Ok(());
        }
        self.generate_signal(l2, SignalId::PEER_TERMINATION, None)?;
        self.restrict = SignalRestriction::Only(SignalId::PEER_TERMINATION_ACK);
        Ok(())
    }

    /// End the session: run cleanup hooks, cancel every timer, drop all
    /// local neighbors without emitting further signals, and hand the
    /// runner whatever bytes were already generated (the termination ack
    /// travels this way, best-effort).
    pub fn terminate(&mut self, l2: &mut Layer2Table, reason: TerminationReason) {
        if self.terminated.is_some() {
            return;
        }
        info!(interface = %self.if_name, %reason, "session terminated");
        self.terminated = Some(reason);

        for ext in self.active_extension_objects() {
            ext.session_cleanup(self, l2);
        }

        self.local_event_deadline = None;
        self.remote_watchdog_deadline = None;
        self.neighbors.clear();

        let final_bytes = self.writer.take();
        self.events
            .push_back(SessionEvent::Terminated { final_bytes });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio_session() -> (DlepSession, Layer2Table) {
        let registry = Arc::new(ExtensionRegistry::new());
        let session = DlepSession::new(
            SessionConfig::default(),
            Role::Radio,
            registry,
            1,
            "wlan0",
            SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
            Instant::now(),
        )
        .unwrap();
        (session, Layer2Table::new("wlan0"))
    }

    #[test]
    fn test_restrict_violation_terminates() {
        let (mut session, mut l2) = radio_session();
        session.initialize(&l2).unwrap();

        // heartbeat while restricted to PEER_INITIALIZATION
        let wire = [0x00, 0x0e, 0x00, 0x00];
        let err = session
            .process_buffer(&mut l2, &wire, Instant::now())
            .unwrap_err();
        assert!(matches!(err, Error::InternalError(_)));
        assert!(session.is_terminated());
        assert!(matches!(
            session.termination_reason(),
            Some(TerminationReason::ProtocolError(_))
        ));
    }

    #[test]
    fn test_partial_signal_left_in_buffer() {
        let (mut session, mut l2) = radio_session();

        // complete heartbeat would be 4 bytes; feed 3
        let consumed = session
            .process_buffer(&mut l2, &[0x00, 0x0e, 0x00], Instant::now())
            .unwrap();
        assert_eq!(consumed, 0);

        // header complete but declared length exceeds available bytes
        let consumed = session
            .process_buffer(&mut l2, &[0x00, 0x0e, 0x00, 0x08, 0x01], Instant::now())
            .unwrap();
        assert_eq!(consumed, 0);
        assert!(!session.is_terminated());
    }

    #[test]
    fn test_heartbeat_timeout() {
        let (mut session, mut l2) = radio_session();
        session.initialize(&l2).unwrap();

        // radio init arms the watchdog at 2x the provisional interval
        let deadline = session.next_timeout().unwrap();

        session
            .handle_timers(&mut l2, deadline + Duration::from_millis(1))
            .unwrap();
        assert!(session.is_terminated());
        assert_eq!(
            session.termination_reason(),
            Some(&TerminationReason::HeartbeatTimeout)
        );
        // no termination handshake was attempted
        let events = session.take_events();
        assert_eq!(
            events,
            vec![SessionEvent::Terminated {
                final_bytes: Vec::new()
            }]
        );
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let (mut session, mut l2) = radio_session();
        session.terminate(&mut l2, TerminationReason::Shutdown);
        session.terminate(&mut l2, TerminationReason::TransportLost);
        assert_eq!(
            session.termination_reason(),
            Some(&TerminationReason::Shutdown)
        );
        assert_eq!(session.take_events().len(), 1);
    }

    #[test]
    fn test_update_extensions_ignores_unknown() {
        let (mut session, _) = radio_session();
        session.update_extensions(&[42, 99]).unwrap();
        // nothing but the base protocol is registered
        assert_eq!(session.active_extensions(), &[BASE_PROTO_EXTENSION]);
    }
}
