//! Radio-side runner: owns the TCP listener and the UDP discovery
//! socket, and drives radio sessions against the local layer-2 table.
//!
//! The engine itself is transport-free; this module is the glue between
//! tokio sockets, timers, layer-2 change feeds and
//! [`DlepSession`](crate::session::DlepSession).

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::l2::{Layer2Data, Layer2Table, ORIGIN_EXTERNAL, OriginId};
use crate::session::base_proto;
use crate::session::iana::{DLEP_MULTICAST_V4, DLEP_MULTICAST_V6, SignalId};
use crate::session::{
    ConnectionPoint, DlepSession, ExtensionRegistry, Result, Role, SessionConfig, SessionEvent,
    SignalRestriction, TerminationReason,
};
use crate::util::MacAddress;

/// Read buffer growth quantum for the TCP stream.
const READ_CHUNK: usize = 4096;

/// Mutations the embedding application applies to the radio's layer-2
/// table. Produced through [`Layer2Handle`], consumed by
/// [`RadioInterface::run`].
#[derive(Debug)]
enum L2Command {
    AddNeighbor(MacAddress),
    SetMetrics(MacAddress, Layer2Data),
    RemoveNeighbor(MacAddress),
    AddDestination {
        neighbor: MacAddress,
        destination: MacAddress,
    },
    RemoveDestination {
        neighbor: MacAddress,
        destination: MacAddress,
    },
}

/// Cloneable feeder for the radio's layer-2 table.
///
/// Whatever tracks the real wireless links pushes its view through this
/// handle; the runner folds the changes into destination signals.
#[derive(Debug, Clone)]
pub struct Layer2Handle {
    tx: mpsc::UnboundedSender<L2Command>,
}

impl Layer2Handle {
    /// A direct neighbor appeared.
    pub fn add_neighbor(&self, mac: MacAddress) {
        let _ = self.tx.send(L2Command::AddNeighbor(mac));
    }

    /// Replace a neighbor's metrics.
    pub fn set_metrics(&self, mac: MacAddress, data: Layer2Data) {
        let _ = self.tx.send(L2Command::SetMetrics(mac, data));
    }

    /// A direct neighbor went away.
    pub fn remove_neighbor(&self, mac: MacAddress) {
        let _ = self.tx.send(L2Command::RemoveNeighbor(mac));
    }

    /// A proxied destination appeared behind a neighbor.
    pub fn add_destination(&self, neighbor: MacAddress, destination: MacAddress) {
        let _ = self.tx.send(L2Command::AddDestination {
            neighbor,
            destination,
        });
    }

    /// A proxied destination went away.
    pub fn remove_destination(&self, neighbor: MacAddress, destination: MacAddress) {
        let _ = self.tx.send(L2Command::RemoveDestination {
            neighbor,
            destination,
        });
    }
}

struct ActiveSession {
    stream: TcpStream,
    session: DlepSession,
    inbuf: BytesMut,
}

/// One radio interface: TCP listener, discovery responder, at most one
/// router session at a time.
pub struct RadioInterface {
    if_name: String,
    cfg: SessionConfig,
    registry: Arc<ExtensionRegistry>,
    listener: TcpListener,
    udp_v4: UdpSocket,
    udp_v6: Option<UdpSocket>,
    discovery: DlepSession,
    l2: Layer2Table,
    active: Option<ActiveSession>,
    next_origin: OriginId,
    l2_tx: mpsc::UnboundedSender<L2Command>,
    l2_rx: mpsc::UnboundedReceiver<L2Command>,
}

impl RadioInterface {
    /// Bind the radio's sockets on `port`: a TCP listener for sessions
    /// and a UDP socket joined to the discovery multicast groups.
    pub async fn bind(if_name: impl Into<String>, cfg: SessionConfig, port: u16) -> Result<Self> {
        let if_name = if_name.into();
        cfg.validate()
            .map_err(crate::session::Error::InternalError)?;

        let listener = TcpListener::bind(("::", port))
            .await
            .map_err(io_internal)?;

        let udp_v4 = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(io_internal)?;
        udp_v4
            .join_multicast_v4(DLEP_MULTICAST_V4, Ipv4Addr::UNSPECIFIED)
            .map_err(io_internal)?;

        let udp_v6 = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, port)).await {
            Ok(socket) => {
                if let Err(err) = socket.join_multicast_v6(&DLEP_MULTICAST_V6, 0) {
                    warn!(%err, "no IPv6 discovery, multicast join failed");
                    None
                } else {
                    Some(socket)
                }
            }
            Err(err) => {
                warn!(%err, "no IPv6 discovery, bind failed");
                None
            }
        };

        let registry = Arc::new(ExtensionRegistry::new());
        let mut discovery = DlepSession::new(
            cfg.clone(),
            Role::Radio,
            Arc::clone(&registry),
            ORIGIN_EXTERNAL,
            if_name.clone(),
            SignalRestriction::Only(SignalId::PEER_DISCOVERY),
            Instant::now(),
        )?;
        if let Ok(local) = listener.local_addr() {
            if !local.ip().is_unspecified() {
                discovery.set_local_conpoints(vec![ConnectionPoint {
                    addr: local.ip(),
                    port,
                    tls: false,
                }]);
            }
        }

        let (l2_tx, l2_rx) = mpsc::unbounded_channel();
        let l2 = Layer2Table::new(if_name.clone());

        Ok(Self {
            if_name,
            cfg,
            registry,
            listener,
            udp_v4,
            udp_v6,
            discovery,
            l2,
            active: None,
            next_origin: 1,
            l2_tx,
            l2_rx,
        })
    }

    /// Feeder handle for the layer-2 table.
    pub fn l2_handle(&self) -> Layer2Handle {
        Layer2Handle {
            tx: self.l2_tx.clone(),
        }
    }

    /// Addresses advertised in PEER_OFFER signals. Needed when the
    /// listener is bound to the unspecified address.
    pub fn set_connection_points(&mut self, conpoints: Vec<ConnectionPoint>) {
        self.discovery.set_local_conpoints(conpoints);
    }

    /// Drive the interface forever.
    pub async fn run(&mut self) -> Result<()> {
        let mut dgram = [0u8; 1500];
        let mut dgram6 = [0u8; 1500];
        loop {
            let deadline = self
                .active
                .as_ref()
                .and_then(|a| a.session.next_timeout());

            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.map_err(io_internal)?;
                    self.accept_session(stream, peer)?;
                }
                received = self.udp_v4.recv_from(&mut dgram) => {
                    let (len, src) = received.map_err(io_internal)?;
                    self.handle_datagram(&dgram[..len], src).await?;
                }
                received = recv_opt(&self.udp_v6, &mut dgram6) => {
                    let (len, src) = received.map_err(io_internal)?;
                    self.handle_datagram(&dgram6[..len], src).await?;
                }
                command = self.l2_rx.recv() => {
                    if let Some(command) = command {
                        self.apply_l2_command(command).await?;
                    }
                }
                read = read_opt(&mut self.active) => {
                    self.handle_tcp_read(read).await?;
                }
                _ = wait_deadline(deadline) => {
                    self.fire_timers().await?;
                }
            }
        }
    }

    fn accept_session(&mut self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        if self.active.is_some() {
            warn!(interface = %self.if_name, %peer, "session already active, rejecting");
            return Ok(());
        }
        info!(interface = %self.if_name, %peer, "router connected");

        let origin = self.next_origin;
        self.next_origin += 1;

        let mut session = DlepSession::new(
            self.cfg.clone(),
            Role::Radio,
            Arc::clone(&self.registry),
            origin,
            self.if_name.clone(),
            SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
            Instant::now(),
        )?;
        session.set_remote_addr(peer);
        session.initialize(&self.l2)?;

        self.active = Some(ActiveSession {
            stream,
            session,
            inbuf: BytesMut::with_capacity(READ_CHUNK),
        });
        Ok(())
    }

    async fn handle_datagram(&mut self, datagram: &[u8], src: SocketAddr) -> Result<()> {
        self.discovery
            .process_datagram(&mut self.l2, datagram, src, Instant::now())?;
        for event in self.discovery.take_events() {
            if let SessionEvent::SendDatagram { payload, .. } = event {
                debug!(interface = %self.if_name, %src, "send peer offer");
                let socket = match src {
                    SocketAddr::V4(_) => &self.udp_v4,
                    SocketAddr::V6(_) => match &self.udp_v6 {
                        Some(socket) => socket,
                        None => continue,
                    },
                };
                if let Err(err) = socket.send_to(&payload, src).await {
                    warn!(interface = %self.if_name, %err, "offer send failed");
                }
            }
        }
        Ok(())
    }

    async fn apply_l2_command(&mut self, command: L2Command) -> Result<()> {
        match command {
            L2Command::AddNeighbor(mac) => {
                let _ = self.l2.add_neighbor(mac, ORIGIN_EXTERNAL);
            }
            L2Command::SetMetrics(mac, data) => {
                if let Some(entry) = self.l2.add_neighbor(mac, ORIGIN_EXTERNAL) {
                    entry.data = data;
                }
                self.l2.notify_changed(mac);
            }
            L2Command::RemoveNeighbor(mac) => {
                self.l2.remove_neighbor(&mac, ORIGIN_EXTERNAL);
            }
            L2Command::AddDestination {
                neighbor,
                destination,
            } => {
                let _ = self.l2.add_neighbor(neighbor, ORIGIN_EXTERNAL);
                self.l2.add_destination(&neighbor, destination);
            }
            L2Command::RemoveDestination {
                neighbor,
                destination,
            } => {
                self.l2.remove_destination(&neighbor, &destination);
            }
        }

        let events = self.l2.take_events();
        if let Some(active) = &mut self.active {
            let now = Instant::now();
            for event in &events {
                if let Err(err) = base_proto::l2_event(&mut active.session, &self.l2, event, now) {
                    warn!(interface = %self.if_name, %err, "l2 event handling failed");
                    active
                        .session
                        .terminate(&mut self.l2, TerminationReason::ProtocolError(err.to_string()));
                    break;
                }
            }
            if !self.service_active().await? {
                self.active = None;
            }
        }
        Ok(())
    }

    async fn handle_tcp_read(&mut self, read: io::Result<usize>) -> Result<()> {
        let Some(active) = &mut self.active else {
            return Ok(());
        };

        match read {
            Ok(0) => {
                active
                    .session
                    .terminate(&mut self.l2, TerminationReason::TransportLost);
            }
            Ok(_) => {
                let buffered = active.inbuf.split().freeze();
                match active
                    .session
                    .process_buffer(&mut self.l2, &buffered, Instant::now())
                {
                    Ok(consumed) => {
                        // keep the partial trailing signal for the next read
                        active.inbuf.extend_from_slice(&buffered[consumed..]);
                    }
                    Err(err) => {
                        warn!(interface = %self.if_name, %err, "session error");
                    }
                }
            }
            Err(err) => {
                warn!(interface = %self.if_name, %err, "read error");
                active
                    .session
                    .terminate(&mut self.l2, TerminationReason::TransportLost);
            }
        }

        if !self.service_active().await? {
            self.active = None;
        }
        Ok(())
    }

    async fn fire_timers(&mut self) -> Result<()> {
        if let Some(active) = &mut self.active {
            active
                .session
                .handle_timers(&mut self.l2, Instant::now())?;
        }
        if !self.service_active().await? {
            self.active = None;
        }
        Ok(())
    }

    /// Flush writer output and run queued events; false once the session
    /// is gone.
    async fn service_active(&mut self) -> Result<bool> {
        let Some(active) = &mut self.active else {
            return Ok(true);
        };

        if active.session.has_output() {
            let out = active.session.take_output();
            if let Err(err) = active.stream.write_all(&out).await {
                warn!(interface = %self.if_name, %err, "write failed");
                active
                    .session
                    .terminate(&mut self.l2, TerminationReason::TransportLost);
            }
        }

        for event in active.session.take_events() {
            if let SessionEvent::Terminated { final_bytes } = event {
                if !final_bytes.is_empty() {
                    // best-effort, the peer may already be gone
                    let _ = active.stream.write_all(&final_bytes).await;
                }
                let _ = active.stream.shutdown().await;
                info!(interface = %self.if_name, "session closed");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn io_internal(err: io::Error) -> crate::session::Error {
    crate::session::Error::InternalError(err.to_string())
}

async fn recv_opt(
    socket: &Option<UdpSocket>,
    buf: &mut [u8],
) -> io::Result<(usize, SocketAddr)> {
    match socket {
        Some(socket) => socket.recv_from(buf).await,
        None => std::future::pending().await,
    }
}

async fn read_opt(active: &mut Option<ActiveSession>) -> io::Result<usize> {
    match active {
        Some(active) => {
            if active.inbuf.capacity() - active.inbuf.len() < READ_CHUNK {
                active.inbuf.reserve(READ_CHUNK);
            }
            active.stream.read_buf(&mut active.inbuf).await
        }
        None => std::future::pending().await,
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}
