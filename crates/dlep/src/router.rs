//! Router-side runner: multicasts discovery, dials the offered
//! connection point, and projects the radio's destination signals into
//! the layer-2 table.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::l2::{Layer2Event, Layer2Table};
use crate::session::iana::{DLEP_MULTICAST_V4, DLEP_MULTICAST_V6, SignalId};
use crate::session::{
    AddressFamily, DlepSession, ExtensionRegistry, Result, Role, SessionConfig, SessionEvent,
    SignalRestriction, TerminationReason,
};

/// Read buffer growth quantum for the TCP stream.
const READ_CHUNK: usize = 4096;

struct ActiveSession {
    stream: TcpStream,
    session: DlepSession,
    inbuf: BytesMut,
}

/// One router interface: discovery sender plus at most one radio
/// session.
pub struct RouterInterface {
    if_name: String,
    cfg: SessionConfig,
    registry: Arc<ExtensionRegistry>,
    /// Destination port for discovery datagrams.
    port: u16,
    udp_v4: UdpSocket,
    udp_v6: Option<UdpSocket>,
    discovery: DlepSession,
    l2: Layer2Table,
    active: Option<ActiveSession>,
    next_origin: crate::l2::OriginId,
    events_tx: mpsc::UnboundedSender<Layer2Event>,
    events_rx: Option<mpsc::UnboundedReceiver<Layer2Event>>,
}

impl RouterInterface {
    /// Bind the discovery sockets and prepare the discovery session.
    /// `port` is the radio's DLEP port.
    pub async fn bind(if_name: impl Into<String>, cfg: SessionConfig, port: u16) -> Result<Self> {
        let if_name = if_name.into();
        cfg.validate()
            .map_err(crate::session::Error::InternalError)?;

        let udp_v4 = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(io_internal)?;
        let udp_v6 = match UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)).await {
            Ok(socket) => Some(socket),
            Err(err) => {
                warn!(%err, "no IPv6 discovery, bind failed");
                None
            }
        };

        let registry = Arc::new(ExtensionRegistry::new());
        let mut discovery = DlepSession::new(
            cfg.clone(),
            Role::Router,
            Arc::clone(&registry),
            crate::l2::ORIGIN_EXTERNAL,
            if_name.clone(),
            SignalRestriction::Only(SignalId::PEER_OFFER),
            Instant::now(),
        )?;
        let l2 = Layer2Table::new(if_name.clone());
        discovery.initialize(&l2)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            if_name,
            cfg,
            registry,
            port,
            udp_v4,
            udp_v6,
            discovery,
            l2,
            active: None,
            next_origin: 1,
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    /// Stream of layer-2 projection changes, for route programming and
    /// the like. Can be taken once.
    pub fn events(&mut self) -> Option<UnboundedReceiverStream<Layer2Event>> {
        self.events_rx.take().map(UnboundedReceiverStream::new)
    }

    /// The current layer-2 projection.
    pub fn l2(&self) -> &Layer2Table {
        &self.l2
    }

    /// Drive the interface forever.
    pub async fn run(&mut self) -> Result<()> {
        let mut dgram = [0u8; 1500];
        let mut dgram6 = [0u8; 1500];
        loop {
            let deadline = [
                self.discovery.next_timeout(),
                self.active.as_ref().and_then(|a| a.session.next_timeout()),
            ]
            .into_iter()
            .flatten()
            .min();

            tokio::select! {
                received = self.udp_v4.recv_from(&mut dgram) => {
                    let (len, src) = received.map_err(io_internal)?;
                    self.handle_datagram(&dgram[..len], src).await?;
                }
                received = recv_opt(&self.udp_v6, &mut dgram6) => {
                    let (len, src) = received.map_err(io_internal)?;
                    self.handle_datagram(&dgram6[..len], src).await?;
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

    async fn handle_datagram(&mut self, datagram: &[u8], src: SocketAddr) -> Result<()> {
        self.discovery
            .process_datagram(&mut self.l2, datagram, src, Instant::now())?;
        for event in self.discovery.take_events() {
            if let SessionEvent::Connect { remote } = event {
                if self.active.is_some() {
                    debug!(interface = %self.if_name, %remote, "offer ignored, session active");
                    continue;
                }
                self.connect(remote).await?;
            }
        }
        Ok(())
    }

    async fn connect(&mut self, remote: SocketAddr) -> Result<()> {
        info!(interface = %self.if_name, %remote, "connecting to radio");
        let stream = match TcpStream::connect(remote).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(interface = %self.if_name, %remote, %err, "connect failed");
                return Ok(());
            }
        };

        let origin = self.next_origin;
        self.next_origin += 1;

        let mut session = DlepSession::new(
            self.cfg.clone(),
            Role::Router,
            Arc::clone(&self.registry),
            origin,
            self.if_name.clone(),
            SignalRestriction::Only(SignalId::PEER_INITIALIZATION_ACK),
            Instant::now(),
        )?;
        session.set_remote_addr(remote);
        // emits the PEER_INITIALIZATION opener
        session.initialize(&self.l2)?;

        self.active = Some(ActiveSession {
            stream,
            session,
            inbuf: BytesMut::with_capacity(READ_CHUNK),
        });
        if !self.service_active().await? {
            self.active = None;
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
        self.forward_l2_events();
        Ok(())
    }

    async fn fire_timers(&mut self) -> Result<()> {
        self.discovery
            .handle_timers(&mut self.l2, Instant::now())?;
        for event in self.discovery.take_events() {
            if let SessionEvent::SendDatagram { family, payload } = event {
                self.send_discovery(family, &payload).await;
            }
        }

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

    async fn send_discovery(&self, family: AddressFamily, payload: &[u8]) {
        match family {
            AddressFamily::V4 => {
                let target = SocketAddr::from((DLEP_MULTICAST_V4, self.port));
                if let Err(err) = self.udp_v4.send_to(payload, target).await {
                    debug!(interface = %self.if_name, %err, "v4 discovery send failed");
                }
            }
            AddressFamily::V6 => {
                if let Some(socket) = &self.udp_v6 {
                    let target = SocketAddr::from((DLEP_MULTICAST_V6, self.port));
                    if let Err(err) = socket.send_to(payload, target).await {
                        debug!(interface = %self.if_name, %err, "v6 discovery send failed");
                    }
                }
            }
        }
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
                self.forward_l2_events();
                return Ok(false);
            }
        }
        self.forward_l2_events();
        Ok(true)
    }

    fn forward_l2_events(&mut self) {
        for event in self.l2.take_events() {
            let _ = self.events_tx.send(event);
        }
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
