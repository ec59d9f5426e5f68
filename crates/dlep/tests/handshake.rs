//! End-to-end protocol scenarios: two in-memory sessions wired back to
//! back by shuttling their output buffers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dlep::MacAddress;
use dlep::l2::{Layer2Table, ORIGIN_EXTERNAL};
use dlep::session::base_proto::{self, BaseProtoRouter};
use dlep::session::{
    AddressFamily, ConnectionPoint, DlepSession, Error, Extension, ExtensionRegistry,
    NeighborState, Role, SessionConfig, SessionEvent, SessionParser, SignalId, SignalRestriction,
    StatusCode, TerminationReason, TlvDecl, TlvId,
};

const HEARTBEAT: Duration = Duration::from_millis(5000);

fn config(peer_type: &str) -> SessionConfig {
    SessionConfig {
        peer_type: peer_type.into(),
        heartbeat_interval: HEARTBEAT,
        ..Default::default()
    }
}

fn mac() -> MacAddress {
    "aa:bb:cc:dd:ee:ff".parse().unwrap()
}

/// Move the sender's queued bytes into the receiver.
fn shuttle(from: &mut DlepSession, to: &mut DlepSession, to_l2: &mut Layer2Table, now: Instant) {
    let bytes = from.take_output();
    assert!(!bytes.is_empty(), "nothing to shuttle");
    let consumed = to.process_buffer(to_l2, &bytes, now).unwrap();
    assert_eq!(consumed, bytes.len());
}

/// Radio and router TCP sessions that have completed the init exchange.
fn steady_pair(
    registry: Arc<ExtensionRegistry>,
    radio_l2: &mut Layer2Table,
    router_l2: &mut Layer2Table,
    now: Instant,
) -> (DlepSession, DlepSession) {
    let mut radio = DlepSession::new(
        config("radio1"),
        Role::Radio,
        Arc::clone(&registry),
        1,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
        now,
    )
    .unwrap();
    radio.initialize(radio_l2).unwrap();

    let mut router = DlepSession::new(
        config("router1"),
        Role::Router,
        registry,
        1,
        "eth0",
        SignalRestriction::Only(SignalId::PEER_INITIALIZATION_ACK),
        now,
    )
    .unwrap();
    router.initialize(router_l2).unwrap();

    // router's PEER_INITIALIZATION, radio's PEER_INITIALIZATION_ACK
    shuttle(&mut router, &mut radio, radio_l2, now);
    shuttle(&mut radio, &mut router, router_l2, now);

    assert_eq!(radio.restrict(), SignalRestriction::Any);
    assert_eq!(router.restrict(), SignalRestriction::Any);
    (radio, router)
}

fn drive_l2_events(session: &mut DlepSession, l2: &mut Layer2Table, now: Instant) {
    for event in l2.take_events() {
        base_proto::l2_event(session, l2, &event, now).unwrap();
    }
}

fn signal_types(mut wire: &[u8]) -> Vec<u16> {
    let mut types = Vec::new();
    while wire.len() >= 4 {
        let signal = u16::from_be_bytes([wire[0], wire[1]]);
        let len = u16::from_be_bytes([wire[2], wire[3]]) as usize;
        types.push(signal);
        wire = &wire[4 + len..];
    }
    types
}

#[test]
fn test_discovery_and_initialization() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());

    let mut router_l2 = Layer2Table::new("eth0");
    let mut router_discovery = DlepSession::new(
        config("router1"),
        Role::Router,
        Arc::clone(&registry),
        0,
        "eth0",
        SignalRestriction::Only(SignalId::PEER_OFFER),
        t0,
    )
    .unwrap();
    router_discovery.initialize(&router_l2).unwrap();

    // discovery fires after one interval, once per address family
    let due = router_discovery.next_timeout().unwrap();
    router_discovery.handle_timers(&mut router_l2, due).unwrap();
    let events = router_discovery.take_events();
    assert_eq!(events.len(), 2);
    let discovery_payload = match &events[0] {
        SessionEvent::SendDatagram {
            family: AddressFamily::V4,
            payload,
        } => payload.clone(),
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(signal_types(&discovery_payload), vec![SignalId::PEER_DISCOVERY]);

    // radio answers with its connection point
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut radio_discovery = DlepSession::new(
        config("radio1"),
        Role::Radio,
        Arc::clone(&registry),
        0,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_DISCOVERY),
        t0,
    )
    .unwrap();
    radio_discovery.set_local_conpoints(vec![ConnectionPoint {
        addr: "10.0.0.1".parse().unwrap(),
        port: 854,
        tls: false,
    }]);
    radio_discovery.initialize(&radio_l2).unwrap();

    let router_src: SocketAddr = "10.0.0.2:49000".parse().unwrap();
    radio_discovery
        .process_datagram(&mut radio_l2, &discovery_payload, router_src, due)
        .unwrap();
    let offer = match radio_discovery.take_events().pop() {
        Some(SessionEvent::SendDatagram { payload, .. }) => payload,
        other => panic!("expected offer, got {other:?}"),
    };
    assert_eq!(signal_types(&offer), vec![SignalId::PEER_OFFER]);

    // router picks the offered v4 connection point
    let radio_src: SocketAddr = "10.0.0.1:854".parse().unwrap();
    router_discovery
        .process_datagram(&mut router_l2, &offer, radio_src, due)
        .unwrap();
    let remote = match router_discovery.take_events().pop() {
        Some(SessionEvent::Connect { remote }) => remote,
        other => panic!("expected connect, got {other:?}"),
    };
    assert_eq!(remote, "10.0.0.1:854".parse::<SocketAddr>().unwrap());

    // TCP handshake on the chosen address
    let (radio, router) = steady_pair(registry, &mut radio_l2, &mut router_l2, due);
    assert_eq!(radio.remote_heartbeat_interval(), HEARTBEAT);
    assert_eq!(router.remote_heartbeat_interval(), HEARTBEAT);
}

#[test]
fn test_destination_up_ack() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    let entry = radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    entry.data.cur_rx_bitrate = Some(1_000_000);
    entry.data.latency = Some(2500);
    drive_l2_events(&mut radio, &mut radio_l2, t0);

    let entry = radio.neighbors().get(&mac()).unwrap();
    assert_eq!(entry.state(), NeighborState::UpSent);
    assert_eq!(entry.ack_deadline(), Some(t0 + Duration::from_millis(10000)));

    // DESTINATION_UP reaches the router, which projects it into its table
    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    let projected = router_l2.get(&mac()).unwrap();
    assert_eq!(projected.data.cur_rx_bitrate, Some(1_000_000));
    assert_eq!(projected.data.latency, Some(2500));

    // UP_ACK comes back
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);
    let entry = radio.neighbors().get(&mac()).unwrap();
    assert_eq!(entry.state(), NeighborState::UpAcked);
    assert!(entry.ack_deadline().is_none());
}

#[test]
fn test_update_while_unacked() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    let up = radio.take_output();
    assert_eq!(signal_types(&up), vec![SignalId::DESTINATION_UP]);

    // the neighbor changes before the ack arrives
    if let Some(entry) = radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL) {
        entry.data.cur_rx_bitrate = Some(2_000_000);
    }
    radio_l2.notify_changed(mac());
    drive_l2_events(&mut radio, &mut radio_l2, t0);

    assert!(radio.neighbors().get(&mac()).unwrap().changed());
    assert!(!radio.has_output(), "no update may be sent while unacked");

    // deliver the UP, return the ACK
    router.process_buffer(&mut router_l2, &up, t0).unwrap();
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);

    // exactly one DESTINATION_UPDATE, flag reset
    let out = radio.take_output();
    assert_eq!(signal_types(&out), vec![SignalId::DESTINATION_UPDATE]);
    assert!(!radio.neighbors().get(&mac()).unwrap().changed());
}

#[test]
fn test_heartbeat_timeout_purges_neighbors() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);
    assert!(!radio.neighbors().is_empty());

    // silence until past twice the remote interval
    radio
        .handle_timers(&mut radio_l2, t0 + 2 * HEARTBEAT + Duration::from_millis(100))
        .unwrap();

    assert!(radio.is_terminated());
    assert_eq!(
        radio.termination_reason(),
        Some(&TerminationReason::HeartbeatTimeout)
    );
    assert!(radio.neighbors().is_empty());
    // no termination handshake is attempted
    match radio.take_events().pop() {
        Some(SessionEvent::Terminated { final_bytes }) => assert!(final_bytes.is_empty()),
        other => panic!("expected terminated, got {other:?}"),
    }
}

#[test]
fn test_truncated_tlv_terminates() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut radio = DlepSession::new(
        config("radio1"),
        Role::Radio,
        registry,
        1,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
        t0,
    )
    .unwrap();
    radio.initialize(&radio_l2).unwrap();

    // declared TLV length overruns the signal: 10 TLV bytes, but the
    // heartbeat TLV claims 8 value bytes with only 6 present
    let mut wire = Vec::new();
    wire.extend_from_slice(&SignalId::PEER_INITIALIZATION.to_be_bytes());
    wire.extend_from_slice(&10u16.to_be_bytes());
    wire.extend_from_slice(&TlvId::HEARTBEAT_INTERVAL.to_be_bytes());
    wire.extend_from_slice(&8u16.to_be_bytes());
    wire.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    let err = radio.process_buffer(&mut radio_l2, &wire, t0).unwrap_err();
    assert!(matches!(err, Error::IncompleteTlv { wanted: 8, available: 6, .. }));
    assert!(radio.is_terminated());
    assert!(radio_l2.is_empty(), "no partial state may leak");
}

struct TestMetricExtension {
    id: u16,
}

impl Extension for TestMetricExtension {
    fn id(&self) -> u16 {
        self.id
    }

    fn tlv_decls(&self) -> &[TlvDecl] {
        const DECLS: &[TlvDecl] = &[TlvDecl {
            id: 256,
            length_min: 4,
            length_max: 4,
            mandatory_in: &[],
            repeats_in: &[],
        }];
        DECLS
    }
}

#[test]
fn test_extension_negotiation() {
    let t0 = Instant::now();
    let mut registry = ExtensionRegistry::new();
    registry.register_radio(Arc::new(TestMetricExtension { id: 42 }));
    let registry = Arc::new(registry);

    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut radio = DlepSession::new(
        config("radio1"),
        Role::Radio,
        registry,
        1,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
        t0,
    )
    .unwrap();
    radio.initialize(&radio_l2).unwrap();

    // peer announces 42 (registered) and 99 (unknown)
    let mut wire = Vec::new();
    wire.extend_from_slice(&SignalId::PEER_INITIALIZATION.to_be_bytes());
    wire.extend_from_slice(&16u16.to_be_bytes());
    wire.extend_from_slice(&TlvId::HEARTBEAT_INTERVAL.to_be_bytes());
    wire.extend_from_slice(&4u16.to_be_bytes());
    wire.extend_from_slice(&5000u32.to_be_bytes());
    wire.extend_from_slice(&TlvId::EXTENSIONS_SUPPORTED.to_be_bytes());
    wire.extend_from_slice(&4u16.to_be_bytes());
    wire.extend_from_slice(&42u16.to_be_bytes());
    wire.extend_from_slice(&99u16.to_be_bytes());

    let consumed = radio.process_buffer(&mut radio_l2, &wire, t0).unwrap();
    assert_eq!(consumed, wire.len());

    assert_eq!(radio.active_extensions(), &[0, 42]);
    let allowed: Vec<u16> = radio.parser().allowed_tlv_types().collect();
    assert!(allowed.contains(&256), "extension 42 TLVs stay allowed");
    assert!(allowed.contains(&TlvId::MAC_ADDRESS));
    assert_eq!(radio.restrict(), SignalRestriction::Any);
    assert_eq!(signal_types(&radio.take_output()), vec![
        SignalId::PEER_INITIALIZATION_ACK
    ]);
}

#[test]
fn test_extension_dropped_when_not_announced() {
    let t0 = Instant::now();
    let mut registry = ExtensionRegistry::new();
    registry.register_radio(Arc::new(TestMetricExtension { id: 42 }));
    let registry = Arc::new(registry);

    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut radio = DlepSession::new(
        config("radio1"),
        Role::Radio,
        registry,
        1,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_INITIALIZATION),
        t0,
    )
    .unwrap();
    radio.initialize(&radio_l2).unwrap();

    // all registered extensions are live before negotiation
    assert!(radio.parser().allowed_tlv_types().any(|id| id == 256));

    let mut wire = Vec::new();
    wire.extend_from_slice(&SignalId::PEER_INITIALIZATION.to_be_bytes());
    wire.extend_from_slice(&8u16.to_be_bytes());
    wire.extend_from_slice(&TlvId::HEARTBEAT_INTERVAL.to_be_bytes());
    wire.extend_from_slice(&4u16.to_be_bytes());
    wire.extend_from_slice(&5000u32.to_be_bytes());
    radio.process_buffer(&mut radio_l2, &wire, t0).unwrap();

    assert_eq!(radio.active_extensions(), &[0]);
    assert!(
        !radio.parser().allowed_tlv_types().any(|id| id == 256),
        "unnegotiated extension TLVs must be purged"
    );
}

#[test]
fn test_destination_down_flow() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);

    // the link goes away
    radio_l2.remove_neighbor(&mac(), ORIGIN_EXTERNAL);
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    assert_eq!(
        radio.neighbors().get(&mac()).unwrap().state(),
        NeighborState::DownSent
    );

    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    assert!(router_l2.get(&mac()).is_none());

    shuttle(&mut router, &mut radio, &mut radio_l2, t0);
    assert!(radio.neighbors().get(&mac()).is_none());
}

#[test]
fn test_destination_down_unknown_mac_is_noop() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    radio.take_output(); // drop the UP, the router never sees it
    radio_l2.remove_neighbor(&mac(), ORIGIN_EXTERNAL);
    drive_l2_events(&mut radio, &mut radio_l2, t0);

    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    assert!(!router.is_terminated());
    assert!(!router.has_output(), "unknown destination gets no ack");
}

#[test]
fn test_duplicate_destination_up_is_metric_refresh() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    if let Some(entry) = radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL) {
        entry.data.cur_rx_bitrate = Some(3_000_000);
    }
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    let up = radio.take_output();

    router.process_buffer(&mut router_l2, &up, t0).unwrap();
    assert_eq!(signal_types(&router.take_output()), vec![
        SignalId::DESTINATION_UP_ACK
    ]);

    // the same UP again: one entry, metrics refreshed, another ack
    router.process_buffer(&mut router_l2, &up, t0).unwrap();
    assert!(!router.is_terminated());
    assert_eq!(router_l2.len(), 1);
    assert_eq!(
        router_l2.get(&mac()).unwrap().data.cur_rx_bitrate,
        Some(3_000_000)
    );
    assert_eq!(signal_types(&router.take_output()), vec![
        SignalId::DESTINATION_UP_ACK
    ]);
}

#[test]
fn test_peer_termination_handshake() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    // put a projection into the router table first
    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);
    assert!(router_l2.get(&mac()).is_some());

    router.request_termination(&router_l2).unwrap();
    assert_eq!(
        router.restrict(),
        SignalRestriction::Only(SignalId::PEER_TERMINATION_ACK)
    );
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);

    // radio acked best-effort and went down
    assert!(radio.is_terminated());
    assert_eq!(
        radio.termination_reason(),
        Some(&TerminationReason::PeerTerminated)
    );
    let ack = match radio.take_events().pop() {
        Some(SessionEvent::Terminated { final_bytes }) => final_bytes,
        other => panic!("expected terminated, got {other:?}"),
    };
    assert_eq!(signal_types(&ack), vec![SignalId::PEER_TERMINATION_ACK]);

    // the ack completes the router's shutdown and withdraws the projection
    router.process_buffer(&mut router_l2, &ack, t0).unwrap();
    assert!(router.is_terminated());
    assert!(router_l2.get(&mac()).is_none());
}

#[test]
fn test_router_denies_destination_when_table_full() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::with_capacity("eth0", 0);
    let (mut radio, mut router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    shuttle(&mut radio, &mut router, &mut router_l2, t0);
    assert!(router_l2.is_empty());

    // the denial must not advance the radio's destination state
    shuttle(&mut router, &mut radio, &mut radio_l2, t0);
    assert_eq!(
        radio.neighbors().get(&mac()).unwrap().state(),
        NeighborState::UpSent
    );
}

#[test]
fn test_ack_timeout_removes_destination() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut router_l2 = Layer2Table::new("eth0");
    let (mut radio, _router) = steady_pair(registry, &mut radio_l2, &mut router_l2, t0);

    radio_l2.add_neighbor(mac(), ORIGIN_EXTERNAL).unwrap();
    drive_l2_events(&mut radio, &mut radio_l2, t0);
    radio.take_output();

    // a late heartbeat keeps the watchdog quiet past the ack deadline
    let t1 = t0 + Duration::from_millis(4000);
    let heartbeat = [0x00, 0x0e, 0x00, 0x00];
    radio.process_buffer(&mut radio_l2, &heartbeat, t1).unwrap();

    let expired = t0 + 2 * HEARTBEAT + Duration::from_millis(1);
    radio.handle_timers(&mut radio_l2, expired).unwrap();

    assert!(!radio.is_terminated());
    assert!(
        radio.neighbors().get(&mac()).is_none(),
        "unacked destination must be dropped"
    );
}

#[test]
fn test_encode_decode_preserves_order() {
    let mut parser = SessionParser::new();
    let router = BaseProtoRouter::new();
    parser
        .update_allowed_tlvs(&[&router as &dyn Extension])
        .unwrap();

    let mut session = DlepSession::new(
        config("radio1"),
        Role::Radio,
        Arc::new(ExtensionRegistry::new()),
        0,
        "wlan0",
        SignalRestriction::Only(SignalId::PEER_DISCOVERY),
        Instant::now(),
    )
    .unwrap();
    session.set_local_conpoints(
        (1..=3)
            .map(|i| ConnectionPoint {
                addr: format!("10.0.0.{i}").parse().unwrap(),
                port: 854,
                tls: false,
            })
            .collect(),
    );
    let l2 = Layer2Table::new("wlan0");
    session
        .generate_signal(&l2, SignalId::PEER_OFFER, None)
        .unwrap();
    let wire = session.take_output();

    parser
        .parse_signal(SignalId::PEER_OFFER, &wire[4..])
        .unwrap();
    let mut seen = Vec::new();
    let mut value = parser.get_first_value(TlvId::IPV4_CONPOINT);
    while let Some(v) = value {
        seen.push(parser.value_bytes(v)[4]);
        value = parser.get_next_value(v);
    }
    assert_eq!(seen, vec![1, 2, 3], "TLV order must survive the codec");
}

#[test]
fn test_status_tlv_roundtrip() {
    let t0 = Instant::now();
    let registry = Arc::new(ExtensionRegistry::new());
    let router_l2 = Layer2Table::new("eth0");
    let mut router = DlepSession::new(
        config("router1"),
        Role::Router,
        registry,
        1,
        "eth0",
        SignalRestriction::Any,
        t0,
    )
    .unwrap();

    router
        .generate_signal_status(
            &router_l2,
            SignalId::DESTINATION_UP_ACK,
            Some(&mac()),
            StatusCode::REQUEST_DENIED,
            "Not enough memory",
        )
        .unwrap();
    let wire = router.take_output();
    assert_eq!(signal_types(&wire), vec![SignalId::DESTINATION_UP_ACK]);

    // the radio reads the code back out
    let mut radio_l2 = Layer2Table::new("wlan0");
    let mut radio = DlepSession::new(
        config("radio1"),
        Role::Radio,
        Arc::new(ExtensionRegistry::new()),
        1,
        "wlan0",
        SignalRestriction::Any,
        t0,
    )
    .unwrap();
    radio.process_buffer(&mut radio_l2, &wire, t0).unwrap();
    assert!(!radio.is_terminated());
    assert!(radio.neighbors().get(&mac()).is_none());
}
