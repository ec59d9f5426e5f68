//! Base protocol extension: the TLV set and signal handlers every DLEP
//! session carries, split into a radio and a router flavor.

mod radio;
mod router;

pub use radio::BaseProtoRadio;
pub use radio::{l2_event, l2_neighbor_added, l2_neighbor_changed, l2_neighbor_removed};
pub use router::BaseProtoRouter;

use tracing::{debug, info};

use super::error::Result;
use super::extension::TlvDecl;
use super::iana::{SignalId, StatusCode, TlvId};
use super::reader;
use super::session::{DlepSession, TerminationReason};
use crate::l2::Layer2Table;

/// TLV declarations of the base protocol, shared by both roles.
pub(crate) const TLV_DECLS: &[TlvDecl] = &[
    TlvDecl {
        id: TlvId::STATUS,
        length_min: 1,
        length_max: 255,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::IPV4_CONPOINT,
        length_min: 7,
        length_max: 7,
        mandatory_in: &[],
        repeats_in: &[SignalId::PEER_OFFER],
    },
    TlvDecl {
        id: TlvId::IPV6_CONPOINT,
        length_min: 19,
        length_max: 19,
        mandatory_in: &[],
        repeats_in: &[SignalId::PEER_OFFER],
    },
    TlvDecl {
        id: TlvId::PEER_TYPE,
        length_min: 0,
        length_max: 255,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::HEARTBEAT_INTERVAL,
        length_min: 4,
        length_max: 4,
        mandatory_in: &[SignalId::PEER_INITIALIZATION, SignalId::PEER_INITIALIZATION_ACK],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::EXTENSIONS_SUPPORTED,
        length_min: 0,
        length_max: 254,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::MAC_ADDRESS,
        length_min: 6,
        length_max: 6,
        mandatory_in: &[
            SignalId::DESTINATION_UP,
            SignalId::DESTINATION_UP_ACK,
            SignalId::DESTINATION_DOWN,
            SignalId::DESTINATION_DOWN_ACK,
            SignalId::DESTINATION_UPDATE,
            SignalId::LINK_CHARACTERISTICS_REQUEST,
            SignalId::LINK_CHARACTERISTICS_ACK,
        ],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::IPV4_ADDRESS,
        length_min: 5,
        length_max: 5,
        mandatory_in: &[],
        repeats_in: &[
            SignalId::DESTINATION_UP,
            SignalId::DESTINATION_UPDATE,
            SignalId::PEER_UPDATE,
        ],
    },
    TlvDecl {
        id: TlvId::IPV6_ADDRESS,
        length_min: 17,
        length_max: 17,
        mandatory_in: &[],
        repeats_in: &[
            SignalId::DESTINATION_UP,
            SignalId::DESTINATION_UPDATE,
            SignalId::PEER_UPDATE,
        ],
    },
    TlvDecl {
        id: TlvId::MDRR,
        length_min: 8,
        length_max: 8,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::MDRT,
        length_min: 8,
        length_max: 8,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::CDRR,
        length_min: 8,
        length_max: 8,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::CDRT,
        length_min: 8,
        length_max: 8,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::LATENCY,
        length_min: 8,
        length_max: 8,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::RESOURCES,
        length_min: 1,
        length_max: 1,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::RLQR,
        length_min: 1,
        length_max: 1,
        mandatory_in: &[],
        repeats_in: &[],
    },
    TlvDecl {
        id: TlvId::RLQT,
        length_min: 1,
        length_max: 1,
        mandatory_in: &[],
        repeats_in: &[],
    },
];

/// Heartbeat receipt: the peer is alive, rearm the watchdog.
pub(crate) fn process_heartbeat(session: &mut DlepSession) -> Result<()> {
    debug!(interface = %session.if_name(), "received heartbeat");
    session.arm_remote_watchdog();
    Ok(())
}

/// Peer asked for termination: ack best-effort, then go down.
pub(crate) fn process_peer_termination(
    session: &mut DlepSession,
    l2: &mut Layer2Table,
) -> Result<()> {
    log_status(session)?;
    session.generate_signal(l2, SignalId::PEER_TERMINATION_ACK, None)?;
    session.terminate(l2, TerminationReason::PeerTerminated);
    Ok(())
}

/// Peer confirmed our termination request.
pub(crate) fn process_peer_termination_ack(
    session: &mut DlepSession,
    l2: &mut Layer2Table,
) -> Result<()> {
    log_status(session)?;
    session.terminate(l2, TerminationReason::PeerTerminated);
    Ok(())
}

/// Read and log the optional status TLV; absent reads as SUCCESS.
pub(crate) fn log_status(session: &DlepSession) -> Result<u8> {
    let (code, text) = reader::status(session.parser())?;
    if code != StatusCode::SUCCESS {
        info!(
            interface = %session.if_name(),
            code,
            text,
            "peer reported status"
        );
    } else if !text.is_empty() {
        debug!(interface = %session.if_name(), text, "peer status text");
    }
    Ok(code)
}

/// Log the optional peer type TLV.
pub(crate) fn log_peer_type(session: &DlepSession) {
    if let Some(peer_type) = reader::peer_type(session.parser()) {
        debug!(interface = %session.if_name(), peer_type, "peer type");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decls_have_unique_ids() {
        for (i, a) in TLV_DECLS.iter().enumerate() {
            for b in &TLV_DECLS[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate declaration for TLV {}", a.id);
            }
        }
    }

    #[test]
    fn test_decls_ranges_sane() {
        for decl in TLV_DECLS {
            assert!(decl.length_min <= decl.length_max, "TLV {}", decl.id);
        }
    }
}
