//! DLEP session engine: wire codec, parser, extension framework and the
//! per-session state machine.
//!
//! # Structure
//!
//! - [`iana`]: protocol numbering (signal ids, TLV ids, status codes)
//! - [`tlv`] / [`writer`] / [`reader`]: wire codec
//! - [`parser`]: allowed-TLV map and per-signal validation
//! - [`extension`]: extension trait and registry
//! - [`base_proto`]: the built-in base protocol, radio and router flavor
//! - [`neighbor`]: destination table and ack sub-state-machine
//! - [`session`]: the session itself
//!
//! The engine is transport-free: bytes in, bytes and events out. See
//! [`crate::radio`] and [`crate::router`] for the tokio runners.

pub mod base_proto;
pub mod config;
pub mod error;
pub mod extension;
pub mod iana;
pub mod neighbor;
pub mod parser;
pub mod reader;
pub mod session;
pub mod tlv;
pub mod writer;

pub use config::SessionConfig;
pub use error::{Error, Result};
pub use extension::{Extension, ExtensionRegistry, TlvDecl};
pub use iana::{DLEP_PORT, SignalId, StatusCode, TlvId};
pub use neighbor::{LocalNeighbor, NeighborState, NeighborTable};
pub use parser::SessionParser;
pub use session::{
    AddressFamily, ConnectionPoint, DlepSession, Role, SessionEvent, SignalRestriction,
    TerminationReason,
};
pub use writer::SignalWriter;
