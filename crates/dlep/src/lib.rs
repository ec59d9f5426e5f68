//! Async DLEP (Dynamic Link Exchange Protocol) session engine.
//!
//! DLEP is the control protocol by which a *radio* advertises its
//! wireless neighbors and their link metrics to a co-located *router*:
//! TLV-framed signals over TCP, UDP multicast discovery, heartbeats,
//! and a per-destination acknowledgment lifecycle.
//!
//! The crate splits into a transport-free session engine in
//! [`session`] (codec, parser, extension framework, state machine,
//! timers) and two tokio runners that own the sockets: [`radio`] and
//! [`router`]. The [`l2`] module holds the layer-2 neighbor table the
//! engine mirrors (radio) or maintains (router).
//!
//! # Radio
//!
//! ```ignore
//! use dlep::radio::RadioInterface;
//! use dlep::session::SessionConfig;
//!
//! #[tokio::main]
//! async fn main() -> dlep::session::Result<()> {
//!     let cfg = SessionConfig {
//!         peer_type: "radio1".into(),
//!         ..Default::default()
//!     };
//!     let mut radio = RadioInterface::bind("wlan0", cfg, dlep::session::DLEP_PORT).await?;
//!
//!     // feed l2 neighbor changes, run the protocol
//!     radio.l2_handle().add_neighbor("aa:bb:cc:dd:ee:ff".parse().unwrap());
//!     radio.run().await
//! }
//! ```
//!
//! # Router
//!
//! ```ignore
//! use dlep::router::RouterInterface;
//! use dlep::session::SessionConfig;
//! use tokio_stream::StreamExt;
//!
//! let mut router = RouterInterface::bind("eth0", SessionConfig::default()).await?;
//! let mut events = router.events();
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod l2;
pub mod session;
pub mod util;

pub mod radio;
pub mod router;

// Re-export common types at crate root for convenience
pub use l2::{Layer2Data, Layer2Event, Layer2Neighbor, Layer2Table, OriginId};
pub use session::{
    DlepSession, Error, ExtensionRegistry, Result, Role, SessionConfig, SessionEvent,
    TerminationReason,
};
pub use util::MacAddress;
