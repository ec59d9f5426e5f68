//! Extension framework: TLV declarations, per-signal handlers and the
//! process-wide registry.
//!
//! An extension is a numbered bundle of TLV declarations and signal
//! handlers. The base protocol is itself an extension (id 0) that is
//! always active; negotiated extensions are enabled per session by
//! [`DlepSession::update_extensions`](super::session::DlepSession::update_extensions).
//!
//! The registry is populated at startup, frozen, and shared by reference
//! across all sessions.

use std::sync::Arc;

use super::error::Result;
use super::session::{DlepSession, Role};
use crate::l2::Layer2Table;
use crate::util::MacAddress;

/// Declaration of one TLV type an extension understands.
///
/// `mandatory_in` and `repeats_in` list the signal types the TLV must
/// appear in, respectively may appear several times in.
#[derive(Debug, Clone, Copy)]
pub struct TlvDecl {
    /// TLV type.
    pub id: u16,
    /// Minimal value length.
    pub length_min: u16,
    /// Maximal value length.
    pub length_max: u16,
    /// Signals the TLV is mandatory in.
    pub mandatory_in: &'static [u16],
    /// Signals the TLV may repeat in.
    pub repeats_in: &'static [u16],
}

/// One protocol extension: TLV declarations plus signal handlers.
///
/// `process_signal` and `write_signal` receive every signal of the
/// session; implementations match on the signal type and fall through
/// with `Ok(())` for signals they do not handle. Handlers returning an
/// error terminate the session.
pub trait Extension: Send + Sync {
    /// Numeric extension id. Id 0 is the base protocol.
    fn id(&self) -> u16;

    /// TLV types this extension contributes to the allowed-TLV map.
    fn tlv_decls(&self) -> &[TlvDecl];

    /// Handle an inbound signal that has passed the parser.
    fn process_signal(
        &self,
        session: &mut DlepSession,
        l2: &mut Layer2Table,
        signal: u16,
    ) -> Result<()> {
        let _ = (session, l2, signal);
        Ok(())
    }

    /// Contribute TLVs to an outbound signal.
    fn write_signal(
        &self,
        session: &mut DlepSession,
        l2: &Layer2Table,
        signal: u16,
        mac: Option<&MacAddress>,
    ) -> Result<()> {
        let _ = (session, l2, signal, mac);
        Ok(())
    }

    /// Hook run once when a session is created, after the allowed-TLV
    /// map has been seeded.
    fn session_init(&self, session: &mut DlepSession, l2: &Layer2Table) -> Result<()> {
        let _ = (session, l2);
        Ok(())
    }

    /// Hook run when a session terminates.
    fn session_cleanup(&self, session: &mut DlepSession, l2: &mut Layer2Table) {
        let _ = (session, l2);
    }
}

/// Process-wide extension registry, one handler set per role.
///
/// Built once at startup; sessions keep an `Arc` and never mutate it.
#[derive(Default)]
pub struct ExtensionRegistry {
    radio: Vec<Arc<dyn Extension>>,
    router: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a registry preloaded with the base protocol for both roles.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_radio(Arc::new(super::base_proto::BaseProtoRadio::new()));
        registry.register_router(Arc::new(super::base_proto::BaseProtoRouter::new()));
        registry
    }

    /// Register an extension for radio sessions. Registration order is
    /// dispatch order.
    pub fn register_radio(&mut self, ext: Arc<dyn Extension>) {
        self.radio.push(ext);
    }

    /// Register an extension for router sessions.
    pub fn register_router(&mut self, ext: Arc<dyn Extension>) {
        self.router.push(ext);
    }

    /// All extensions registered for a role, in registration order.
    pub fn for_role(&self, role: Role) -> &[Arc<dyn Extension>] {
        match role {
            Role::Radio => &self.radio,
            Role::Router => &self.router,
        }
    }

    /// Extension ids for a role, base protocol excluded, as advertised
    /// in EXTENSIONS_SUPPORTED TLVs.
    pub fn negotiable_ids(&self, role: Role) -> Vec<u16> {
        self.for_role(role)
            .iter()
            .map(|ext| ext.id())
            .filter(|id| *id != super::iana::BASE_PROTO_EXTENSION)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_base_proto() {
        let registry = ExtensionRegistry::new();
        assert_eq!(registry.for_role(Role::Radio).len(), 1);
        assert_eq!(registry.for_role(Role::Router).len(), 1);
        assert_eq!(registry.for_role(Role::Radio)[0].id(), 0);
    }

    #[test]
    fn test_negotiable_ids_skip_base() {
        struct Dummy;
        impl Extension for Dummy {
            fn id(&self) -> u16 {
                42
            }
            fn tlv_decls(&self) -> &[TlvDecl] {
                &[]
            }
        }

        let mut registry = ExtensionRegistry::new();
        registry.register_radio(Arc::new(Dummy));
        assert_eq!(registry.negotiable_ids(Role::Radio), vec![42]);
        assert!(registry.negotiable_ids(Role::Router).is_empty());
    }
}
