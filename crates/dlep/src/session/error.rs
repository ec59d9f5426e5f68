//! Error types for DLEP session processing.

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing inbound signals or running a session.
///
/// Any of these terminates the session; DLEP has no partial-signal
/// recovery model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signal too short, the 4-byte TLV header could not be read.
    #[error("incomplete TLV header at offset {offset}")]
    IncompleteTlvHeader {
        /// Byte offset of the truncated header within the signal.
        offset: usize,
    },

    /// A TLV declared more value bytes than the signal has left.
    #[error("incomplete TLV: type {tlv_type} wants {wanted} bytes, {available} available")]
    IncompleteTlv {
        /// TLV type of the truncated element.
        tlv_type: u16,
        /// Declared value length.
        wanted: usize,
        /// Bytes remaining in the signal.
        available: usize,
    },

    /// TLV type not in the session's allowed-TLV map.
    #[error("unsupported TLV type {tlv_type} in signal {signal}")]
    UnsupportedTlv {
        /// The offending TLV type.
        tlv_type: u16,
        /// Signal it appeared in.
        signal: u16,
    },

    /// TLV length outside the declared `[min, max]` range.
    #[error("illegal length {length} for TLV type {tlv_type} (allowed {min}..={max})")]
    IllegalTlvLength {
        /// The offending TLV type.
        tlv_type: u16,
        /// Length seen on the wire.
        length: u16,
        /// Declared minimum.
        min: u16,
        /// Declared maximum.
        max: u16,
    },

    /// A TLV declared mandatory for this signal was absent.
    #[error("missing mandatory TLV type {tlv_type} in signal {signal}")]
    MissingMandatoryTlv {
        /// The absent TLV type.
        tlv_type: u16,
        /// Signal it was required in.
        signal: u16,
    },

    /// A non-repeating TLV appeared more than once.
    #[error("duplicate TLV type {tlv_type} in signal {signal}")]
    DuplicateTlv {
        /// The repeated TLV type.
        tlv_type: u16,
        /// Signal it appeared in.
        signal: u16,
    },

    /// Allocation failed while encoding or bookkeeping.
    #[error("out of memory: {0}")]
    OutOfMemory(&'static str),

    /// Inconsistent internal data structures, including protocol-order
    /// violations against `restrict_signal`.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The TCP transport went away under the session.
    #[error("transport lost")]
    TransportLost,

    /// The peer requested termination.
    #[error("peer terminated session")]
    PeerTerminated,

    /// No heartbeat from the peer within twice its announced interval.
    #[error("remote heartbeat timeout")]
    HeartbeatTimeout,
}

impl Error {
    /// True for errors produced by the signal parser, as opposed to
    /// session-level conditions.
    pub fn is_parser_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteTlvHeader { .. }
                | Self::IncompleteTlv { .. }
                | Self::UnsupportedTlv { .. }
                | Self::IllegalTlvLength { .. }
                | Self::MissingMandatoryTlv { .. }
                | Self::DuplicateTlv { .. }
        )
    }

    /// True if the session ended by regular peer request rather than a
    /// local failure.
    pub fn is_peer_termination(&self) -> bool {
        matches!(self, Self::PeerTerminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::IllegalTlvLength {
            tlv_type: 5,
            length: 3,
            min: 4,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "illegal length 3 for TLV type 5 (allowed 4..=4)"
        );

        let err = Error::UnsupportedTlv {
            tlv_type: 99,
            signal: 3,
        };
        assert_eq!(err.to_string(), "unsupported TLV type 99 in signal 3");
    }

    #[test]
    fn test_is_parser_error() {
        assert!(Error::IncompleteTlvHeader { offset: 2 }.is_parser_error());
        assert!(
            Error::DuplicateTlv {
                tlv_type: 1,
                signal: 4
            }
            .is_parser_error()
        );
        assert!(!Error::HeartbeatTimeout.is_parser_error());
        assert!(!Error::TransportLost.is_parser_error());
    }

    #[test]
    fn test_is_peer_termination() {
        assert!(Error::PeerTerminated.is_peer_termination());
        assert!(!Error::HeartbeatTimeout.is_peer_termination());
    }
}
