//! DLEP wire framing: signal and TLV headers.
//!
//! Everything on the wire is `<type:u16, length:u16>` big-endian followed
//! by `length` value bytes. Unlike netlink there is no alignment padding;
//! elements are packed back to back.

use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};

/// Size of the signal header.
pub const SIGNAL_HDRLEN: usize = 4;

/// Size of the TLV header.
pub const TLV_HDRLEN: usize = 4;

/// Signal header: type and byte count of the TLVs that follow.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SignalHeader {
    /// Signal type.
    pub signal_type: U16,
    /// Length of the TLV block, excluding this header.
    pub signal_length: U16,
}

impl SignalHeader {
    /// Create a new signal header.
    pub fn new(signal_type: u16, signal_length: u16) -> Self {
        Self {
            signal_type: U16::new(signal_type),
            signal_length: U16::new(signal_length),
        }
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from the front of a buffer.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::IncompleteTlvHeader { offset: 0 })
    }
}

/// TLV header: type and value byte count.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct TlvHeader {
    /// TLV type.
    pub tlv_type: U16,
    /// Length of the value, excluding this header.
    pub tlv_length: U16,
}

impl TlvHeader {
    /// Create a new TLV header.
    pub fn new(tlv_type: u16, value_len: usize) -> Self {
        Self {
            tlv_type: U16::new(tlv_type),
            tlv_length: U16::new(value_len as u16),
        }
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse from the front of a buffer.
    ///
    /// `offset` only feeds the error, so a failed parse names the position
    /// within the signal.
    pub fn from_bytes(data: &[u8], offset: usize) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::IncompleteTlvHeader { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_header_roundtrip() {
        let hdr = SignalHeader::new(3, 17);
        let bytes = hdr.as_bytes();
        assert_eq!(bytes, &[0x00, 0x03, 0x00, 0x11]);

        let parsed = SignalHeader::from_bytes(bytes).unwrap();
        assert_eq!(parsed.signal_type.get(), 3);
        assert_eq!(parsed.signal_length.get(), 17);
    }

    #[test]
    fn test_tlv_header_big_endian() {
        let hdr = TlvHeader::new(0x0102, 0x0304);
        assert_eq!(hdr.as_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_truncated_header() {
        assert!(SignalHeader::from_bytes(&[0x00, 0x03]).is_err());
        let err = TlvHeader::from_bytes(&[0x00], 12).unwrap_err();
        match err {
            Error::IncompleteTlvHeader { offset } => assert_eq!(offset, 12),
            other => panic!("unexpected error: {other}"),
        }
    }
}
