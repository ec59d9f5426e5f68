//! Per-signal TLV validation and value indexing.
//!
//! The parser owns the session's allowed-TLV map, built as the exact
//! union of the active extensions' declarations, and a dense value table
//! for the signal most recently parsed. Values of a repeated TLV type
//! form a chain through [`ParserValue::next`]; slices returned by
//! [`SessionParser::value_bytes`] stay valid until the next signal is
//! parsed.

use std::collections::BTreeMap;

use super::error::{Error, Result};
use super::extension::{Extension, TlvDecl};
use super::tlv::{TLV_HDRLEN, TlvHeader};

/// Chain terminator in the value table.
const NO_VALUE: i32 = -1;

/// Allowed-TLV map entry for one TLV type.
#[derive(Debug, Clone)]
pub struct ParserTlv {
    /// Minimal value length.
    pub length_min: u16,
    /// Maximal value length.
    pub length_max: u16,
    /// Signals this TLV is mandatory in.
    mandatory_in: Vec<u16>,
    /// Signals this TLV may appear more than once in.
    repeats_in: Vec<u16>,
    /// Index of the first value of this type, [`NO_VALUE`] if none.
    first: i32,
    /// Index of the last value of this type, [`NO_VALUE`] if none.
    last: i32,
    /// Marked during extension renegotiation; purged if it stays set.
    removable: bool,
}

impl ParserTlv {
    fn from_decl(decl: &TlvDecl) -> Self {
        Self {
            length_min: decl.length_min,
            length_max: decl.length_max,
            mandatory_in: decl.mandatory_in.to_vec(),
            repeats_in: decl.repeats_in.to_vec(),
            first: NO_VALUE,
            last: NO_VALUE,
            removable: false,
        }
    }

    /// Fold another declaration of the same TLV type into this entry.
    ///
    /// Overlapping length ranges widen to their union; disjoint ranges
    /// are an irreconcilable declaration clash.
    fn merge(&mut self, decl: &TlvDecl) -> Result<()> {
        if decl.length_min > self.length_max || self.length_min > decl.length_max {
            return Err(Error::InternalError(format!(
                "conflicting length ranges for TLV {}: {}..={} vs {}..={}",
                decl.id, self.length_min, self.length_max, decl.length_min, decl.length_max
            )));
        }
        self.length_min = self.length_min.min(decl.length_min);
        self.length_max = self.length_max.max(decl.length_max);
        for signal in decl.mandatory_in {
            if !self.mandatory_in.contains(signal) {
                self.mandatory_in.push(*signal);
            }
        }
        for signal in decl.repeats_in {
            if !self.repeats_in.contains(signal) {
                self.repeats_in.push(*signal);
            }
        }
        self.removable = false;
        Ok(())
    }
}

/// One decoded TLV value: position and length within the parsed signal.
#[derive(Debug, Clone, Copy)]
pub struct ParserValue {
    /// Index of the next value of the same type, [`NO_VALUE`] at the end.
    next: i32,
    /// Byte offset of the value within the signal's TLV block.
    index: u16,
    /// Value length in bytes.
    length: u16,
}

impl ParserValue {
    /// Value length in bytes.
    pub fn length(&self) -> u16 {
        self.length
    }
}

/// TLV parser state of one DLEP session.
#[derive(Debug, Default)]
pub struct SessionParser {
    /// Allowed-TLV map, keyed by TLV type.
    allowed: BTreeMap<u16, ParserTlv>,
    /// Value table of the most recently parsed signal.
    values: Vec<ParserValue>,
    /// Copy of the TLV block of the most recently parsed signal.
    signal_data: Vec<u8>,
    /// Type of the most recently parsed signal.
    signal_type: u16,
}

impl SessionParser {
    /// Create a parser with an empty allowed-TLV map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the allowed-TLV map as the union of the given extensions'
    /// declarations.
    ///
    /// Entries no extension declares anymore are purged; entries declared
    /// by several extensions must have compatible length ranges.
    pub fn update_allowed_tlvs(&mut self, extensions: &[&dyn Extension]) -> Result<()> {
        for tlv in self.allowed.values_mut() {
            tlv.removable = true;
        }

        for ext in extensions {
            for decl in ext.tlv_decls() {
                match self.allowed.get_mut(&decl.id) {
                    Some(existing) => existing.merge(decl)?,
                    None => {
                        self.allowed.insert(decl.id, ParserTlv::from_decl(decl));
                    }
                }
            }
        }

        self.allowed.retain(|_, tlv| !tlv.removable);
        Ok(())
    }

    /// Look up the allowed-map entry for a TLV type.
    pub fn get_tlv(&self, tlv_type: u16) -> Option<&ParserTlv> {
        self.allowed.get(&tlv_type)
    }

    /// TLV types currently allowed, in ascending order.
    pub fn allowed_tlv_types(&self) -> impl Iterator<Item = u16> + '_ {
        self.allowed.keys().copied()
    }

    /// Validate and index one signal's TLV block.
    ///
    /// On error the value table is in an undefined state and the session
    /// must terminate.
    pub fn parse_signal(&mut self, signal_type: u16, tlv_block: &[u8]) -> Result<()> {
        self.signal_type = signal_type;
        self.values.clear();
        self.signal_data.clear();
        self.signal_data
            .try_reserve(tlv_block.len())
            .map_err(|_| Error::OutOfMemory("parser signal buffer"))?;
        self.signal_data.extend_from_slice(tlv_block);
        for tlv in self.allowed.values_mut() {
            tlv.first = NO_VALUE;
            tlv.last = NO_VALUE;
        }

        let mut offset = 0usize;
        while offset < tlv_block.len() {
            let header = TlvHeader::from_bytes(&tlv_block[offset..], offset)?;
            let tlv_type = header.tlv_type.get();
            let length = header.tlv_length.get();

            let value_start = offset + TLV_HDRLEN;
            if length as usize > tlv_block.len() - value_start {
                return Err(Error::IncompleteTlv {
                    tlv_type,
                    wanted: length as usize,
                    available: tlv_block.len() - value_start,
                });
            }

            let tlv = self.allowed.get_mut(&tlv_type).ok_or(Error::UnsupportedTlv {
                tlv_type,
                signal: signal_type,
            })?;
            if length < tlv.length_min || length > tlv.length_max {
                return Err(Error::IllegalTlvLength {
                    tlv_type,
                    length,
                    min: tlv.length_min,
                    max: tlv.length_max,
                });
            }

            let idx = self.values.len() as i32;
            self.values.push(ParserValue {
                next: NO_VALUE,
                index: value_start as u16,
                length,
            });
            if tlv.first == NO_VALUE {
                tlv.first = idx;
            } else {
                self.values[tlv.last as usize].next = idx;
            }
            tlv.last = idx;

            offset = value_start + length as usize;
        }

        for (id, tlv) in &self.allowed {
            if tlv.first == NO_VALUE && tlv.mandatory_in.contains(&signal_type) {
                return Err(Error::MissingMandatoryTlv {
                    tlv_type: *id,
                    signal: signal_type,
                });
            }
            if tlv.first != tlv.last && !tlv.repeats_in.contains(&signal_type) {
                return Err(Error::DuplicateTlv {
                    tlv_type: *id,
                    signal: signal_type,
                });
            }
        }
        Ok(())
    }

    /// First value of a TLV type in the parsed signal.
    pub fn get_first_value(&self, tlv_type: u16) -> Option<&ParserValue> {
        let tlv = self.allowed.get(&tlv_type)?;
        if tlv.first == NO_VALUE {
            return None;
        }
        Some(&self.values[tlv.first as usize])
    }

    /// Next value of the same TLV type.
    pub fn get_next_value(&self, value: &ParserValue) -> Option<&ParserValue> {
        if value.next == NO_VALUE {
            return None;
        }
        Some(&self.values[value.next as usize])
    }

    /// Raw bytes of one value, borrowed from the parsed signal.
    pub fn value_bytes(&self, value: &ParserValue) -> &[u8] {
        &self.signal_data[value.index as usize..value.index as usize + value.length as usize]
    }

    /// Type of the most recently parsed signal.
    pub fn signal_type(&self) -> u16 {
        self.signal_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::base_proto::BaseProtoRadio;
    use crate::session::iana::{SignalId, TlvId};

    fn parser_with_base() -> SessionParser {
        let mut parser = SessionParser::new();
        let base = BaseProtoRadio::new();
        parser.update_allowed_tlvs(&[&base as &dyn Extension]).unwrap();
        parser
    }

    fn tlv(tlv_type: u16, value: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&tlv_type.to_be_bytes());
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn test_empty_signal_parses() {
        let mut parser = parser_with_base();
        parser.parse_signal(SignalId::HEARTBEAT, &[]).unwrap();
        assert!(parser.get_first_value(TlvId::STATUS).is_none());
    }

    #[test]
    fn test_missing_mandatory() {
        let mut parser = parser_with_base();
        let err = parser
            .parse_signal(SignalId::DESTINATION_UP, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingMandatoryTlv {
                tlv_type: TlvId::MAC_ADDRESS,
                ..
            }
        ));
    }

    #[test]
    fn test_incomplete_header() {
        let mut parser = parser_with_base();
        let err = parser
            .parse_signal(SignalId::HEARTBEAT, &[0x00, 0x01])
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteTlvHeader { offset: 0 }));
    }

    #[test]
    fn test_incomplete_tlv() {
        let mut parser = parser_with_base();
        // Status TLV claims 6 value bytes, only 4 present.
        let mut block = tlv(TlvId::STATUS, &[0, 1, 2, 3]);
        block[3] = 6;
        let err = parser
            .parse_signal(SignalId::PEER_UPDATE_ACK, &block)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteTlv {
                tlv_type: TlvId::STATUS,
                wanted: 6,
                available: 4
            }
        ));
    }

    #[test]
    fn test_unsupported_tlv() {
        let mut parser = parser_with_base();
        let block = tlv(0x7f00, &[]);
        let err = parser
            .parse_signal(SignalId::HEARTBEAT, &block)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedTlv {
                tlv_type: 0x7f00,
                ..
            }
        ));
    }

    #[test]
    fn test_illegal_length() {
        let mut parser = parser_with_base();
        let block = tlv(TlvId::HEARTBEAT_INTERVAL, &[0, 1]);
        let err = parser
            .parse_signal(SignalId::PEER_INITIALIZATION, &block)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalTlvLength {
                tlv_type: TlvId::HEARTBEAT_INTERVAL,
                length: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_tlv() {
        let mut parser = parser_with_base();
        let mut block = tlv(TlvId::HEARTBEAT_INTERVAL, &5000u32.to_be_bytes());
        block.extend_from_slice(&tlv(TlvId::HEARTBEAT_INTERVAL, &5000u32.to_be_bytes()));
        let err = parser
            .parse_signal(SignalId::PEER_INITIALIZATION, &block)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateTlv {
                tlv_type: TlvId::HEARTBEAT_INTERVAL,
                ..
            }
        ));
    }

    #[test]
    fn test_repeated_tlv_chain() {
        let mut parser = parser_with_base();
        let mut block = tlv(TlvId::IPV4_CONPOINT, &[0, 10, 0, 0, 1, 0x03, 0x56]);
        block.extend_from_slice(&tlv(TlvId::IPV4_CONPOINT, &[0, 10, 0, 0, 2, 0x03, 0x56]));
        parser.parse_signal(SignalId::PEER_OFFER, &block).unwrap();

        let first = parser.get_first_value(TlvId::IPV4_CONPOINT).unwrap();
        assert_eq!(parser.value_bytes(first)[1..5], [10, 0, 0, 1]);
        let second = parser.get_next_value(first).unwrap();
        assert_eq!(parser.value_bytes(second)[1..5], [10, 0, 0, 2]);
        assert!(parser.get_next_value(second).is_none());
    }

    #[test]
    fn test_zero_length_tlv() {
        // A TLV declared with min == max == 0 parses with no value bytes.
        let mut parser = SessionParser::new();
        struct ZeroTlv;
        impl Extension for ZeroTlv {
            fn id(&self) -> u16 {
                77
            }
            fn tlv_decls(&self) -> &[TlvDecl] {
                const DECLS: &[TlvDecl] = &[TlvDecl {
                    id: 0x700,
                    length_min: 0,
                    length_max: 0,
                    mandatory_in: &[],
                    repeats_in: &[],
                }];
                DECLS
            }
        }
        parser
            .update_allowed_tlvs(&[&ZeroTlv as &dyn Extension])
            .unwrap();
        let block = tlv(0x700, &[]);
        parser.parse_signal(SignalId::HEARTBEAT, &block).unwrap();
        let value = parser.get_first_value(0x700).unwrap();
        assert_eq!(value.length(), 0);
        assert!(parser.value_bytes(value).is_empty());
    }
}
