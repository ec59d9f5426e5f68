//! Typed extractors over parsed TLV values.
//!
//! All functions operate on the value table of the most recently parsed
//! signal; the parser has already enforced the declared length ranges,
//! so the fixed-size conversions here only fail on internal
//! inconsistencies.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use super::error::{Error, Result};
use super::iana::{CONPOINT_FLAG_TLS, StatusCode, TlvId};
use super::parser::{ParserValue, SessionParser};
use crate::l2::Layer2Data;
use crate::util::MacAddress;

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::InternalError(format!("TLV value of {} bytes, wanted {N}", bytes.len())))
}

/// Heartbeat interval TLV: u32 milliseconds.
pub fn heartbeat_interval(parser: &SessionParser) -> Result<Duration> {
    let value = parser
        .get_first_value(TlvId::HEARTBEAT_INTERVAL)
        .ok_or(Error::MissingMandatoryTlv {
            tlv_type: TlvId::HEARTBEAT_INTERVAL,
            signal: parser.signal_type(),
        })?;
    let millis = u32::from_be_bytes(fixed::<4>(parser.value_bytes(value))?);
    Ok(Duration::from_millis(u64::from(millis)))
}

/// MAC address TLV.
pub fn mac_address(parser: &SessionParser) -> Result<MacAddress> {
    let value = parser
        .get_first_value(TlvId::MAC_ADDRESS)
        .ok_or(Error::MissingMandatoryTlv {
            tlv_type: TlvId::MAC_ADDRESS,
            signal: parser.signal_type(),
        })?;
    Ok(MacAddress::new(fixed::<6>(parser.value_bytes(value))?))
}

/// Status TLV: code and text. Absent TLV reads as SUCCESS.
pub fn status(parser: &SessionParser) -> Result<(u8, String)> {
    let Some(value) = parser.get_first_value(TlvId::STATUS) else {
        return Ok((StatusCode::SUCCESS, String::new()));
    };
    let bytes = parser.value_bytes(value);
    let code = bytes[0];
    let text = String::from_utf8_lossy(&bytes[1..]).into_owned();
    Ok((code, text))
}

/// Peer type TLV, if present.
pub fn peer_type(parser: &SessionParser) -> Option<String> {
    let value = parser.get_first_value(TlvId::PEER_TYPE)?;
    Some(String::from_utf8_lossy(parser.value_bytes(value)).into_owned())
}

/// Extensions-supported TLV: list of u16 ids. Absent TLV reads as empty.
pub fn extension_ids(parser: &SessionParser) -> Result<Vec<u16>> {
    let Some(value) = parser.get_first_value(TlvId::EXTENSIONS_SUPPORTED) else {
        return Ok(Vec::new());
    };
    let bytes = parser.value_bytes(value);
    if bytes.len() % 2 != 0 {
        return Err(Error::InternalError(format!(
            "extension list of {} bytes is not a sequence of u16 ids",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// One IPv4 connection point value: address, port, TLS flag.
pub fn ipv4_conpoint(parser: &SessionParser, value: &ParserValue) -> Result<(Ipv4Addr, u16, bool)> {
    let bytes = fixed::<7>(parser.value_bytes(value))?;
    let tls = bytes[0] & CONPOINT_FLAG_TLS != 0;
    let addr = Ipv4Addr::new(bytes[1], bytes[2], bytes[3], bytes[4]);
    let port = u16::from_be_bytes([bytes[5], bytes[6]]);
    Ok((addr, port, tls))
}

/// One IPv6 connection point value: address, port, TLS flag.
pub fn ipv6_conpoint(parser: &SessionParser, value: &ParserValue) -> Result<(Ipv6Addr, u16, bool)> {
    let bytes = fixed::<19>(parser.value_bytes(value))?;
    let tls = bytes[0] & CONPOINT_FLAG_TLS != 0;
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&bytes[1..17]);
    let port = u16::from_be_bytes([bytes[17], bytes[18]]);
    Ok((Ipv6Addr::from(octets), port, tls))
}

fn metric_u64(parser: &SessionParser, tlv_type: u16) -> Result<Option<u64>> {
    match parser.get_first_value(tlv_type) {
        Some(value) => Ok(Some(u64::from_be_bytes(fixed::<8>(
            parser.value_bytes(value),
        )?))),
        None => Ok(None),
    }
}

fn metric_u8(parser: &SessionParser, tlv_type: u16) -> Result<Option<u8>> {
    match parser.get_first_value(tlv_type) {
        Some(value) => Ok(Some(parser.value_bytes(value)[0])),
        None => Ok(None),
    }
}

/// Fold every metric TLV of the parsed signal into a layer-2 data
/// record. TLVs not present leave the corresponding field untouched.
pub fn map_l2_data(parser: &SessionParser, data: &mut Layer2Data) -> Result<()> {
    if let Some(v) = metric_u64(parser, TlvId::MDRR)? {
        data.max_rx_bitrate = Some(v);
    }
    if let Some(v) = metric_u64(parser, TlvId::MDRT)? {
        data.max_tx_bitrate = Some(v);
    }
    if let Some(v) = metric_u64(parser, TlvId::CDRR)? {
        data.cur_rx_bitrate = Some(v);
    }
    if let Some(v) = metric_u64(parser, TlvId::CDRT)? {
        data.cur_tx_bitrate = Some(v);
    }
    if let Some(v) = metric_u64(parser, TlvId::LATENCY)? {
        data.latency = Some(v);
    }
    if let Some(v) = metric_u8(parser, TlvId::RESOURCES)? {
        data.resources = Some(v);
    }
    if let Some(v) = metric_u8(parser, TlvId::RLQR)? {
        data.rx_link_quality = Some(v);
    }
    if let Some(v) = metric_u8(parser, TlvId::RLQT)? {
        data.tx_link_quality = Some(v);
    }
    Ok(())
}
