//! Signal writer: builds outbound DLEP signals in a growable buffer.
//!
//! A signal is opened with [`SignalWriter::start_signal`], TLVs are
//! appended, and [`SignalWriter::finish_signal`] patches the real TLV
//! byte count into the header. A failed append or an oversized signal
//! truncates the buffer back to the pre-signal length so no partial
//! signal can ever reach the wire.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use super::error::{Error, Result};
use super::iana::{CONPOINT_FLAG_TLS, TlvId};
use super::tlv::{SIGNAL_HDRLEN, SignalHeader, TlvHeader};
use crate::util::MacAddress;

/// Builder for outbound signals.
///
/// The buffer may hold several finished signals before the runner drains
/// it; TCP write order is buffer order.
#[derive(Debug, Default)]
pub struct SignalWriter {
    out: Vec<u8>,
    /// Offset of the in-progress signal's header, if one is open.
    signal_start: Option<usize>,
    /// Type of the in-progress signal.
    signal_type: u16,
}

impl SignalWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes queued for transmission.
    pub fn data(&self) -> &[u8] {
        &self.out
    }

    /// Queued byte count.
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Drop everything after byte `n`.
    pub fn truncate(&mut self, n: usize) {
        self.out.truncate(n);
    }

    /// Hand the queued bytes to the transport and reset the buffer.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out)
    }

    /// Discard all queued bytes, including any open signal.
    pub fn clear(&mut self) {
        self.out.clear();
        self.signal_start = None;
    }

    /// Type of the signal currently being written.
    pub fn signal_type(&self) -> u16 {
        self.signal_type
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.out
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory("signal buffer"))
    }

    /// Open a new signal. The header length field is patched by
    /// [`finish_signal`](Self::finish_signal).
    pub fn start_signal(&mut self, signal_type: u16) -> Result<()> {
        if self.signal_start.is_some() {
            return Err(Error::InternalError(
                "started signal while another is open".into(),
            ));
        }
        self.reserve(SIGNAL_HDRLEN)?;
        self.signal_start = Some(self.out.len());
        self.signal_type = signal_type;
        self.out
            .extend_from_slice(SignalHeader::new(signal_type, 0).as_bytes());
        Ok(())
    }

    /// Append one `<type, len, value>` element to the open signal.
    pub fn add_tlv(&mut self, tlv_type: u16, value: &[u8]) -> Result<()> {
        if value.len() > u16::MAX as usize {
            return Err(Error::InternalError(format!(
                "TLV {tlv_type} value of {} bytes exceeds u16",
                value.len()
            )));
        }
        self.reserve(super::tlv::TLV_HDRLEN + value.len())?;
        self.out
            .extend_from_slice(TlvHeader::new(tlv_type, value.len()).as_bytes());
        self.out.extend_from_slice(value);
        Ok(())
    }

    /// Close the open signal: patch the TLV byte count into the header.
    ///
    /// A signal whose TLV block exceeds `u16::MAX` is abandoned, the
    /// buffer truncated, and the session must terminate.
    pub fn finish_signal(&mut self) -> Result<()> {
        let start = self
            .signal_start
            .take()
            .ok_or_else(|| Error::InternalError("finished signal without start".into()))?;

        let tlv_len = self.out.len() - start - SIGNAL_HDRLEN;
        if tlv_len > u16::MAX as usize {
            self.out.truncate(start);
            return Err(Error::InternalError(format!(
                "signal {} with {tlv_len} TLV bytes exceeds u16",
                self.signal_type
            )));
        }

        let len_bytes = (tlv_len as u16).to_be_bytes();
        self.out[start + 2] = len_bytes[0];
        self.out[start + 3] = len_bytes[1];
        Ok(())
    }

    /// Abandon the open signal and truncate back to the pre-signal length.
    pub fn abort_signal(&mut self) {
        if let Some(start) = self.signal_start.take() {
            self.out.truncate(start);
        }
    }

    // Typed TLV writers.

    /// Heartbeat interval, u32 milliseconds.
    pub fn add_heartbeat_tlv(&mut self, interval: Duration) -> Result<()> {
        let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        self.add_tlv(TlvId::HEARTBEAT_INTERVAL, &millis.to_be_bytes())
    }

    /// EUI-48 destination address.
    pub fn add_mac_tlv(&mut self, mac: &MacAddress) -> Result<()> {
        self.add_tlv(TlvId::MAC_ADDRESS, &mac.octets())
    }

    /// Free-form peer description.
    pub fn add_peer_type_tlv(&mut self, peer_type: &str) -> Result<()> {
        self.add_tlv(TlvId::PEER_TYPE, peer_type.as_bytes())
    }

    /// Status code plus optional UTF-8 text.
    pub fn add_status_tlv(&mut self, status: u8, text: &str) -> Result<()> {
        let mut value = Vec::with_capacity(1 + text.len());
        value.push(status);
        value.extend_from_slice(text.as_bytes());
        self.add_tlv(TlvId::STATUS, &value)
    }

    /// IPv4 connection point: flags, address, port.
    pub fn add_ipv4_conpoint_tlv(&mut self, addr: Ipv4Addr, port: u16, tls: bool) -> Result<()> {
        let mut value = [0u8; 7];
        value[0] = if tls { CONPOINT_FLAG_TLS } else { 0 };
        value[1..5].copy_from_slice(&addr.octets());
        value[5..7].copy_from_slice(&port.to_be_bytes());
        self.add_tlv(TlvId::IPV4_CONPOINT, &value)
    }

    /// IPv6 connection point: flags, address, port.
    pub fn add_ipv6_conpoint_tlv(&mut self, addr: Ipv6Addr, port: u16, tls: bool) -> Result<()> {
        let mut value = [0u8; 19];
        value[0] = if tls { CONPOINT_FLAG_TLS } else { 0 };
        value[1..17].copy_from_slice(&addr.octets());
        value[17..19].copy_from_slice(&port.to_be_bytes());
        self.add_tlv(TlvId::IPV6_CONPOINT, &value)
    }

    /// List of supported extension ids.
    pub fn add_supported_extensions(&mut self, ids: &[u16]) -> Result<()> {
        let mut value = Vec::with_capacity(ids.len() * 2);
        for id in ids {
            value.extend_from_slice(&id.to_be_bytes());
        }
        self.add_tlv(TlvId::EXTENSIONS_SUPPORTED, &value)
    }

    /// 8-byte metric (datarates, latency).
    pub fn add_u64_tlv(&mut self, tlv_type: u16, value: u64) -> Result<()> {
        self.add_tlv(tlv_type, &value.to_be_bytes())
    }

    /// 1-byte metric (resources, link quality).
    pub fn add_u8_tlv(&mut self, tlv_type: u16, value: u8) -> Result<()> {
        self.add_tlv(tlv_type, &[value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::iana::SignalId;

    #[test]
    fn test_empty_signal() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::HEARTBEAT).unwrap();
        w.finish_signal().unwrap();
        assert_eq!(w.data(), &[0x00, 0x0e, 0x00, 0x00]);
    }

    #[test]
    fn test_length_fixup() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::PEER_INITIALIZATION).unwrap();
        w.add_heartbeat_tlv(Duration::from_millis(5000)).unwrap();
        w.finish_signal().unwrap();

        // 8 TLV bytes: 4 header + 4 value
        assert_eq!(w.data()[2..4], [0x00, 0x08]);
        assert_eq!(w.data().len(), SIGNAL_HDRLEN + 8);
        // 5000 ms big-endian
        assert_eq!(&w.data()[8..12], &5000u32.to_be_bytes());
    }

    #[test]
    fn test_two_signals_back_to_back() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::HEARTBEAT).unwrap();
        w.finish_signal().unwrap();
        w.start_signal(SignalId::HEARTBEAT).unwrap();
        w.finish_signal().unwrap();
        assert_eq!(w.len(), 2 * SIGNAL_HDRLEN);
    }

    #[test]
    fn test_abort_restores_buffer() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::HEARTBEAT).unwrap();
        w.finish_signal().unwrap();
        let before = w.len();

        w.start_signal(SignalId::DESTINATION_UP).unwrap();
        w.add_mac_tlv(&MacAddress::new([1, 2, 3, 4, 5, 6])).unwrap();
        w.abort_signal();
        assert_eq!(w.len(), before);
    }

    #[test]
    fn test_oversized_signal_rejected() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::PEER_UPDATE).unwrap();
        // 17 TLVs of 4096 value bytes each push the block past u16::MAX.
        let chunk = vec![0u8; 4096];
        for _ in 0..17 {
            w.add_tlv(TlvId::PEER_TYPE, &chunk).unwrap();
        }
        let err = w.finish_signal().unwrap_err();
        assert!(matches!(err, Error::InternalError(_)));
        assert!(w.is_empty());
    }

    #[test]
    fn test_conpoint_layout() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::PEER_OFFER).unwrap();
        w.add_ipv4_conpoint_tlv(Ipv4Addr::new(10, 0, 0, 1), 854, false)
            .unwrap();
        w.finish_signal().unwrap();

        let tlvs = &w.data()[SIGNAL_HDRLEN..];
        assert_eq!(&tlvs[..4], &[0x00, 0x02, 0x00, 0x07]);
        assert_eq!(tlvs[4], 0x00); // no TLS
        assert_eq!(&tlvs[5..9], &[10, 0, 0, 1]);
        assert_eq!(&tlvs[9..11], &854u16.to_be_bytes());
    }

    #[test]
    fn test_nested_start_is_error() {
        let mut w = SignalWriter::new();
        w.start_signal(SignalId::HEARTBEAT).unwrap();
        assert!(w.start_signal(SignalId::HEARTBEAT).is_err());
    }
}
