//! Session configuration record.

use std::time::Duration;

/// Configuration of one DLEP session, copied in at session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Free-form peer description, sent in the optional PEER_TYPE TLV.
    /// Empty string suppresses the TLV.
    pub peer_type: String,
    /// Router-side discovery period.
    pub discovery_interval: Duration,
    /// Local heartbeat emission period; also the base of the
    /// per-destination ack timeout.
    pub heartbeat_interval: Duration,
    /// Radio mirrors direct layer-2 neighbors.
    pub send_neighbors: bool,
    /// Radio mirrors proxied layer-2 destinations.
    pub send_proxied: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            peer_type: String::new(),
            discovery_interval: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(5),
            send_neighbors: true,
            send_proxied: false,
        }
    }
}

impl SessionConfig {
    /// Per-destination acknowledgment timeout: twice the heartbeat
    /// interval.
    pub fn ack_timeout(&self) -> Duration {
        self.heartbeat_interval * 2
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_interval.is_zero() {
            return Err("heartbeat interval must not be zero".into());
        }
        if self.discovery_interval.is_zero() {
            return Err("discovery interval must not be zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_timeout_is_twice_heartbeat() {
        let cfg = SessionConfig {
            heartbeat_interval: Duration::from_millis(5000),
            ..Default::default()
        };
        assert_eq!(cfg.ack_timeout(), Duration::from_millis(10000));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let cfg = SessionConfig {
            heartbeat_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(SessionConfig::default().validate().is_ok());
    }
}
