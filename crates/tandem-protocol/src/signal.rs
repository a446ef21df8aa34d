//! WebRTC signaling envelopes.
//!
//! The relay forwards envelopes between partners without looking inside.
//! Negotiation (offers, answers, rollback) is entirely a client concern.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque signaling message.
///
/// Encoded as `{"kind": "sdp" | "ice", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum SignalEnvelope {
    /// A session description (offer, answer, rollback...).
    Sdp(Value),
    /// A single ICE candidate.
    Ice(Value),
}

impl SignalEnvelope {
    /// The envelope kind as it appears on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SignalEnvelope::Sdp(_) => "sdp",
            SignalEnvelope::Ice(_) => "ice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let envelope = SignalEnvelope::Sdp(json!({"type": "offer", "sdp": "v=0"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({"kind": "sdp", "payload": {"type": "offer", "sdp": "v=0"}})
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<SignalEnvelope, _> =
            serde_json::from_value(json!({"kind": "media", "payload": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_payload_is_rejected() {
        let result: Result<SignalEnvelope, _> = serde_json::from_value(json!({"kind": "ice"}));
        assert!(result.is_err());
    }
}
