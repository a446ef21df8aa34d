//! Frame types for the tandem protocol.
//!
//! Frames are the unit of communication between a client and the relay.
//! Each frame is a JSON object (or its MessagePack equivalent) tagged by
//! `"type"`. Inbound and outbound frames share one enum; a few variants
//! travel in both directions.

use crate::id::ConnectionId;
use crate::profile::UserProfile;
use crate::signal::SignalEnvelope;
use serde::{Deserialize, Serialize};

/// Error codes carried by [`Frame::Error`].
pub mod codes {
    /// The server is at its connection limit.
    pub const CAPACITY_REACHED: u16 = 1013;
}

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    SubmitProfile,
    FindPartner,
    NextPartner,
    DisconnectPartner,
    Signal,
    ChatMessage,
    Waiting,
    Paired,
    ShouldMakeOffer,
    PartnerDisconnected,
    Connected,
    Ping,
    Pong,
    Error,
}

impl FrameType {
    /// Whether clients are allowed to send this frame type.
    #[must_use]
    pub fn is_client_frame(self) -> bool {
        matches!(
            self,
            FrameType::SubmitProfile
                | FrameType::FindPartner
                | FrameType::NextPartner
                | FrameType::DisconnectPartner
                | FrameType::Signal
                | FrameType::ChatMessage
                | FrameType::Ping
                | FrameType::Pong
        )
    }
}

/// A protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Frame {
    /// Store or overwrite the profile for this connection.
    SubmitProfile {
        /// The submitted profile.
        profile: UserProfile,
    },

    /// Ask the matchmaker for a partner.
    FindPartner,

    /// Drop the current partner and immediately look for another.
    NextPartner,

    /// Drop the current partner and stay idle.
    DisconnectPartner,

    /// Opaque signaling envelope, relayed to the partner unchanged.
    Signal {
        /// The envelope.
        signal: SignalEnvelope,
    },

    /// Text chat, relayed to the partner unchanged.
    ChatMessage {
        /// Message text.
        text: String,
    },

    /// The connection was placed in the waiting pool.
    Waiting,

    /// The connection was just paired.
    Paired,

    /// Perfect-negotiation role for the current pair.
    ShouldMakeOffer {
        /// `true` for the impolite side, which sends the first offer.
        offer: bool,
    },

    /// The partner left; the connection is idle again.
    PartnerDisconnected,

    /// Connection established response.
    Connected {
        /// Identifier assigned to this connection.
        #[serde(rename = "connectionId")]
        connection_id: ConnectionId,
        /// Protocol version spoken by the server.
        version: String,
        /// Recommended heartbeat interval in milliseconds.
        heartbeat: u32,
    },

    /// Keepalive ping.
    Ping {
        /// Optional timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Keepalive pong.
    Pong {
        /// Echoed timestamp from ping.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<u64>,
    },

    /// Error response.
    Error {
        /// Error code.
        code: u16,
        /// Human-readable error message.
        message: String,
    },
}

impl Frame {
    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::SubmitProfile { .. } => FrameType::SubmitProfile,
            Frame::FindPartner => FrameType::FindPartner,
            Frame::NextPartner => FrameType::NextPartner,
            Frame::DisconnectPartner => FrameType::DisconnectPartner,
            Frame::Signal { .. } => FrameType::Signal,
            Frame::ChatMessage { .. } => FrameType::ChatMessage,
            Frame::Waiting => FrameType::Waiting,
            Frame::Paired => FrameType::Paired,
            Frame::ShouldMakeOffer { .. } => FrameType::ShouldMakeOffer,
            Frame::PartnerDisconnected => FrameType::PartnerDisconnected,
            Frame::Connected { .. } => FrameType::Connected,
            Frame::Ping { .. } => FrameType::Ping,
            Frame::Pong { .. } => FrameType::Pong,
            Frame::Error { .. } => FrameType::Error,
        }
    }

    /// Create a new SubmitProfile frame.
    #[must_use]
    pub fn submit_profile(profile: UserProfile) -> Self {
        Frame::SubmitProfile { profile }
    }

    /// Create a new Signal frame.
    #[must_use]
    pub fn signal(signal: SignalEnvelope) -> Self {
        Frame::Signal { signal }
    }

    /// Create a new ChatMessage frame.
    #[must_use]
    pub fn chat(text: impl Into<String>) -> Self {
        Frame::ChatMessage { text: text.into() }
    }

    /// Create a new ShouldMakeOffer frame.
    #[must_use]
    pub fn should_make_offer(offer: bool) -> Self {
        Frame::ShouldMakeOffer { offer }
    }

    /// Create a new Connected frame.
    #[must_use]
    pub fn connected(connection_id: ConnectionId, version: impl ToString, heartbeat: u32) -> Self {
        Frame::Connected {
            connection_id,
            version: version.to_string(),
            heartbeat,
        }
    }

    /// Create a new Ping frame.
    #[must_use]
    pub fn ping() -> Self {
        Frame::Ping { timestamp: None }
    }

    /// Create a new Pong frame.
    #[must_use]
    pub fn pong(timestamp: Option<u64>) -> Self {
        Frame::Pong { timestamp }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Frame::Error {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_type() {
        assert_eq!(Frame::FindPartner.frame_type(), FrameType::FindPartner);
        assert_eq!(Frame::chat("hi").frame_type(), FrameType::ChatMessage);
        assert!(FrameType::Signal.is_client_frame());
        assert!(!FrameType::Paired.is_client_frame());
    }

    #[test]
    fn test_command_names_are_kebab_case() {
        let frame: Frame = serde_json::from_value(json!({"type": "disconnect-partner"})).unwrap();
        assert_eq!(frame, Frame::DisconnectPartner);

        let value = serde_json::to_value(Frame::PartnerDisconnected).unwrap();
        assert_eq!(value, json!({"type": "partner-disconnected"}));
    }

    #[test]
    fn test_signal_frame_shape() {
        let value = json!({
            "type": "signal",
            "signal": {"kind": "ice", "payload": {"candidate": "candidate:1", "sdpMid": "0"}}
        });
        let frame: Frame = serde_json::from_value(value.clone()).unwrap();
        match &frame {
            Frame::Signal { signal } => assert_eq!(signal.kind(), "ice"),
            other => panic!("Expected Signal, got {:?}", other),
        }
        assert_eq!(serde_json::to_value(&frame).unwrap(), value);
    }

    #[test]
    fn test_connected_uses_camel_case_id() {
        let frame = Frame::connected(ConnectionId::new(7), "1.0", 30_000);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["connectionId"], json!(7));
        assert_eq!(value["type"], json!("connected"));
    }

    #[test]
    fn test_signal_without_envelope_is_rejected() {
        let result: Result<Frame, _> = serde_json::from_value(json!({"type": "signal"}));
        assert!(result.is_err());
    }
}
