//! # tandem-protocol
//!
//! Wire protocol definitions for the tandem matchmaking and signaling relay.
//!
//! This crate defines the messages exchanged between browser clients and the
//! relay: matchmaking commands, pairing events, and the opaque WebRTC
//! signaling envelopes that are forwarded between the two halves of a pair.
//!
//! ## Frame Types
//!
//! - `submit-profile` / `find-partner` / `next-partner` / `disconnect-partner` - Client commands
//! - `waiting` / `paired` / `should-make-offer` / `partner-disconnected` - Matchmaking events
//! - `signal` / `chat-message` - Relayed between partners, never inspected
//! - `connected` / `ping` / `pong` / `error` - Session housekeeping
//!
//! ## Example
//!
//! ```rust
//! use tandem_protocol::{codec, Frame, SignalEnvelope};
//! use serde_json::json;
//!
//! let frame = Frame::signal(SignalEnvelope::Ice(json!({"candidate": "candidate:0 1 UDP"})));
//!
//! // Text frames are plain JSON
//! let text = codec::encode_json(&frame).unwrap();
//! assert_eq!(codec::decode_json(&text).unwrap(), frame);
//!
//! // Binary frames are length-prefixed MessagePack
//! let encoded = codec::encode(&frame).unwrap();
//! assert_eq!(codec::decode(&encoded).unwrap(), frame);
//! ```

pub mod codec;
pub mod frames;
pub mod id;
pub mod profile;
pub mod signal;
pub mod version;

pub use codec::{decode, encode, Encoding, FrameCodec, Payload, ProtocolError};
pub use frames::{Frame, FrameType};
pub use id::ConnectionId;
pub use profile::UserProfile;
pub use signal::SignalEnvelope;
pub use version::{Version, PROTOCOL_VERSION};
