//! # tandem-core
//!
//! Matchmaking and signaling relay for one-to-one video calls.
//!
//! This crate provides the building blocks:
//!
//! - **Matchmaker** - FIFO waiting pool with interest-based partner preference
//! - **PairTable** - Symmetric record of who is talking to whom
//! - **Relay** - Forwards opaque signaling envelopes to the current partner
//! - **Switchboard** - Owns connections and the single cleanup path
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Connection │────▶│  Switchboard │────▶│ Matchmaker  │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!        ▲                   │              pool + pairs
//!        │                   ▼
//!        │            ┌─────────────┐
//!        └────────────│    Relay    │
//!          outbox     └─────────────┘
//! ```

pub mod matchmaker;
pub mod pair_table;
pub mod pool;
pub mod relay;
pub mod session;
pub mod switchboard;

pub use matchmaker::{compatibility, ConnectionState, MatchOutcome, Matchmaker};
pub use pair_table::PairTable;
pub use pool::{WaitingEntry, WaitingPool};
pub use relay::{is_impolite, RelayOutcome};
pub use session::{Outbox, Session};
pub use switchboard::{
    CleanupOutcome, CleanupReason, Switchboard, SwitchboardConfig, SwitchboardError,
    SwitchboardStats,
};
