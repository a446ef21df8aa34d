//! # Tandem Server
//!
//! WebSocket front end for the tandem matchmaker and signaling relay.
//!
//! The binary wires [`config::Config`] to [`handlers::run_server`]; the
//! library surface exists so the server can be started on an ephemeral
//! port from integration tests.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{router, run_server, serve, AppState};
