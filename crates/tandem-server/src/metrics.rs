//! Metrics collection and export.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tandem_core::SwitchboardStats;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "tandem_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "tandem_connections_active";
    pub const CONNECTIONS_REFUSED: &str = "tandem_connections_refused_total";
    pub const FRAMES_TOTAL: &str = "tandem_frames_total";
    pub const FRAMES_BYTES: &str = "tandem_frames_bytes";
    pub const SIGNALS_RELAYED: &str = "tandem_signals_relayed_total";
    pub const SIGNALS_DROPPED: &str = "tandem_signals_dropped_total";
    pub const MATCHES_TOTAL: &str = "tandem_matches_total";
    pub const CLEANUPS_TOTAL: &str = "tandem_cleanups_total";
    pub const WAITING: &str = "tandem_waiting";
    pub const PAIRS_ACTIVE: &str = "tandem_pairs_active";
    pub const WAIT_SECONDS: &str = "tandem_wait_seconds";
    pub const SESSION_SECONDS: &str = "tandem_session_seconds";
    pub const ERRORS_TOTAL: &str = "tandem_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of active connections"
    );
    metrics::describe_counter!(
        names::CONNECTIONS_REFUSED,
        "Connections refused at the connection limit"
    );
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames processed");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames processed");
    metrics::describe_counter!(
        names::SIGNALS_RELAYED,
        "Signaling envelopes delivered to a partner"
    );
    metrics::describe_counter!(
        names::SIGNALS_DROPPED,
        "Signaling envelopes dropped because the sender had no partner"
    );
    metrics::describe_counter!(names::MATCHES_TOTAL, "Total number of pairs formed");
    metrics::describe_counter!(names::CLEANUPS_TOTAL, "Cleanups by reason");
    metrics::describe_gauge!(names::WAITING, "Connections in the waiting pool");
    metrics::describe_gauge!(names::PAIRS_ACTIVE, "Current number of active pairs");
    metrics::describe_histogram!(
        names::WAIT_SECONDS,
        "Time a connection waited in the pool before being paired"
    );
    metrics::describe_histogram!(names::SESSION_SECONDS, "Lifetime of closed connections");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a disconnection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a connection refused at capacity.
pub fn record_refused() {
    counter!(names::CONNECTIONS_REFUSED).increment(1);
}

/// Record a frame.
pub fn record_frame(bytes: usize, direction: &'static str) {
    counter!(names::FRAMES_TOTAL, "direction" => direction).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Record the fate of a relayed signal.
pub fn record_signal(delivered: bool) {
    if delivered {
        counter!(names::SIGNALS_RELAYED).increment(1);
    } else {
        counter!(names::SIGNALS_DROPPED).increment(1);
    }
}

/// Record a new pair and how long the waiting side waited.
pub fn record_match(waited: Duration) {
    counter!(names::MATCHES_TOTAL).increment(1);
    histogram!(names::WAIT_SECONDS).record(waited.as_secs_f64());
}

/// Record how long a closed connection lived.
pub fn record_session(connected_for: Duration) {
    histogram!(names::SESSION_SECONDS).record(connected_for.as_secs_f64());
}

/// Record a cleanup.
pub fn record_cleanup(reason: &'static str) {
    counter!(names::CLEANUPS_TOTAL, "reason" => reason).increment(1);
}

/// Publish matchmaking gauges.
pub fn set_matchmaking(stats: &SwitchboardStats) {
    gauge!(names::WAITING).set(stats.waiting as f64);
    gauge!(names::PAIRS_ACTIVE).set(stats.pairs as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that records disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}
