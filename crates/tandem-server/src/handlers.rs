//! Connection handlers for the tandem server.
//!
//! This module handles the WebSocket connection lifecycle and dispatches
//! client frames to the switchboard.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::BytesMut;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tandem_core::{CleanupOutcome, MatchOutcome, Switchboard};
use tandem_protocol::frames::codes;
use tandem_protocol::{
    codec, ConnectionId, Encoding, Frame, FrameCodec, Payload, ProtocolError, PROTOCOL_VERSION,
};
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// Shared server state.
pub struct AppState {
    /// The connection lifecycle manager.
    pub switchboard: Switchboard,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            switchboard: Switchboard::with_config(config.switchboard_config()),
            config,
        }
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.config.transport.websocket_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    spawn_stats_ticker(Arc::clone(&state));

    // Bind and serve
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("tandem server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tandem server stopped");
    Ok(())
}

/// Serve on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Log matchmaking stats and refresh the gauges periodically.
fn spawn_stats_ticker(state: Arc<AppState>) {
    let interval_ms = state.config.stats.interval_ms;
    if interval_ms == 0 {
        return;
    }

    tokio::spawn(async move {
        let period = std::time::Duration::from_millis(interval_ms);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            interval.tick().await;
            let stats = state.switchboard.stats();
            metrics::set_matchmaking(&stats);
            info!(
                waiting = stats.waiting,
                pairs = stats.pairs,
                connections = stats.connections,
                "Matchmaking stats"
            );
        }
    });
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.switchboard.stats();
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION.to_string(),
        "connections": stats.connections,
        "waiting": stats.waiting,
        "pairs": stats.pairs,
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut codec = FrameCodec::new();

    let (connection_id, mut outbox) = match state.switchboard.connect() {
        Ok(registered) => registered,
        Err(e) => {
            warn!(error = %e, "Refusing connection");
            metrics::record_refused();
            let refusal = Frame::error(codes::CAPACITY_REACHED, e.to_string());
            let _ = send_frame(&mut sender, &codec, &refusal).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let _metrics_guard = ConnectionMetricsGuard::new();
    debug!(connection = %connection_id, "WebSocket connected");

    let heartbeat = &state.config.heartbeat;
    let connected = Frame::connected(
        connection_id,
        PROTOCOL_VERSION,
        u32::try_from(heartbeat.interval_ms).unwrap_or(u32::MAX),
    );
    if send_frame(&mut sender, &codec, &connected).await.is_err() {
        error!(connection = %connection_id, "Failed to send Connected frame");
        finish(&state, connection_id);
        return;
    }

    // Read buffer for length-prefixed binary frames
    let mut read_buffer = BytesMut::with_capacity(4096);

    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + heartbeat.interval(),
        heartbeat.interval(),
    );
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            biased;

            // Frames queued by the switchboard for this connection
            Some(frame) = outbox.recv() => {
                if send_frame(&mut sender, &codec, &frame).await.is_err() {
                    debug!(connection = %connection_id, "Send failed");
                    break;
                }
            }

            msg = receiver.next() => {
                last_seen = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics::record_frame(text.len(), "inbound");
                        codec.set_encoding(Encoding::Json);
                        match codec::decode_json(&text) {
                            Ok(frame) => {
                                if handle_frame(frame, connection_id, &state, &mut sender, &codec).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => malformed(connection_id, &e),
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        metrics::record_frame(data.len(), "inbound");
                        codec.set_encoding(Encoding::MessagePack);
                        read_buffer.extend_from_slice(&data);

                        let mut failed = false;
                        loop {
                            match codec::decode_from(&mut read_buffer) {
                                Ok(Some(frame)) => {
                                    if handle_frame(frame, connection_id, &state, &mut sender, &codec).await.is_err() {
                                        failed = true;
                                        break;
                                    }
                                }
                                Ok(None) => break,
                                Err(e @ ProtocolError::FrameTooLarge(_)) => {
                                    // The length prefix is unusable, so nothing after it can be framed.
                                    malformed(connection_id, &e);
                                    read_buffer.clear();
                                    break;
                                }
                                Err(e) => malformed(connection_id, &e),
                            }
                        }
                        if failed {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if last_seen.elapsed() > heartbeat.timeout() {
                    info!(connection = %connection_id, "Heartbeat timeout");
                    metrics::record_error("heartbeat_timeout");
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    finish(&state, connection_id);
    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Route a transport disconnect through the switchboard's cleanup path.
fn finish(state: &AppState, connection_id: ConnectionId) {
    let outcome = state.switchboard.disconnect(connection_id);
    if let Some(connected_for) = outcome.connected_for {
        metrics::record_session(connected_for);
    }
    record_cleanup("disconnect", &outcome, state);
}

fn record_cleanup(reason: &'static str, outcome: &CleanupOutcome, state: &AppState) {
    metrics::record_cleanup(reason);
    if let Some(MatchOutcome::Paired { waited, .. }) = &outcome.rematch {
        metrics::record_match(*waited);
    }
    metrics::set_matchmaking(&state.switchboard.stats());
}

fn malformed(connection_id: ConnectionId, error: &ProtocolError) {
    warn!(connection = %connection_id, error = %error, "Dropping malformed frame");
    metrics::record_error("malformed");
}

/// Handle a decoded frame.
///
/// Only transport failures are returned as errors; everything the client
/// can get wrong is logged and dropped.
async fn handle_frame(
    frame: Frame,
    connection_id: ConnectionId,
    state: &AppState,
    sender: &mut WsSender,
    codec: &FrameCodec,
) -> Result<()> {
    let frame_type = frame.frame_type();
    if !frame_type.is_client_frame() {
        warn!(connection = %connection_id, frame_type = ?frame_type, "Dropping server-only frame");
        metrics::record_error("server_frame");
        return Ok(());
    }

    let switchboard = &state.switchboard;

    match frame {
        Frame::SubmitProfile { profile } => {
            if let Err(e) = switchboard.submit_profile(connection_id, profile) {
                warn!(connection = %connection_id, error = %e, "Profile dropped");
                metrics::record_error("profile_rejected");
            }
        }

        Frame::FindPartner => {
            debug!(connection = %connection_id, "Find partner");
            match switchboard.find_partner(connection_id) {
                Ok(MatchOutcome::Paired { waited, .. }) => metrics::record_match(waited),
                Ok(MatchOutcome::Waiting) => {}
                Err(e) => debug!(connection = %connection_id, error = %e, "Find partner ignored"),
            }
            metrics::set_matchmaking(&switchboard.stats());
        }

        Frame::NextPartner => {
            debug!(connection = %connection_id, "Next partner");
            let outcome = switchboard.next_partner(connection_id);
            record_cleanup("next-partner", &outcome, state);
        }

        Frame::DisconnectPartner => {
            debug!(connection = %connection_id, "Disconnect partner");
            let outcome = switchboard.unpair(connection_id);
            record_cleanup("explicit-unpair", &outcome, state);
        }

        Frame::Signal { signal } => {
            let kind = signal.kind();
            let outcome = switchboard.relay_signal(connection_id, signal);
            trace!(connection = %connection_id, kind, delivered = outcome.is_delivered(), "Signal");
            metrics::record_signal(outcome.is_delivered());
        }

        Frame::ChatMessage { text } => match switchboard.relay_chat(connection_id, text) {
            Ok(outcome) => {
                trace!(connection = %connection_id, delivered = outcome.is_delivered(), "Chat message");
            }
            Err(e) => {
                warn!(connection = %connection_id, error = %e, "Chat message dropped");
                metrics::record_error("chat_rejected");
            }
        },

        Frame::Ping { timestamp } => {
            send_frame(sender, codec, &Frame::pong(timestamp)).await?;
        }

        Frame::Pong { .. } => {}

        // Server-only frames were dropped above.
        _ => {}
    }

    Ok(())
}

/// Send a frame to the WebSocket in the connection's current encoding.
async fn send_frame(sender: &mut WsSender, codec: &FrameCodec, frame: &Frame) -> Result<()> {
    let payload = codec.encode(frame)?;
    metrics::record_frame(payload.len(), "outbound");
    let message = match payload {
        Payload::Text(text) => Message::Text(text),
        Payload::Binary(data) => Message::Binary(data.to_vec()),
    };
    sender.send(message).await?;
    Ok(())
}
