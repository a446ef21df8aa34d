//! Per-connection records.

use std::time::Instant;
use tandem_protocol::{ConnectionId, Frame, UserProfile};
use tokio::sync::mpsc;
use tracing::trace;

/// Outbound frame queue of one connection.
///
/// The transport task owns the receiving end and writes frames to the
/// socket in the order they were queued.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl Outbox {
    /// Create an outbox and the receiver the transport task drains.
    #[must_use]
    pub fn channel(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    /// Queue a frame. Returns `false` if the transport task is gone.
    pub fn deliver(&self, frame: Frame) -> bool {
        match self.tx.send(frame) {
            Ok(()) => true,
            Err(mpsc::error::SendError(frame)) => {
                trace!(connection = %self.id, frame_type = ?frame.frame_type(), "Outbox closed, frame dropped");
                false
            }
        }
    }
}

/// State the lifecycle manager keeps for a live connection.
#[derive(Debug)]
pub struct Session {
    /// Profile submitted by the client, if any.
    pub profile: Option<UserProfile>,
    /// Where frames for this connection go.
    pub outbox: Outbox,
    /// When the connection was registered.
    pub connected_at: Instant,
}

impl Session {
    /// Create a session without a profile.
    #[must_use]
    pub fn new(outbox: Outbox) -> Self {
        Self {
            profile: None,
            outbox,
            connected_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_preserves_order() {
        let (outbox, mut rx) = Outbox::channel(ConnectionId::new(1));
        assert!(outbox.deliver(Frame::Waiting));
        assert!(outbox.deliver(Frame::Paired));

        assert_eq!(rx.try_recv().unwrap(), Frame::Waiting);
        assert_eq!(rx.try_recv().unwrap(), Frame::Paired);
    }

    #[test]
    fn test_deliver_after_receiver_dropped() {
        let (outbox, rx) = Outbox::channel(ConnectionId::new(1));
        drop(rx);
        assert!(!outbox.deliver(Frame::Paired));
    }
}
