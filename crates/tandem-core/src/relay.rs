//! Forwarding between the two halves of a pair.
//!
//! Delivery is always keyed through the pair table at the moment a frame is
//! relayed. Nothing holds a long-lived reference to a partner, so a frame
//! sent after the pair broke can never reach the former partner.

use crate::pair_table::PairTable;
use crate::session::Session;
use dashmap::DashMap;
use tandem_protocol::{ConnectionId, Frame};
use tracing::trace;

/// Result of relaying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued on the partner's outbox.
    Delivered(ConnectionId),
    /// The sender had no partner, or the partner's transport is gone.
    Dropped,
}

impl RelayOutcome {
    /// Whether the frame reached a partner's outbox.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayOutcome::Delivered(_))
    }
}

/// Whether `me` takes the impolite role towards `partner`.
///
/// The impolite peer sends the first offer and ignores colliding offers;
/// the polite peer rolls back. Both ends compute this from the same two ids
/// and always reach opposite answers.
#[must_use]
pub fn is_impolite(me: ConnectionId, partner: ConnectionId) -> bool {
    me < partner
}

/// Forward `frame` from `sender` to its current partner.
pub(crate) fn forward(
    pairs: &PairTable,
    sessions: &DashMap<ConnectionId, Session>,
    sender: ConnectionId,
    frame: Frame,
) -> RelayOutcome {
    let Some(partner) = pairs.partner_of(sender) else {
        trace!(connection = %sender, "No partner, relay dropped");
        return RelayOutcome::Dropped;
    };

    let delivered = sessions
        .get(&partner)
        .map(|session| session.outbox.deliver(frame))
        .unwrap_or(false);

    if delivered {
        RelayOutcome::Delivered(partner)
    } else {
        RelayOutcome::Dropped
    }
}
