//! Connection lifecycle management.
//!
//! The switchboard owns every live connection and is the only place the
//! waiting pool and pair table are mutated. All matchmaking, relaying and
//! cleanup happens under a single lock around the [`Matchmaker`], which is
//! never held across I/O: outbound frames are only queued, never written.

use crate::matchmaker::{compatibility, ConnectionState, MatchOutcome, Matchmaker};
use crate::relay::{self, is_impolite, RelayOutcome};
use crate::session::{Outbox, Session};
use dashmap::DashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tandem_protocol::{ConnectionId, Frame, SignalEnvelope, UserProfile};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Switchboard errors.
///
/// Races between concurrent disconnects (relaying to a vanished partner,
/// cleaning up twice) are expected and never reported as errors.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// The connection limit was reached.
    #[error("Connection limit of {0} reached")]
    CapacityReached(usize),

    /// No live connection has this id.
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// The input violates a configured limit and was dropped.
    #[error("Input rejected: {0}")]
    Rejected(String),
}

/// Why a connection is being cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
    /// The transport went away. The connection is forgotten.
    Disconnect,
    /// The client dropped its partner and stays idle.
    ExplicitUnpair,
    /// The client dropped its partner and wants a new one right away.
    NextPartner,
}

impl CleanupReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupReason::Disconnect => "disconnect",
            CleanupReason::ExplicitUnpair => "explicit-unpair",
            CleanupReason::NextPartner => "next-partner",
        }
    }
}

/// What a cleanup did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupOutcome {
    /// The connection was taken out of the waiting pool.
    pub was_waiting: bool,
    /// The partner that was notified, if a pair was broken.
    pub former_partner: Option<ConnectionId>,
    /// Result of the follow-up search for [`CleanupReason::NextPartner`].
    pub rematch: Option<MatchOutcome>,
    /// How long the connection lived, for [`CleanupReason::Disconnect`].
    pub connected_for: Option<Duration>,
}

/// Switchboard configuration.
#[derive(Debug, Clone)]
pub struct SwitchboardConfig {
    /// Maximum number of live connections.
    pub max_connections: usize,
    /// Maximum number of interest tags in a profile.
    pub max_profile_interests: usize,
    /// Maximum chat message length in bytes.
    pub max_chat_length: usize,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            max_profile_interests: 64,
            max_chat_length: 4096,
        }
    }
}

/// Matchmaking snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchboardStats {
    /// Live connections.
    pub connections: usize,
    /// Connections in the waiting pool.
    pub waiting: usize,
    /// Active pairs.
    pub pairs: usize,
}

/// The connection lifecycle manager.
pub struct Switchboard {
    /// Pool and pair table; the single exclusion scope for pairing state.
    matchmaker: Mutex<Matchmaker>,
    /// Live connections. Inserts, removals and every read that feeds a
    /// pairing decision happen under `matchmaker`; profile writes and the
    /// `profile`/`is_connected` lookups go straight to the map.
    sessions: DashMap<ConnectionId, Session>,
    /// Configuration.
    config: SwitchboardConfig,
}

impl Switchboard {
    /// Create a switchboard with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SwitchboardConfig::default())
    }

    /// Create a switchboard with custom configuration.
    #[must_use]
    pub fn with_config(config: SwitchboardConfig) -> Self {
        info!("Creating switchboard with config: {:?}", config);
        Self {
            matchmaker: Mutex::new(Matchmaker::new()),
            sessions: DashMap::new(),
            config,
        }
    }

    fn matchmaker(&self) -> MutexGuard<'_, Matchmaker> {
        self.matchmaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, id: ConnectionId, frame: Frame) -> bool {
        self.sessions
            .get(&id)
            .map(|session| session.outbox.deliver(frame))
            .unwrap_or(false)
    }

    /// Register a new connection in the `Idle` state.
    ///
    /// Returns its id and the receiver for its outbound frames.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchboardError::CapacityReached`] at the connection limit.
    pub fn connect(
        &self,
    ) -> Result<(ConnectionId, mpsc::UnboundedReceiver<Frame>), SwitchboardError> {
        let _guard = self.matchmaker();
        if self.sessions.len() >= self.config.max_connections {
            return Err(SwitchboardError::CapacityReached(self.config.max_connections));
        }

        let id = ConnectionId::generate();
        let (outbox, rx) = Outbox::channel(id);
        self.sessions.insert(id, Session::new(outbox));

        debug!(connection = %id, connections = self.sessions.len(), "Registered");
        Ok((id, rx))
    }

    /// Store or overwrite the profile of a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unknown or the profile exceeds
    /// the interest limit. A rejected profile leaves the stored one untouched.
    pub fn submit_profile(
        &self,
        id: ConnectionId,
        profile: UserProfile,
    ) -> Result<(), SwitchboardError> {
        if profile.interests.len() > self.config.max_profile_interests {
            return Err(SwitchboardError::Rejected(format!(
                "{} interests exceeds limit of {}",
                profile.interests.len(),
                self.config.max_profile_interests
            )));
        }

        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(SwitchboardError::UnknownConnection(id))?;

        debug!(
            connection = %id,
            name = %profile.name,
            interests = profile.interests.len(),
            "Profile received"
        );
        session.profile = Some(profile);
        Ok(())
    }

    /// Find a partner for a connection, or park it in the waiting pool.
    ///
    /// A connection that is already paired is unpaired first; its former
    /// partner gets `partner-disconnected` and becomes idle.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchboardError::UnknownConnection`] if `id` is not live.
    pub fn find_partner(&self, id: ConnectionId) -> Result<MatchOutcome, SwitchboardError> {
        let mut matchmaker = self.matchmaker();
        if !self.sessions.contains_key(&id) {
            return Err(SwitchboardError::UnknownConnection(id));
        }

        if let Some(former) = matchmaker.unpair(id) {
            debug!(connection = %id, partner = %former, "Leaving current partner to search again");
            self.deliver(former, Frame::PartnerDisconnected);
        }

        Ok(self.find_partner_locked(&mut matchmaker, id))
    }

    fn find_partner_locked(&self, matchmaker: &mut Matchmaker, id: ConnectionId) -> MatchOutcome {
        let requester_profile = self
            .sessions
            .get(&id)
            .and_then(|session| session.profile.clone());

        let outcome = matchmaker.find_partner(id, |candidate| {
            let candidate_session = self.sessions.get(&candidate);
            compatibility(
                requester_profile.as_ref(),
                candidate_session.as_ref().and_then(|s| s.profile.as_ref()),
            )
        });

        match outcome {
            MatchOutcome::Paired { partner, .. } => {
                self.deliver(id, Frame::Paired);
                self.deliver(partner, Frame::Paired);
                self.deliver(id, Frame::should_make_offer(is_impolite(id, partner)));
                self.deliver(partner, Frame::should_make_offer(is_impolite(partner, id)));
            }
            MatchOutcome::Waiting => {
                self.deliver(id, Frame::Waiting);
            }
        }

        outcome
    }

    /// Relay a signaling envelope to the sender's current partner.
    ///
    /// Dropped silently if the sender is not paired.
    pub fn relay_signal(&self, sender: ConnectionId, envelope: SignalEnvelope) -> RelayOutcome {
        let matchmaker = self.matchmaker();
        let kind = envelope.kind();
        let outcome = relay::forward(
            matchmaker.pairs(),
            &self.sessions,
            sender,
            Frame::signal(envelope),
        );
        if let RelayOutcome::Delivered(partner) = outcome {
            trace!(connection = %sender, partner = %partner, kind, "Signal relayed");
        }
        outcome
    }

    /// Relay a chat message to the sender's current partner.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchboardError::Rejected`] if the text exceeds the length limit.
    pub fn relay_chat(
        &self,
        sender: ConnectionId,
        text: String,
    ) -> Result<RelayOutcome, SwitchboardError> {
        if text.len() > self.config.max_chat_length {
            return Err(SwitchboardError::Rejected(format!(
                "chat message of {} bytes exceeds limit of {}",
                text.len(),
                self.config.max_chat_length
            )));
        }

        let matchmaker = self.matchmaker();
        Ok(relay::forward(
            matchmaker.pairs(),
            &self.sessions,
            sender,
            Frame::chat(text),
        ))
    }

    /// Drop the current partner and stay idle.
    pub fn unpair(&self, id: ConnectionId) -> CleanupOutcome {
        self.cleanup(id, CleanupReason::ExplicitUnpair)
    }

    /// Drop the current partner and search again.
    pub fn next_partner(&self, id: ConnectionId) -> CleanupOutcome {
        self.cleanup(id, CleanupReason::NextPartner)
    }

    /// Forget a connection whose transport went away.
    pub fn disconnect(&self, id: ConnectionId) -> CleanupOutcome {
        self.cleanup(id, CleanupReason::Disconnect)
    }

    /// The single cleanup path.
    ///
    /// Leaves the pool, breaks any pair (notifying the partner once), and
    /// discards the profile. Disconnects also forget the connection;
    /// `NextPartner` searches again with a clean slate. Every step is a
    /// no-op on missing entries, so cleanup is idempotent.
    pub fn cleanup(&self, id: ConnectionId, reason: CleanupReason) -> CleanupOutcome {
        let mut matchmaker = self.matchmaker();
        let mut outcome = CleanupOutcome {
            was_waiting: matchmaker.withdraw(id),
            former_partner: matchmaker.unpair(id),
            rematch: None,
            connected_for: None,
        };

        if let Some(partner) = outcome.former_partner {
            debug!(connection = %id, partner = %partner, reason = reason.as_str(), "Pair broken");
            self.deliver(partner, Frame::PartnerDisconnected);
        }

        let live = match reason {
            CleanupReason::Disconnect => {
                outcome.connected_for = self
                    .sessions
                    .remove(&id)
                    .map(|(_, session)| session.connected_at.elapsed());
                false
            }
            CleanupReason::ExplicitUnpair | CleanupReason::NextPartner => {
                match self.sessions.get_mut(&id) {
                    Some(mut session) => {
                        session.profile = None;
                        true
                    }
                    None => false,
                }
            }
        };

        if live && reason == CleanupReason::NextPartner {
            outcome.rematch = Some(self.find_partner_locked(&mut matchmaker, id));
        }

        debug!(
            connection = %id,
            reason = reason.as_str(),
            was_waiting = outcome.was_waiting,
            "Cleaned up"
        );
        outcome
    }

    /// Where a live connection stands, or `None` if it is unknown.
    #[must_use]
    pub fn state(&self, id: ConnectionId) -> Option<ConnectionState> {
        let matchmaker = self.matchmaker();
        self.sessions
            .contains_key(&id)
            .then(|| matchmaker.state_of(id))
    }

    /// The current partner of a connection.
    #[must_use]
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.matchmaker().partner_of(id)
    }

    /// The stored profile of a connection.
    #[must_use]
    pub fn profile(&self, id: ConnectionId) -> Option<UserProfile> {
        self.sessions.get(&id).and_then(|s| s.profile.clone())
    }

    /// Whether a connection is live.
    #[must_use]
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Get matchmaking statistics.
    #[must_use]
    pub fn stats(&self) -> SwitchboardStats {
        let matchmaker = self.matchmaker();
        SwitchboardStats {
            connections: self.sessions.len(),
            waiting: matchmaker.waiting_count(),
            pairs: matchmaker.pair_count(),
        }
    }

    /// Check the pairing invariants, including that only live connections
    /// are waiting or paired.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let matchmaker = self.matchmaker();
        matchmaker.is_consistent()
            && matchmaker.pool().iter().all(|e| self.sessions.contains_key(&e.id))
            && matchmaker.pairs().iter().all(|(a, _)| self.sessions.contains_key(&a))
    }
}

impl Default for Switchboard {
    fn default() -> Self {
        Self::new()
    }
}
