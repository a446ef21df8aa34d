//! Partner selection.
//!
//! The matchmaker owns the waiting pool and the pair table. It is a plain
//! data structure; callers serialize access to it (see
//! [`Switchboard`](crate::Switchboard)).

use crate::pair_table::PairTable;
use crate::pool::WaitingPool;
use std::time::Duration;
use tandem_protocol::{ConnectionId, UserProfile};
use tracing::{debug, trace};

/// Where a connection stands in the matchmaking cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Neither waiting nor paired.
    Idle,
    /// In the waiting pool.
    Waiting,
    /// Paired with the given partner.
    Paired(ConnectionId),
}

/// Result of a partner search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The requester was paired with a connection taken from the pool.
    Paired {
        /// The chosen partner.
        partner: ConnectionId,
        /// How long the partner had been waiting.
        waited: Duration,
    },
    /// Nobody was available; the requester is waiting.
    Waiting,
}

/// Compatibility score between two optional profiles.
///
/// The number of shared interest tags, or 0 if either side has no profile.
#[must_use]
pub fn compatibility(a: Option<&UserProfile>, b: Option<&UserProfile>) -> usize {
    match (a, b) {
        (Some(a), Some(b)) => a.shared_interests(b),
        _ => 0,
    }
}

/// Waiting pool plus pair table.
#[derive(Debug, Default)]
pub struct Matchmaker {
    pool: WaitingPool,
    pairs: PairTable,
}

impl Matchmaker {
    /// Create an empty matchmaker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a partner for `requester`, or park it in the pool.
    ///
    /// `score` returns the compatibility of `requester` with a pooled
    /// candidate. The candidate with the strictly highest score wins; ties go
    /// to the earliest pool insertion, which is plain FIFO when every score is 0.
    ///
    /// The requester must not be paired. If it is already waiting it is
    /// never matched with itself, and keeps its pool position when nobody
    /// else is available.
    pub fn find_partner<F>(&mut self, requester: ConnectionId, mut score: F) -> MatchOutcome
    where
        F: FnMut(ConnectionId) -> usize,
    {
        debug_assert!(
            !self.pairs.contains(requester),
            "find_partner called for a paired connection"
        );

        let mut best: Option<(ConnectionId, usize)> = None;
        for entry in self.pool.iter().filter(|e| e.id != requester) {
            let candidate_score = score(entry.id);
            trace!(requester = %requester, candidate = %entry.id, score = candidate_score, "Scored candidate");
            if best.map_or(true, |(_, s)| candidate_score > s) {
                best = Some((entry.id, candidate_score));
            }
        }

        match best {
            Some((candidate, candidate_score)) => {
                let waited = self
                    .pool
                    .remove(candidate)
                    .map(|e| e.enqueued_at.elapsed())
                    .unwrap_or_default();
                self.pool.remove(requester);
                self.pairs.link(requester, candidate);

                debug!(
                    requester = %requester,
                    partner = %candidate,
                    shared_interests = candidate_score,
                    waited_ms = waited.as_millis() as u64,
                    "Paired"
                );

                MatchOutcome::Paired {
                    partner: candidate,
                    waited,
                }
            }
            None => {
                if self.pool.push_back(requester) {
                    debug!(requester = %requester, waiting = self.pool.len(), "Added to waiting pool");
                }
                MatchOutcome::Waiting
            }
        }
    }

    /// Append a connection to the pool without searching.
    ///
    /// Returns `false` if it is already waiting or is paired.
    pub fn enqueue(&mut self, id: ConnectionId) -> bool {
        if self.pairs.contains(id) {
            return false;
        }
        self.pool.push_back(id)
    }

    /// Take a connection out of the pool. Returns whether it was waiting.
    pub fn withdraw(&mut self, id: ConnectionId) -> bool {
        self.pool.remove(id).is_some()
    }

    /// Break the pair containing `id`, returning the former partner.
    pub fn unpair(&mut self, id: ConnectionId) -> Option<ConnectionId> {
        self.pairs.unlink(id)
    }

    /// The current partner of `id`.
    #[must_use]
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.pairs.partner_of(id)
    }

    /// Where `id` stands.
    #[must_use]
    pub fn state_of(&self, id: ConnectionId) -> ConnectionState {
        if let Some(partner) = self.pairs.partner_of(id) {
            ConnectionState::Paired(partner)
        } else if self.pool.contains(id) {
            ConnectionState::Waiting
        } else {
            ConnectionState::Idle
        }
    }

    /// Number of waiting connections.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of active pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.pair_count()
    }

    /// The waiting pool.
    #[must_use]
    pub fn pool(&self) -> &WaitingPool {
        &self.pool
    }

    /// The pair table.
    #[must_use]
    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    /// Check the pairing invariants: the table is symmetric without
    /// self-pairs, and no waiting connection is also paired.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.pairs.is_consistent() && self.pool.iter().all(|e| !self.pairs.contains(e.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn id(raw: u64) -> ConnectionId {
        ConnectionId::new(raw)
    }

    fn scorer(
        profiles: &HashMap<ConnectionId, UserProfile>,
        requester: ConnectionId,
    ) -> impl FnMut(ConnectionId) -> usize + '_ {
        move |candidate| compatibility(profiles.get(&requester), profiles.get(&candidate))
    }

    #[test]
    fn test_first_request_waits() {
        let mut mm = Matchmaker::new();
        assert_eq!(mm.find_partner(id(1), |_| 0), MatchOutcome::Waiting);
        assert_eq!(mm.state_of(id(1)), ConnectionState::Waiting);
        assert_eq!(mm.waiting_count(), 1);
    }

    #[test]
    fn test_fifo_fallback_without_profiles() {
        let mut mm = Matchmaker::new();
        let (a, b, c) = (id(1), id(2), id(3));
        mm.enqueue(a);
        mm.enqueue(b);

        match mm.find_partner(c, |_| 0) {
            MatchOutcome::Paired { partner, .. } => assert_eq!(partner, a),
            other => panic!("Expected pairing, got {:?}", other),
        }
        assert_eq!(mm.state_of(c), ConnectionState::Paired(a));
        assert_eq!(mm.state_of(a), ConnectionState::Paired(c));
        assert_eq!(mm.state_of(b), ConnectionState::Waiting);
        assert!(mm.is_consistent());
    }

    #[test]
    fn test_prefers_more_shared_interests_over_age() {
        let mut mm = Matchmaker::new();
        let (b, c, d) = (id(2), id(3), id(4));
        let profiles: HashMap<_, _> = [
            (b, UserProfile::new("b").with_interests(["x"])),
            (c, UserProfile::new("c").with_interests(["x", "y"])),
            (d, UserProfile::new("d").with_interests(["x", "y"])),
        ]
        .into_iter()
        .collect();
        mm.enqueue(b);
        mm.enqueue(c);

        match mm.find_partner(d, scorer(&profiles, d)) {
            MatchOutcome::Paired { partner, .. } => assert_eq!(partner, c),
            other => panic!("Expected pairing, got {:?}", other),
        }
        assert_eq!(mm.pool().ids(), vec![b]);
    }

    #[test]
    fn test_equal_scores_go_to_earliest() {
        let mut mm = Matchmaker::new();
        let (b, c, d) = (id(2), id(3), id(4));
        let profiles: HashMap<_, _> = [
            (b, UserProfile::new("b").with_interests(["x"])),
            (c, UserProfile::new("c").with_interests(["x"])),
            (d, UserProfile::new("d").with_interests(["x"])),
        ]
        .into_iter()
        .collect();
        mm.enqueue(b);
        mm.enqueue(c);

        match mm.find_partner(d, scorer(&profiles, d)) {
            MatchOutcome::Paired { partner, .. } => assert_eq!(partner, b),
            other => panic!("Expected pairing, got {:?}", other),
        }
    }

    #[test]
    fn test_waiting_requester_never_matches_itself() {
        let mut mm = Matchmaker::new();
        let a = id(1);
        mm.find_partner(a, |_| 0);

        assert_eq!(mm.find_partner(a, |_| 0), MatchOutcome::Waiting);
        assert_eq!(mm.pool().ids(), vec![a]);
        assert!(mm.is_consistent());
    }

    #[test]
    fn test_waiting_requester_leaves_pool_when_matched() {
        let mut mm = Matchmaker::new();
        let (a, b) = (id(1), id(2));
        mm.enqueue(a);
        mm.enqueue(b);

        match mm.find_partner(b, |_| 0) {
            MatchOutcome::Paired { partner, .. } => assert_eq!(partner, a),
            other => panic!("Expected pairing, got {:?}", other),
        }
        assert!(mm.pool().is_empty());
        assert!(mm.is_consistent());
    }

    #[test]
    fn test_enqueue_refuses_paired_connection() {
        let mut mm = Matchmaker::new();
        let (a, b) = (id(1), id(2));
        mm.enqueue(a);
        mm.find_partner(b, |_| 0);

        assert!(!mm.enqueue(a));
        assert!(mm.is_consistent());
    }

    #[test]
    fn test_unpair_and_withdraw_are_idempotent() {
        let mut mm = Matchmaker::new();
        let (a, b) = (id(1), id(2));
        mm.enqueue(a);
        mm.find_partner(b, |_| 0);

        assert_eq!(mm.unpair(a), Some(b));
        assert_eq!(mm.unpair(a), None);
        assert!(!mm.withdraw(a));
        assert_eq!(mm.state_of(a), ConnectionState::Idle);
        assert_eq!(mm.state_of(b), ConnectionState::Idle);
    }

    #[test]
    fn test_compatibility_without_profile_is_zero() {
        let p = UserProfile::new("p").with_interests(["x"]);
        assert_eq!(compatibility(Some(&p), None), 0);
        assert_eq!(compatibility(None, Some(&p)), 0);
        assert_eq!(compatibility(Some(&p), Some(&p)), 1);
    }
}
