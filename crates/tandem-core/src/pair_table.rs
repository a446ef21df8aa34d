//! Symmetric table of active pairs.

use std::collections::HashMap;
use tandem_protocol::ConnectionId;

/// Maps each paired connection to its partner.
///
/// Both directions of a pair are inserted and removed together, so a
/// half-pair is never observable.
#[derive(Debug, Default)]
pub struct PairTable {
    partners: HashMap<ConnectionId, ConnectionId>,
}

impl PairTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair two connections.
    ///
    /// Returns `false` and changes nothing if `a == b` or either side is
    /// already paired.
    pub fn link(&mut self, a: ConnectionId, b: ConnectionId) -> bool {
        if a == b || self.partners.contains_key(&a) || self.partners.contains_key(&b) {
            return false;
        }
        self.partners.insert(a, b);
        self.partners.insert(b, a);
        true
    }

    /// Break the pair containing `id`, returning the former partner.
    pub fn unlink(&mut self, id: ConnectionId) -> Option<ConnectionId> {
        let partner = self.partners.remove(&id)?;
        self.partners.remove(&partner);
        Some(partner)
    }

    /// The current partner of `id`.
    #[must_use]
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.partners.get(&id).copied()
    }

    /// Whether `id` is paired.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.partners.contains_key(&id)
    }

    /// Number of active pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Iterate over every `(connection, partner)` entry, both directions included.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, ConnectionId)> + '_ {
        self.partners.iter().map(|(a, b)| (*a, *b))
    }

    /// Check symmetry and the absence of self-pairs.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.partners
            .iter()
            .all(|(a, b)| a != b && self.partners.get(b) == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_is_symmetric() {
        let mut table = PairTable::new();
        let (a, b) = (ConnectionId::new(1), ConnectionId::new(2));

        assert!(table.link(a, b));
        assert_eq!(table.partner_of(a), Some(b));
        assert_eq!(table.partner_of(b), Some(a));
        assert_eq!(table.pair_count(), 1);
        assert!(table.is_consistent());
    }

    #[test]
    fn test_refuses_self_pair_and_double_link() {
        let mut table = PairTable::new();
        let (a, b, c) = (ConnectionId::new(1), ConnectionId::new(2), ConnectionId::new(3));

        assert!(!table.link(a, a));
        assert!(table.link(a, b));
        assert!(!table.link(c, b));
        assert!(!table.contains(c));
        assert!(table.is_consistent());
    }

    #[test]
    fn test_unlink_removes_both_sides() {
        let mut table = PairTable::new();
        let (a, b) = (ConnectionId::new(1), ConnectionId::new(2));
        table.link(a, b);

        assert_eq!(table.unlink(b), Some(a));
        assert!(!table.contains(a));
        assert!(!table.contains(b));
        assert_eq!(table.unlink(a), None);
    }
}
