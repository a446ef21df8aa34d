//! The waiting pool.
//!
//! Connections that asked for a partner while nobody suitable was available
//! wait here. Insertion order is the tie-break for matchmaking, so the pool
//! is a queue rather than a set.

use std::collections::VecDeque;
use std::time::Instant;
use tandem_protocol::ConnectionId;

/// A connection parked in the pool.
#[derive(Debug, Clone, Copy)]
pub struct WaitingEntry {
    /// The waiting connection.
    pub id: ConnectionId,
    /// When it entered the pool.
    pub enqueued_at: Instant,
}

/// FIFO pool of waiting connections, without duplicates.
#[derive(Debug, Default)]
pub struct WaitingPool {
    entries: VecDeque<WaitingEntry>,
}

impl WaitingPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of waiting connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a connection is waiting.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Append a connection at the tail.
    ///
    /// Returns `false` and keeps the existing position if it is already waiting.
    pub fn push_back(&mut self, id: ConnectionId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push_back(WaitingEntry {
            id,
            enqueued_at: Instant::now(),
        });
        true
    }

    /// Remove a connection, wherever it is.
    pub fn remove(&mut self, id: ConnectionId) -> Option<WaitingEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(index)
    }

    /// Iterate from the earliest insertion to the latest.
    pub fn iter(&self) -> impl Iterator<Item = &WaitingEntry> {
        self.entries.iter()
    }

    /// Waiting connection ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.entries.iter().map(|e| e.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_no_duplicates() {
        let mut pool = WaitingPool::new();
        let (a, b, c) = (ConnectionId::new(1), ConnectionId::new(2), ConnectionId::new(3));

        assert!(pool.push_back(a));
        assert!(pool.push_back(b));
        assert!(!pool.push_back(a));
        assert!(pool.push_back(c));

        assert_eq!(pool.ids(), vec![a, b, c]);
    }

    #[test]
    fn test_remove_from_middle() {
        let mut pool = WaitingPool::new();
        let (a, b, c) = (ConnectionId::new(1), ConnectionId::new(2), ConnectionId::new(3));
        pool.push_back(a);
        pool.push_back(b);
        pool.push_back(c);

        assert_eq!(pool.remove(b).map(|e| e.id), Some(b));
        assert!(pool.remove(b).is_none());
        assert_eq!(pool.ids(), vec![a, c]);
    }
}
