//! Connection identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter backing [`ConnectionId::generate`].
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a client connection.
///
/// Identifiers are assigned at connect time and never reused within a
/// process. They are totally ordered, which both ends of a pair rely on to
/// agree on who makes the first offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate the next process-unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{:x}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_increasing() {
        let id1 = ConnectionId::generate();
        let id2 = ConnectionId::generate();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionId::new(255).to_string(), "conn_ff");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ConnectionId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
