//! User profile payload.
//!
//! The profile is produced by the client-side profile wizard and submitted
//! once per connection. The relay only reads `interests`; everything else is
//! carried for completeness and discarded with the connection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A self-described user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Free-form age, as entered by the user.
    pub age: String,
    /// Interest tags. Order is irrelevant and duplicates collapse.
    pub interests: BTreeSet<String>,
    /// Short biography.
    pub bio: String,
    /// What the user is looking for (e.g. "Networking").
    pub looking_for: String,
    /// When the wizard was completed, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Whether the wizard reported the profile as complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_complete: Option<bool>,
}

impl UserProfile {
    /// Create a profile with only a name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: String::new(),
            interests: BTreeSet::new(),
            bio: String::new(),
            looking_for: String::new(),
            completed_at: None,
            profile_complete: None,
        }
    }

    /// Replace the interest set.
    #[must_use]
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    /// Number of interest tags present in both profiles.
    #[must_use]
    pub fn shared_interests(&self, other: &UserProfile) -> usize {
        self.interests.intersection(&other.interests).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wizard_payload() {
        let profile: UserProfile = serde_json::from_value(json!({
            "name": "Ada",
            "age": "29",
            "interests": ["💻 Coding", "🎵 Music", "💻 Coding"],
            "bio": "Compilers and synths",
            "lookingFor": "💼 Networking",
            "completedAt": "2024-05-01T10:00:00Z",
        }))
        .unwrap();

        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.interests.len(), 2);
        assert_eq!(profile.looking_for, "💼 Networking");
        assert!(profile.profile_complete.is_none());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result: Result<UserProfile, _> = serde_json::from_value(json!({
            "name": "Ada",
            "interests": [],
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_interests_ignores_order() {
        let a = UserProfile::new("a").with_interests(["x", "y", "z"]);
        let b = UserProfile::new("b").with_interests(["z", "x"]);
        let c = UserProfile::new("c");

        assert_eq!(a.shared_interests(&b), 2);
        assert_eq!(b.shared_interests(&a), 2);
        assert_eq!(a.shared_interests(&c), 0);
    }
}
