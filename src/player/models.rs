use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A player's rating is displayed with a trailing `?` while the uncertainty
/// is still this large relative to the mean.
pub const SIGMA_RELATIVE_UNCERTAINTY_THRESHOLD: f64 = 0.25;

/// Unique identifier for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Create a new random player ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a player ID from an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a user as delivered by the chat transport: a stable id plus
/// the display name current at the time of the interaction. Display names are
/// never persisted; only the id keys the rating store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: PlayerId,
    pub name: String,
}

impl UserRef {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Snapshot of a user's identity and skill rating for one game kind.
///
/// Equality and hashing are by `id` alone: two records for the same user with
/// different `mu`/`sigma` still collide in the membership sets that lobbies
/// and games keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    /// Mean of the latent skill estimate.
    pub mu: f64,
    /// Uncertainty of the latent skill estimate.
    pub sigma: f64,
    /// Global ordinal for this game kind, if the player has been ranked.
    pub ranking: Option<u32>,
}

impl PlayerRecord {
    pub fn new(user: &UserRef, mu: f64, sigma: f64, ranking: Option<u32>) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            mu,
            sigma,
            ranking,
        }
    }

    /// Chat-surface mention for this player.
    pub fn mention(&self) -> String {
        format!("@{}", self.name)
    }

    /// Rating as shown in lobby and info columns: integer mu, a `?` while the
    /// estimate is still uncertain, and the global rank when known.
    pub fn formatted_rating(&self) -> String {
        let ranking_addend = match self.ranking {
            Some(rank) => format!(" (#{rank})"),
            None => String::new(),
        };
        if self.sigma > SIGMA_RELATIVE_UNCERTAINTY_THRESHOLD * self.mu {
            format!("{}?{}", self.mu as i64, ranking_addend)
        } else {
            format!("{}{}", self.mu as i64, ranking_addend)
        }
    }
}

impl PartialEq for PlayerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlayerRecord {}

impl Hash for PlayerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: PlayerId, mu: f64, sigma: f64) -> PlayerRecord {
        PlayerRecord {
            id,
            name: "test-player".to_string(),
            mu,
            sigma,
            ranking: None,
        }
    }

    #[test]
    fn test_equality_ignores_rating() {
        let id = PlayerId::new();
        let stale = record(id, 1200.0, 400.0);
        let fresh = record(id, 1385.0, 110.0);

        assert_eq!(stale, fresh);

        // A set must treat both as the same member
        let mut members = HashSet::new();
        members.insert(stale);
        assert!(members.contains(&fresh));
        assert!(!members.insert(fresh));
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_distinct_ids_are_distinct_members() {
        let a = record(PlayerId::new(), 1200.0, 400.0);
        let b = record(PlayerId::new(), 1200.0, 400.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_formatted_rating_uncertain() {
        let mut player = record(PlayerId::new(), 1200.0, 400.0);
        assert_eq!(player.formatted_rating(), "1200?");

        player.ranking = Some(3);
        assert_eq!(player.formatted_rating(), "1200? (#3)");
    }

    #[test]
    fn test_formatted_rating_settled() {
        let mut player = record(PlayerId::new(), 1450.7, 120.0);
        assert_eq!(player.formatted_rating(), "1450");

        player.ranking = Some(1);
        assert_eq!(player.formatted_rating(), "1450 (#1)");
    }
}
