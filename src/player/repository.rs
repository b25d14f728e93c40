use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use super::models::{PlayerId, PlayerRecord, UserRef};
use crate::catalog::GameCatalog;
use crate::rating::MU;

/// Connectivity failure talking to the player store. This is a first-class
/// return value: callers surface a retry-later notice, they never crash a
/// session over it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("player store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store of per-game-kind skill ratings.
///
/// `get_player` synthesizes a default record for users the store has never
/// seen; only connectivity failure is an error. The `bool`-returning methods
/// report failure as `false` and must not panic.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Fetch (or synthesize) the rating snapshot for one user in one game
    /// kind.
    async fn get_player(
        &self,
        game_kind: &str,
        user: &UserRef,
    ) -> Result<PlayerRecord, StoreError>;

    /// Write a player's rating for one game kind. Returns `false` on
    /// connectivity failure.
    async fn update_player(&self, game_kind: &str, record: &PlayerRecord) -> bool;

    /// Delete a player's ratings across every game kind. Returns `false` on
    /// connectivity failure.
    async fn delete_player(&self, player: &PlayerId) -> bool;

    /// Recompute the global ranking ordinal for every player of a game kind:
    /// dense rank over (`mu` descending, `sigma` ascending), equal tuples
    /// sharing an ordinal.
    async fn recompute_rankings(&self, game_kind: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct StoredRating {
    mu: f64,
    sigma: f64,
    ranking: Option<u32>,
}

/// In-memory implementation for development and testing. Supports simulating
/// a connectivity outage via [`set_unavailable`](Self::set_unavailable).
pub struct InMemoryPlayerRepository {
    rows: Mutex<HashMap<(String, PlayerId), StoredRating>>,
    catalog: Arc<GameCatalog>,
    unavailable: AtomicBool,
}

impl InMemoryPlayerRepository {
    pub fn new(catalog: Arc<GameCatalog>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            catalog,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate the store dropping its connection; every call fails until
    /// re-enabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_connection(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    fn default_rating(&self, game_kind: &str) -> StoredRating {
        let tuning = self.catalog.tuning(game_kind);
        StoredRating {
            mu: MU,
            sigma: tuning.initial_sigma(),
            ranking: None,
        }
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    #[instrument(skip(self, user))]
    async fn get_player(
        &self,
        game_kind: &str,
        user: &UserRef,
    ) -> Result<PlayerRecord, StoreError> {
        self.check_connection()?;

        let rows = self.rows.lock().unwrap();
        let stored = rows
            .get(&(game_kind.to_string(), user.id))
            .copied()
            .unwrap_or_else(|| self.default_rating(game_kind));

        debug!(player_id = %user.id, mu = stored.mu, "Fetched player rating");
        Ok(PlayerRecord::new(user, stored.mu, stored.sigma, stored.ranking))
    }

    #[instrument(skip(self, record))]
    async fn update_player(&self, game_kind: &str, record: &PlayerRecord) -> bool {
        if self.check_connection().is_err() {
            warn!(player_id = %record.id, "Player update dropped, store unavailable");
            return false;
        }

        let mut rows = self.rows.lock().unwrap();
        let entry = rows
            .entry((game_kind.to_string(), record.id))
            .or_insert(StoredRating {
                mu: record.mu,
                sigma: record.sigma,
                ranking: None,
            });
        entry.mu = record.mu;
        entry.sigma = record.sigma;
        debug!(player_id = %record.id, mu = record.mu, "Player rating updated");
        true
    }

    #[instrument(skip(self))]
    async fn delete_player(&self, player: &PlayerId) -> bool {
        if self.check_connection().is_err() {
            return false;
        }

        let mut rows = self.rows.lock().unwrap();
        rows.retain(|(_, id), _| id != player);
        true
    }

    #[instrument(skip(self))]
    async fn recompute_rankings(&self, game_kind: &str) -> bool {
        if self.check_connection().is_err() {
            warn!(game_kind, "Ranking recompute dropped, store unavailable");
            return false;
        }

        let mut rows = self.rows.lock().unwrap();
        let mut entries: Vec<(PlayerId, f64, f64)> = rows
            .iter()
            .filter(|((kind, _), _)| kind == game_kind)
            .map(|((_, id), stored)| (*id, stored.mu, stored.sigma))
            .collect();

        // mu descending, sigma ascending
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut ordinal = 0u32;
        let mut previous: Option<(f64, f64)> = None;
        for (id, mu, sigma) in entries {
            if previous != Some((mu, sigma)) {
                ordinal += 1;
                previous = Some((mu, sigma));
            }
            if let Some(entry) = rows.get_mut(&(game_kind.to_string(), id)) {
                entry.ranking = Some(ordinal);
            }
        }

        debug!(game_kind, "Rankings recomputed");
        true
    }
}

/// PostgreSQL implementation of the player store.
///
/// Schema:
/// ```sql
/// CREATE TABLE ratings (
///     game_kind TEXT NOT NULL,
///     player_id UUID NOT NULL,
///     mu DOUBLE PRECISION NOT NULL,
///     sigma DOUBLE PRECISION NOT NULL,
///     ranking BIGINT,
///     PRIMARY KEY (game_kind, player_id)
/// );
/// ```
pub struct PostgresPlayerRepository {
    pool: PgPool,
    catalog: Arc<GameCatalog>,
}

impl PostgresPlayerRepository {
    pub fn new(pool: PgPool, catalog: Arc<GameCatalog>) -> Self {
        Self { pool, catalog }
    }
}

#[async_trait]
impl PlayerRepository for PostgresPlayerRepository {
    #[instrument(skip(self, user))]
    async fn get_player(
        &self,
        game_kind: &str,
        user: &UserRef,
    ) -> Result<PlayerRecord, StoreError> {
        let row = sqlx::query(
            "SELECT mu, sigma, ranking FROM ratings WHERE game_kind = $1 AND player_id = $2",
        )
        .bind(game_kind)
        .bind(user.id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = %user.id, "Failed to fetch player rating");
            StoreError::Unavailable(e.to_string())
        })?;

        let record = match row {
            Some(row) => PlayerRecord::new(
                user,
                row.get::<f64, _>("mu"),
                row.get::<f64, _>("sigma"),
                row.get::<Option<i64>, _>("ranking").map(|r| r as u32),
            ),
            None => {
                let tuning = self.catalog.tuning(game_kind);
                PlayerRecord::new(user, MU, tuning.initial_sigma(), None)
            }
        };
        Ok(record)
    }

    #[instrument(skip(self, record))]
    async fn update_player(&self, game_kind: &str, record: &PlayerRecord) -> bool {
        let result = sqlx::query(
            "INSERT INTO ratings (game_kind, player_id, mu, sigma) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (game_kind, player_id) \
             DO UPDATE SET mu = EXCLUDED.mu, sigma = EXCLUDED.sigma",
        )
        .bind(game_kind)
        .bind(record.id.as_uuid())
        .bind(record.mu)
        .bind(record.sigma)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, player_id = %record.id, "Failed to update player rating");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_player(&self, player: &PlayerId) -> bool {
        let result = sqlx::query("DELETE FROM ratings WHERE player_id = $1")
            .bind(player.as_uuid())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, player_id = %player, "Failed to delete player");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn recompute_rankings(&self, game_kind: &str) -> bool {
        let result = sqlx::query(
            "UPDATE ratings SET ranking = ranked.ordinal \
             FROM (SELECT player_id, \
                          DENSE_RANK() OVER (ORDER BY mu DESC, sigma ASC) AS ordinal \
                   FROM ratings WHERE game_kind = $1) AS ranked \
             WHERE ratings.game_kind = $1 AND ratings.player_id = ranked.player_id",
        )
        .bind(game_kind)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, game_kind, "Failed to recompute rankings");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GameCatalog, GameKindSpec, PlayerCountSpec};
    use crate::games::tictactoe::TicTacToe;

    fn test_catalog() -> Arc<GameCatalog> {
        let mut catalog = GameCatalog::new();
        catalog.register(GameKindSpec::new(
            "tictactoe",
            "Tic-Tac-Toe",
            PlayerCountSpec::Exact(2),
            Box::new(|players| Box::new(TicTacToe::new(players))),
        ));
        Arc::new(catalog)
    }

    fn user(name: &str) -> UserRef {
        UserRef::new(PlayerId::new(), name)
    }

    #[tokio::test]
    async fn test_unknown_player_gets_default_rating() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let alice = user("alice");

        let record = repo.get_player("tictactoe", &alice).await.unwrap();
        assert_eq!(record.mu, MU);
        assert_eq!(record.sigma, MU / 3.0);
        assert_eq!(record.ranking, None);
        assert_eq!(record.name, "alice");
    }

    #[tokio::test]
    async fn test_update_then_get_reflects_new_rating() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let alice = user("alice");

        let mut record = repo.get_player("tictactoe", &alice).await.unwrap();
        record.mu = 1350.0;
        record.sigma = 180.0;
        assert!(repo.update_player("tictactoe", &record).await);

        let fetched = repo.get_player("tictactoe", &alice).await.unwrap();
        assert_eq!(fetched.mu, 1350.0);
        assert_eq!(fetched.sigma, 180.0);
    }

    #[tokio::test]
    async fn test_ratings_are_scoped_per_game_kind() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let alice = user("alice");

        let mut record = repo.get_player("tictactoe", &alice).await.unwrap();
        record.mu = 1500.0;
        repo.update_player("tictactoe", &record).await;

        let other = repo.get_player("checkers", &alice).await.unwrap();
        assert_eq!(other.mu, MU);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let alice = user("alice");
        repo.set_unavailable(true);

        assert!(repo.get_player("tictactoe", &alice).await.is_err());
        let record = PlayerRecord::new(&alice, MU, 400.0, None);
        assert!(!repo.update_player("tictactoe", &record).await);
        assert!(!repo.delete_player(&alice.id).await);
        assert!(!repo.recompute_rankings("tictactoe").await);

        repo.set_unavailable(false);
        assert!(repo.get_player("tictactoe", &alice).await.is_ok());
    }

    #[tokio::test]
    async fn test_recompute_rankings_dense_with_ties() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let users: Vec<UserRef> = ["a", "b", "c", "d"].iter().map(|n| user(n)).collect();

        // b and c share (mu, sigma) and must share an ordinal; d has the same
        // mu but higher sigma and ranks below them.
        let ratings = [(1400.0, 100.0), (1300.0, 90.0), (1300.0, 90.0), (1300.0, 200.0)];
        for (user, (mu, sigma)) in users.iter().zip(ratings.iter()) {
            let record = PlayerRecord::new(user, *mu, *sigma, None);
            assert!(repo.update_player("tictactoe", &record).await);
        }

        assert!(repo.recompute_rankings("tictactoe").await);

        let rankings: Vec<Option<u32>> = {
            let mut out = Vec::new();
            for user in &users {
                out.push(repo.get_player("tictactoe", user).await.unwrap().ranking);
            }
            out
        };
        assert_eq!(rankings, vec![Some(1), Some(2), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_delete_player_removes_all_kinds() {
        let repo = InMemoryPlayerRepository::new(test_catalog());
        let alice = user("alice");

        let record = PlayerRecord::new(&alice, 1400.0, 100.0, None);
        repo.update_player("tictactoe", &record).await;
        repo.update_player("checkers", &record).await;

        assert!(repo.delete_player(&alice.id).await);
        assert_eq!(
            repo.get_player("tictactoe", &alice).await.unwrap().mu,
            MU
        );
        assert_eq!(repo.get_player("checkers", &alice).await.unwrap().mu, MU);
    }
}
