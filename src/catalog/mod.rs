use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::GameEngine;
use crate::player::PlayerRecord;
use crate::rating::RatingTuning;

/// Declared player-count requirement for a game kind: either one exact count
/// or an explicit set of acceptable counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCountSpec {
    Exact(usize),
    AnyOf(Vec<usize>),
}

impl PlayerCountSpec {
    /// Whether a lobby with `count` queued players may start.
    pub fn allows(&self, count: usize) -> bool {
        match self {
            PlayerCountSpec::Exact(n) => count == *n,
            PlayerCountSpec::AnyOf(counts) => counts.contains(&count),
        }
    }

    /// Human representation for lobby headers.
    pub fn describe(&self) -> String {
        match self {
            PlayerCountSpec::Exact(n) => n.to_string(),
            PlayerCountSpec::AnyOf(counts) => counts
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Constructs a fresh engine for one game, given the (already shuffled)
/// seating order.
pub type EngineFactory = Box<dyn Fn(Vec<PlayerRecord>) -> Box<dyn GameEngine> + Send + Sync>;

/// Static metadata and construction entry point for one game kind.
pub struct GameKindSpec {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub author: String,
    pub time_estimate: String,
    pub difficulty: String,
    pub rated_by_default: bool,
    pub player_counts: PlayerCountSpec,
    pub tuning: RatingTuning,
    factory: EngineFactory,
}

impl GameKindSpec {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        player_counts: PlayerCountSpec,
        factory: EngineFactory,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            author: String::new(),
            time_estimate: String::new(),
            difficulty: String::new(),
            rated_by_default: true,
            player_counts,
            tuning: RatingTuning::default(),
            factory,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_details(
        mut self,
        author: impl Into<String>,
        time_estimate: impl Into<String>,
        difficulty: impl Into<String>,
    ) -> Self {
        self.author = author.into();
        self.time_estimate = time_estimate.into();
        self.difficulty = difficulty.into();
        self
    }

    pub fn rated_by_default(mut self, rated: bool) -> Self {
        self.rated_by_default = rated;
        self
    }

    pub fn with_tuning(mut self, tuning: RatingTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Build an engine for one game with the given seating order.
    pub fn construct(&self, players: Vec<PlayerRecord>) -> Box<dyn GameEngine> {
        (self.factory)(players)
    }
}

/// Registry of every playable game kind, keyed by id.
#[derive(Default)]
pub struct GameCatalog {
    kinds: HashMap<String, GameKindSpec>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: GameKindSpec) {
        self.kinds.insert(spec.id.clone(), spec);
    }

    pub fn get(&self, id: &str) -> Option<&GameKindSpec> {
        self.kinds.get(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Rating tuning for a game kind; unknown kinds get the default
    /// environment so rating synthesis never fails on a stale id.
    pub fn tuning(&self, id: &str) -> RatingTuning {
        self.kinds
            .get(id)
            .map(|spec| spec.tuning)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PlayerCountSpec::Exact(2), 2, true)]
    #[case(PlayerCountSpec::Exact(2), 3, false)]
    #[case(PlayerCountSpec::AnyOf(vec![2, 4]), 4, true)]
    #[case(PlayerCountSpec::AnyOf(vec![2, 4]), 3, false)]
    #[case(PlayerCountSpec::AnyOf(vec![2, 4]), 0, false)]
    fn test_player_count_allows(
        #[case] spec: PlayerCountSpec,
        #[case] count: usize,
        #[case] expected: bool,
    ) {
        assert_eq!(spec.allows(count), expected);
    }

    #[test]
    fn test_player_count_describe() {
        assert_eq!(PlayerCountSpec::Exact(2).describe(), "2");
        assert_eq!(PlayerCountSpec::AnyOf(vec![2, 3, 4]).describe(), "2, 3, 4");
    }

    #[test]
    fn test_catalog_lookup_and_default_tuning() {
        let mut catalog = GameCatalog::new();
        catalog.register(
            GameKindSpec::new(
                "tictactoe",
                "Tic-Tac-Toe",
                PlayerCountSpec::Exact(2),
                Box::new(|players| {
                    Box::new(crate::games::tictactoe::TicTacToe::new(players))
                }),
            )
            .with_tuning(RatingTuning {
                draw_probability: 0.3,
                ..RatingTuning::default()
            }),
        );

        assert!(catalog.get("tictactoe").is_some());
        assert!(catalog.get("go").is_none());
        assert_eq!(catalog.tuning("tictactoe").draw_probability, 0.3);
        // Unknown kinds fall back to the default environment
        assert_eq!(
            catalog.tuning("go").draw_probability,
            RatingTuning::default().draw_probability
        );
    }
}
