use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use playhall::catalog::{GameKindSpec, PlayerCountSpec};
use playhall::engine::{
    Directive, EngineError, GameEngine, MoveArgs, MoveReply, MoveSpec, MoveTable, Outcome,
};
use playhall::games::standard_catalog;
use playhall::player::repository::InMemoryPlayerRepository;
use playhall::player::{PlayerId, PlayerRecord, UserRef};
use playhall::render::RecordingRenderer;
use playhall::{game, matchmaking, AppState, CoreDeps, GameCatalog, SessionDirectory};

/// Three-or-more-player race used to exercise tie-group settlement: the first
/// player to dash wins, everyone else ties for second.
pub struct RaceGame {
    players: Vec<PlayerRecord>,
    turn: usize,
    winner: Option<PlayerId>,
    moves: MoveTable,
}

impl RaceGame {
    pub fn new(players: Vec<PlayerRecord>) -> Self {
        let moves = MoveTable::new(vec![MoveSpec {
            name: "dash".to_string(),
            description: "Sprint for the finish line".to_string(),
            params: vec![],
            needs_current_turn: true,
        }]);
        Self {
            players,
            turn: 0,
            winner: None,
            moves,
        }
    }
}

impl GameEngine for RaceGame {
    fn moves(&self) -> &MoveTable {
        &self.moves
    }

    fn current_turn(&self) -> PlayerId {
        self.players[self.turn].id
    }

    fn invoke(
        &mut self,
        name: &str,
        player: &PlayerRecord,
        _args: &MoveArgs,
    ) -> Result<Option<MoveReply>, EngineError> {
        match name {
            "dash" => {
                self.winner = Some(player.id);
                Ok(Some(MoveReply::new("First across the line!")))
            }
            other => Err(EngineError::UnknownMove(other.to_string())),
        }
    }

    fn state(&self) -> Vec<Directive> {
        vec![Directive::Field {
            name: "Race".to_string(),
            value: format!("{} runners at the line", self.players.len()),
            inline: false,
        }]
    }

    fn outcome(&self) -> Option<Outcome> {
        let winner = self.winner?;
        let rest: Vec<PlayerId> = self
            .players
            .iter()
            .map(|p| p.id)
            .filter(|id| *id != winner)
            .collect();
        Some(Outcome::Placements(vec![vec![winner], rest]))
    }
}

/// The standard catalog plus the race game for tie-group scenarios.
pub fn test_catalog() -> GameCatalog {
    let mut catalog = standard_catalog();
    catalog.register(
        GameKindSpec::new(
            "race",
            "Footrace",
            PlayerCountSpec::AnyOf(vec![3, 4]),
            Box::new(|players| Box::new(RaceGame::new(players))),
        )
        .with_description("First one over the line wins."),
    );
    catalog
}

pub struct TestApp {
    pub state: AppState,
    pub catalog: Arc<GameCatalog>,
    pub players: Arc<InMemoryPlayerRepository>,
    pub renderer: Arc<RecordingRenderer>,
    pub directory: Arc<SessionDirectory>,
}

impl TestApp {
    pub fn new() -> Self {
        let catalog = Arc::new(test_catalog());
        let players = Arc::new(InMemoryPlayerRepository::new(catalog.clone()));
        let renderer = Arc::new(RecordingRenderer::new());
        let directory = Arc::new(SessionDirectory::new());
        let state = AppState::new(
            catalog.clone(),
            players.clone(),
            renderer.clone(),
            directory.clone(),
        );
        Self {
            state,
            catalog,
            players,
            renderer,
            directory,
        }
    }

    pub fn deps(&self) -> CoreDeps {
        self.state.deps()
    }

    /// Router mirroring the production wiring.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/lobbies", post(matchmaking::handlers::create_lobby))
            .route("/lobbies/:id", get(matchmaking::handlers::get_lobby))
            .route("/lobbies/:id/join", post(matchmaking::handlers::join_lobby))
            .route(
                "/lobbies/:id/leave",
                post(matchmaking::handlers::leave_lobby),
            )
            .route(
                "/lobbies/:id/invite/accept",
                post(matchmaking::handlers::accept_invite),
            )
            .route("/lobbies/:id/kick", post(matchmaking::handlers::kick_player))
            .route("/lobbies/:id/ban", post(matchmaking::handlers::ban_player))
            .route(
                "/lobbies/:id/start",
                post(matchmaking::handlers::start_lobby),
            )
            .route("/games/:id", get(game::handlers::get_game))
            .route("/games/:id/move", post(game::handlers::command_move))
            .route("/games/:id/button", post(game::handlers::button_move))
            .with_state(self.state.clone())
    }
}

pub fn user(name: &str) -> UserRef {
    UserRef::new(PlayerId::new(), name)
}
