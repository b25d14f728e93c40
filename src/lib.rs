// Library crate for the playhall game platform
// This file exposes the public API for integration tests

pub mod catalog;
pub mod engine;
pub mod game;
pub mod games;
pub mod matchmaking;
pub mod player;
pub mod rating;
pub mod registry;
pub mod render;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use catalog::{GameCatalog, GameKindSpec, PlayerCountSpec};
pub use engine::{Directive, GameEngine, MoveArgs, Outcome};
pub use game::{GameSession, MoveOutcome};
pub use matchmaking::{MatchmakingSession, PromotionTicket, StartOutcome};
pub use player::{PlayerId, PlayerRecord, PlayerRepository, UserRef};
pub use registry::SessionDirectory;
pub use render::{EventRenderer, RecordingRenderer, RenderEvent, Renderer};
pub use shared::{AppError, AppState, CoreDeps};
