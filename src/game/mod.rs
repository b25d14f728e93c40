pub mod handlers;
pub mod session;
pub mod settlement;
pub mod types;

pub use session::{GameSession, MoveOutcome};
pub use settlement::game_over;
