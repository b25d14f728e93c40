pub mod handlers;
pub mod session;
pub mod types;

pub use session::{
    BanOutcome, CreateLobbyError, JoinOutcome, KickOutcome, LeaveOutcome, MatchmakingSession,
    PromotionTicket, StartOutcome,
};

use std::sync::Arc;

use tracing::info;

use crate::catalog::GameCatalog;
use crate::game::GameSession;
use crate::player::PlayerId;
use crate::shared::{AppError, CoreDeps};

/// Hand a successful matchmaking outcome over to a new game session.
///
/// Deregisters the lobby, seats the players, opens the game surface, registers
/// the session for move routing, and pushes the first full state paint.
pub async fn promote(
    deps: &CoreDeps,
    catalog: &GameCatalog,
    ticket: PromotionTicket,
) -> Result<Arc<GameSession>, AppError> {
    let spec = catalog.get(&ticket.game_kind).ok_or_else(|| {
        AppError::NotFound(format!("unknown game kind '{}'", ticket.game_kind))
    })?;

    // The lobby is finished either way; its routing entries go first
    deps.directory.remove_lobby(&ticket.lobby_id).await;

    let session = GameSession::create(deps.clone(), spec, &ticket);
    session.setup().await?;

    let player_ids: Vec<PlayerId> = session.players().iter().map(|p| p.id).collect();
    deps.directory
        .register_game(session.session_id(), session.clone(), &player_ids)
        .await;

    session.display_state().await;

    info!(
        lobby_id = %ticket.lobby_id,
        session_id = %session.session_id(),
        game_kind = %ticket.game_kind,
        "Matchmaking promoted into a game session"
    );
    Ok(session)
}
