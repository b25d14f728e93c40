use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use super::session::MoveOutcome;
use super::types::{ButtonMoveRequest, CommandMoveRequest, GameResponse, MoveResponse};
use crate::engine::MoveArgs;
use crate::shared::{AppError, AppState};

/// GET /games/:id — current game summary
#[instrument(name = "get_game", skip(state))]
pub async fn get_game(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<GameResponse>, AppError> {
    let session = state
        .directory
        .game(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;
    Ok(Json(GameResponse::from_session(&session).await))
}

/// POST /games/:id/move — typed command invocation
#[instrument(name = "command_move", skip(state, request))]
pub async fn command_move(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<CommandMoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let session = state
        .directory
        .game(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

    let spec = session
        .moves()
        .get(&request.name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown move '{}'", request.name)))?;
    let current_turn_required = spec.needs_current_turn;
    let args = MoveArgs::from_json(spec, &request.arguments)
        .map_err(|e| AppError::Rejected(e.to_string()))?;

    let outcome = session
        .move_by_command(&request.user, &request.name, args, current_turn_required)
        .await;
    Ok(Json(move_response(outcome)?))
}

/// POST /games/:id/button — button-click invocation with string-encoded
/// arguments
#[instrument(name = "button_move", skip(state, request))]
pub async fn button_move(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ButtonMoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let session = state
        .directory
        .game(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound("Game not found".to_string()))?;

    let outcome = session
        .move_by_button(
            &request.user,
            &request.callback,
            &request.arguments,
            request.current_turn_required,
        )
        .await;
    Ok(Json(move_response(outcome)?))
}

fn move_response(outcome: MoveOutcome) -> Result<MoveResponse, AppError> {
    match outcome {
        MoveOutcome::Applied => Ok(MoveResponse::new("applied")),
        MoveOutcome::Completed => Ok(MoveResponse::new("game_over")),
        MoveOutcome::Dropped => Ok(MoveResponse::new("dropped")),
        MoveOutcome::Rejected { reason } => Err(AppError::Rejected(reason)),
        MoveOutcome::EngineFailed { reason } => {
            Ok(MoveResponse::with_detail("move_failed", reason))
        }
    }
}
