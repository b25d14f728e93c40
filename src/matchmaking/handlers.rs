use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::session::{
    BanOutcome, CreateLobbyError, JoinOutcome, KickOutcome, LeaveOutcome, MatchmakingSession,
    StartOutcome,
};
use super::types::{
    ActionResponse, CreateLobbyRequest, LobbyActionRequest, LobbyResponse, ModerationRequest,
    StartResponse,
};
use crate::shared::{AppError, AppState};

impl From<CreateLobbyError> for AppError {
    fn from(err: CreateLobbyError) -> Self {
        match err {
            CreateLobbyError::UnknownGameKind(kind) => {
                AppError::NotFound(format!("Unknown game kind '{kind}'"))
            }
            CreateLobbyError::StoreUnavailable(e) => e.into(),
        }
    }
}

/// POST /lobbies — open a matchmaking lobby
#[instrument(name = "create_lobby", skip(state, request))]
pub async fn create_lobby(
    State(state): State<AppState>,
    Json(request): Json<CreateLobbyRequest>,
) -> Result<Json<LobbyResponse>, AppError> {
    let spec = state
        .catalog
        .get(&request.game_kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown game kind '{}'", request.game_kind)))?;
    let rated = request.rated.unwrap_or(spec.rated_by_default);

    let session = MatchmakingSession::create(
        state.deps(),
        state.catalog.clone(),
        &request.user,
        &request.game_kind,
        rated,
        request.private,
    )
    .await?;

    let response = LobbyResponse::from_session(&*session.lock().await);
    info!(lobby_id = %response.lobby_id, "Lobby created");
    Ok(Json(response))
}

/// GET /lobbies/:id — current lobby summary
#[instrument(name = "get_lobby", skip(state))]
pub async fn get_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
) -> Result<Json<LobbyResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;
    let response = LobbyResponse::from_session(&*session.lock().await);
    Ok(Json(response))
}

/// POST /lobbies/:id/join — a player asks to join the queue
#[instrument(name = "join_lobby", skip(state, request))]
pub async fn join_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<LobbyActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = session.lock().await.join(&request.user).await?;
    match outcome {
        JoinOutcome::Joined => Ok(Json(ActionResponse::new("joined"))),
        JoinOutcome::AlreadyQueued => Err(AppError::Rejected(
            "You are already in the game!".to_string(),
        )),
        JoinOutcome::NotInvited => Err(AppError::Rejected(
            "You are not on the whitelist for this private game!".to_string(),
        )),
        JoinOutcome::Banned { creator_mention } => Err(AppError::Rejected(format!(
            "You are banned from this game! Ask the owner of the game {creator_mention} to unban you!"
        ))),
    }
}

/// POST /lobbies/:id/invite/accept — a player accepts an out-of-band invite
#[instrument(name = "accept_invite", skip(state, request))]
pub async fn accept_invite(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<LobbyActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = session.lock().await.accept_invite(&request.user).await?;
    match outcome {
        JoinOutcome::Joined => Ok(Json(ActionResponse::new("joined"))),
        JoinOutcome::AlreadyQueued => Err(AppError::Rejected(
            "You are already in the game!".to_string(),
        )),
        // accept_invite bypasses both lists; these outcomes cannot happen
        JoinOutcome::NotInvited | JoinOutcome::Banned { .. } => Err(AppError::Internal),
    }
}

/// POST /lobbies/:id/leave — a queued player leaves
#[instrument(name = "leave_lobby", skip(state, request))]
pub async fn leave_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<LobbyActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = session.lock().await.leave(&request.user.id).await;
    match outcome {
        LeaveOutcome::Left => Ok(Json(ActionResponse::new("left"))),
        LeaveOutcome::NotQueued => {
            Err(AppError::Rejected("You aren't in the game!".to_string()))
        }
        LeaveOutcome::LobbyClosed => Ok(Json(ActionResponse::with_detail(
            "lobby_closed",
            "You were the last person in the lobby, so the game was cancelled!",
        ))),
    }
}

/// POST /lobbies/:id/kick — the creator removes a player from the queue
#[instrument(name = "kick_player", skip(state, request))]
pub async fn kick_player(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = session
        .lock()
        .await
        .kick(&request.requestor, &request.target, &request.reason)
        .await?;
    match outcome {
        KickOutcome::Kicked => Ok(Json(ActionResponse::with_detail(
            "kicked",
            format!(
                "Successfully kicked @{} from the game for reason {:?}",
                request.target.name, request.reason
            ),
        ))),
        KickOutcome::NotInLobby => Err(AppError::Rejected(format!(
            "Didn't kick anyone: @{} isn't in this lobby!",
            request.target.name
        ))),
        KickOutcome::LobbyClosed => Ok(Json(ActionResponse::new("lobby_closed"))),
        KickOutcome::NotCreator => Err(AppError::Rejected(
            "Only the creator can kick players.".to_string(),
        )),
    }
}

/// POST /lobbies/:id/ban — the creator bans a player (kick + list mutation)
#[instrument(name = "ban_player", skip(state, request))]
pub async fn ban_player(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = session
        .lock()
        .await
        .ban(&request.requestor, &request.target, &request.reason)
        .await?;
    match outcome {
        BanOutcome::Banned { kicked } => {
            let verb = if kicked { "kicked and banned" } else { "banned" };
            Ok(Json(ActionResponse::with_detail(
                "banned",
                format!(
                    "Successfully {verb} @{} from the game for reason {:?}",
                    request.target.name, request.reason
                ),
            )))
        }
        BanOutcome::NotWhitelisted => Err(AppError::Rejected(
            "Can't ban someone who isn't on the whitelist anyway!".to_string(),
        )),
        BanOutcome::LobbyClosed => Ok(Json(ActionResponse::new("lobby_closed"))),
        BanOutcome::NotCreator => Err(AppError::Rejected(
            "Only the creator can ban players.".to_string(),
        )),
    }
}

/// POST /lobbies/:id/start — the creator starts the game
#[instrument(name = "start_lobby", skip(state, request))]
pub async fn start_lobby(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
    Json(request): Json<LobbyActionRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let session = state
        .directory
        .lobby(&lobby_id)
        .await
        .ok_or_else(|| AppError::NotFound("Lobby not found".to_string()))?;

    let outcome = {
        let mut session = session.lock().await;
        session.start(&request.user.id).await
    };

    match outcome {
        StartOutcome::Ready(ticket) => {
            let game = super::promote(&state.deps(), &state.catalog, ticket).await?;
            Ok(Json(StartResponse {
                started: true,
                session_id: Some(game.session_id().to_string()),
                players: game.players().iter().map(|p| p.mention()).collect(),
            }))
        }
        StartOutcome::NotCreator => Err(AppError::Rejected(
            "You can't start the game (not the creator).".to_string(),
        )),
        // Declined without error: the start control is simply not available
        // at this player count
        StartOutcome::CountNotAllowed { .. } => Ok(Json(StartResponse {
            started: false,
            session_id: None,
            players: Vec::new(),
        })),
    }
}
