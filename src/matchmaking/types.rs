use serde::{Deserialize, Serialize};

use super::session::MatchmakingSession;
use crate::player::{PlayerId, UserRef};

/// Request body for opening a lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLobbyRequest {
    pub game_kind: String,
    pub user: UserRef,
    /// Defaults to the game kind's rated-by-default flag when omitted.
    pub rated: Option<bool>,
    #[serde(default)]
    pub private: bool,
}

/// Request body for join/leave/invite-accept/start actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyActionRequest {
    pub user: UserRef,
}

/// Request body for creator-privileged kick/ban actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub requestor: PlayerId,
    pub target: UserRef,
    #[serde(default)]
    pub reason: String,
}

/// Lobby summary returned from lobby endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyResponse {
    pub lobby_id: String,
    pub game_kind: String,
    pub rated: bool,
    pub private: bool,
    pub creator: String,
    pub queued: Vec<String>,
}

impl LobbyResponse {
    pub fn from_session(session: &MatchmakingSession) -> Self {
        Self {
            lobby_id: session.lobby_id().to_string(),
            game_kind: session.game_kind().to_string(),
            rated: session.rated(),
            private: session.is_private(),
            creator: session.creator().mention(),
            queued: session
                .queued_players()
                .iter()
                .map(|p| p.mention())
                .collect(),
        }
    }
}

/// Generic acknowledgment for lobby actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub result: String,
    pub detail: Option<String>,
}

impl ActionResponse {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            detail: None,
        }
    }

    pub fn with_detail(result: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Response to a start request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub started: bool,
    pub session_id: Option<String>,
    pub players: Vec<String>,
}
