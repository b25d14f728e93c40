use serde::{Deserialize, Serialize};

use super::session::GameSession;
use crate::player::UserRef;

/// Request body for a typed command move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMoveRequest {
    pub user: UserRef,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Request body for a button-click move. Arguments arrive string-encoded as
/// `key=value,key2=value2`, exactly as the button directive emitted them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonMoveRequest {
    pub user: UserRef,
    pub callback: String,
    #[serde(default)]
    pub arguments: String,
    /// Echoed from the button directive that was clicked.
    #[serde(default = "default_true")]
    pub current_turn_required: bool,
}

fn default_true() -> bool {
    true
}

/// Acknowledgment for a dispatched move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResponse {
    pub result: String,
    pub detail: Option<String>,
}

impl MoveResponse {
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

/// Game summary returned from game endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResponse {
    pub session_id: String,
    pub game_kind: String,
    pub rated: bool,
    pub players: Vec<String>,
    pub current_turn: Option<String>,
    pub ending: bool,
}

impl GameResponse {
    pub async fn from_session(session: &GameSession) -> Self {
        Self {
            session_id: session.session_id().to_string(),
            game_kind: session.game_kind().to_string(),
            rated: session.rated(),
            players: session.players().iter().map(|p| p.mention()).collect(),
            current_turn: session.current_turn().await.map(|p| p.mention()),
            ending: session.is_ending(),
        }
    }
}
