use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerRecord};

/// Templates for the whose-turn line, picked by weighted random draw so the
/// info panel does not repeat itself every move.
const TURN_TEMPLATES: &[(&str, u32)] = &[
    ("It's {player}'s turn!", 10),
    ("{player} is up!", 6),
    ("Waiting on {player}...", 4),
    ("{player}, make your move!", 2),
    ("All eyes on {player}.", 1),
];

/// Pick a whose-turn announcement for the given mention.
pub fn turn_announcement(mention: &str) -> String {
    let template = TURN_TEMPLATES
        .choose_weighted(&mut rand::rng(), |item| item.1)
        .map(|item| item.0)
        .unwrap_or(TURN_TEMPLATES[0].0);
    template.replace("{player}", mention)
}

/// One row of the lobby player table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyPlayerView {
    pub mention: String,
    pub rating: String,
    pub is_creator: bool,
}

/// Everything the renderer needs to paint a matchmaking lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyView {
    pub lobby_id: String,
    pub game_name: String,
    pub time_estimate: String,
    pub difficulty: String,
    pub allowed_players: String,
    pub rated: bool,
    pub private: bool,
    pub players: Vec<LobbyPlayerView>,
    /// Allow-list mentions, shown for private lobbies.
    pub whitelist: Vec<String>,
    /// Deny-list mentions, shown for public lobbies when non-empty.
    pub blacklist: Vec<String>,
    pub description: String,
    pub author: String,
    pub can_start: bool,
}

/// One row of the in-game player table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfoRow {
    pub mention: String,
    pub rating: String,
    pub is_current_turn: bool,
}

/// The info panel: title, whose-turn line, and the player table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfoView {
    pub title: String,
    pub turn_text: String,
    pub players: Vec<GameInfoRow>,
}

impl GameInfoView {
    pub fn new(
        game_name: &str,
        players: &[PlayerRecord],
        current_turn: &PlayerRecord,
    ) -> Self {
        Self {
            title: format!("Playing {} with {} players", game_name, players.len()),
            turn_text: turn_announcement(&current_turn.mention()),
            players: players
                .iter()
                .map(|p| GameInfoRow {
                    mention: p.mention(),
                    rating: p.formatted_rating(),
                    is_current_turn: p.id == current_turn.id,
                })
                .collect(),
        }
    }
}

/// The panel shown outside the game's dedicated sub-channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewView {
    pub session_id: String,
    pub game_name: String,
    pub rated: bool,
    pub players: Vec<String>,
    pub current_turn: Option<String>,
}

/// Target for an ephemeral notice or error report: a session scope, narrowed
/// to one player when the message is for them alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeTarget {
    pub session_id: String,
    pub player: Option<PlayerId>,
}

impl NoticeTarget {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            player: None,
        }
    }

    pub fn player(session_id: impl Into<String>, player: PlayerId) -> Self {
        Self {
            session_id: session_id.into(),
            player: Some(player),
        }
    }
}
