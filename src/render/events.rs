use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::views::{GameInfoView, LobbyView, NoticeTarget, OverviewView};
use crate::engine::Directive;

/// Everything the core pushes outward, as facts about what should now be on
/// screen. The chat transport subscribes per session scope and paints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RenderEvent {
    /// The lobby panel changed (players joined/left, lists changed).
    LobbyUpdated { lobby: LobbyView },

    /// The lobby was torn down without producing a game.
    LobbyClosed { lobby_id: String, reason: String },

    /// A dedicated game sub-channel was opened.
    SurfaceOpened {
        session_id: String,
        surface_id: String,
        title: String,
    },

    /// The game sub-channel was locked and archived.
    SurfaceClosed { surface_id: String, reason: String },

    /// The info panel (title, whose-turn, player table) changed.
    GameInfo {
        surface_id: String,
        info: GameInfoView,
    },

    /// The state panel changed; directives already filtered to their limits.
    GameState {
        surface_id: String,
        directives: Vec<Directive>,
    },

    /// The outward-facing overview panel changed.
    Overview { view: OverviewView },

    /// Transient, player-scoped notice (rejections, acks).
    Notice { target: NoticeTarget, text: String },

    /// Detailed error report for the acting player and operators.
    ErrorReport {
        target: NoticeTarget,
        what_failed: String,
        reason: String,
    },

    /// Final standings text, pushed to the game surface and overview.
    FinalStandings {
        session_id: String,
        surface_id: String,
        text: String,
    },
}

impl RenderEvent {
    /// The session scope this event routes under.
    pub fn scope(&self) -> &str {
        match self {
            RenderEvent::LobbyUpdated { lobby } => &lobby.lobby_id,
            RenderEvent::LobbyClosed { lobby_id, .. } => lobby_id,
            RenderEvent::SurfaceOpened { session_id, .. } => session_id,
            RenderEvent::SurfaceClosed { surface_id, .. } => surface_id,
            RenderEvent::GameInfo { surface_id, .. } => surface_id,
            RenderEvent::GameState { surface_id, .. } => surface_id,
            RenderEvent::Overview { view } => &view.session_id,
            RenderEvent::Notice { target, .. } => &target.session_id,
            RenderEvent::ErrorReport { target, .. } => &target.session_id,
            RenderEvent::FinalStandings { session_id, .. } => session_id,
        }
    }

    /// Short tag for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            RenderEvent::LobbyUpdated { .. } => "lobby_updated",
            RenderEvent::LobbyClosed { .. } => "lobby_closed",
            RenderEvent::SurfaceOpened { .. } => "surface_opened",
            RenderEvent::SurfaceClosed { .. } => "surface_closed",
            RenderEvent::GameInfo { .. } => "game_info",
            RenderEvent::GameState { .. } => "game_state",
            RenderEvent::Overview { .. } => "overview",
            RenderEvent::Notice { .. } => "notice",
            RenderEvent::ErrorReport { .. } => "error_report",
            RenderEvent::FinalStandings { .. } => "final_standings",
        }
    }
}

/// A render event plus emission metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: RenderEvent,
}

impl RenderEnvelope {
    pub fn new(event: RenderEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
