pub mod events;
pub mod views;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

pub use events::{RenderEnvelope, RenderEvent};
pub use views::{
    GameInfoRow, GameInfoView, LobbyPlayerView, LobbyView, NoticeTarget, OverviewView,
};

use crate::engine::Directive;

/// The dedicated sub-channel a game renders into, established by
/// `GameSession::setup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSurface {
    pub session_id: String,
    pub channel_id: String,
    pub title: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error("render surface unavailable: {0}")]
    Unavailable(String),
}

/// Outbound rendering boundary. Every method is fire-and-forget from the
/// core's perspective: callers log failures and carry on, they never let a
/// render error become a game-logic error.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render_lobby(&self, view: LobbyView) -> Result<(), RenderError>;

    /// The lobby ended without producing a game; its panel goes away.
    async fn lobby_closed(&self, lobby_id: &str, reason: &str) -> Result<(), RenderError>;

    /// Create the dedicated sub-channel for a new game.
    async fn open_game_surface(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<GameSurface, RenderError>;

    /// Lock and archive a game's sub-channel.
    async fn close_game_surface(
        &self,
        surface: &GameSurface,
        reason: &str,
    ) -> Result<(), RenderError>;

    async fn render_game_info(
        &self,
        surface: &GameSurface,
        info: GameInfoView,
    ) -> Result<(), RenderError>;

    async fn render_game_state(
        &self,
        surface: &GameSurface,
        directives: Vec<Directive>,
    ) -> Result<(), RenderError>;

    async fn render_overview(&self, view: OverviewView) -> Result<(), RenderError>;

    /// Transient, player-scoped notice (turn rejections, acks).
    async fn render_notice(&self, target: NoticeTarget, text: &str) -> Result<(), RenderError>;

    /// Detailed error report for the acting player and operator diagnosis.
    async fn render_error(
        &self,
        target: NoticeTarget,
        what_failed: &str,
        reason: &str,
    ) -> Result<(), RenderError>;

    /// Push final standings to both the in-game surface and the outward
    /// overview scope.
    async fn render_final_standings(
        &self,
        surface: &GameSurface,
        overview_scope: &str,
        text: &str,
    ) -> Result<(), RenderError>;
}

/// Renderer that publishes [`RenderEnvelope`]s on per-scope broadcast
/// channels. The chat transport subscribes to the scopes it displays; a send
/// with no receivers is normal and not an error.
#[derive(Debug, Clone, Default)]
pub struct EventRenderer {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<RenderEnvelope>>>>,
}

impl EventRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to render events for a session scope.
    pub async fn subscribe(&self, scope: &str) -> broadcast::Receiver<RenderEnvelope> {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(scope) {
            sender.subscribe()
        } else {
            drop(channels);
            let mut channels = self.channels.write().await;
            let sender = channels
                .entry(scope.to_string())
                .or_insert_with(|| broadcast::channel(100).0);
            sender.subscribe()
        }
    }

    async fn emit(&self, event: RenderEvent) {
        let scope = event.scope().to_string();
        let event_type = event.event_type();
        let envelope = RenderEnvelope::new(event);

        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(&scope) {
            if sender.send(envelope).is_err() {
                debug!(scope = %scope, event_type, "Render event emitted with no receivers");
            }
            return;
        }
        drop(channels);

        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(scope.clone())
            .or_insert_with(|| broadcast::channel(100).0)
            .clone();
        if sender.send(envelope).is_err() {
            debug!(scope = %scope, event_type, "Render event emitted with no receivers");
        }
    }
}

#[async_trait]
impl Renderer for EventRenderer {
    async fn render_lobby(&self, view: LobbyView) -> Result<(), RenderError> {
        self.emit(RenderEvent::LobbyUpdated { lobby: view }).await;
        Ok(())
    }

    async fn lobby_closed(&self, lobby_id: &str, reason: &str) -> Result<(), RenderError> {
        self.emit(RenderEvent::LobbyClosed {
            lobby_id: lobby_id.to_string(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn open_game_surface(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<GameSurface, RenderError> {
        let surface = GameSurface {
            session_id: session_id.to_string(),
            channel_id: format!("table-{}", Uuid::new_v4()),
            title: title.to_string(),
        };
        self.emit(RenderEvent::SurfaceOpened {
            session_id: surface.session_id.clone(),
            surface_id: surface.channel_id.clone(),
            title: surface.title.clone(),
        })
        .await;
        Ok(surface)
    }

    async fn close_game_surface(
        &self,
        surface: &GameSurface,
        reason: &str,
    ) -> Result<(), RenderError> {
        self.emit(RenderEvent::SurfaceClosed {
            surface_id: surface.channel_id.clone(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn render_game_info(
        &self,
        surface: &GameSurface,
        info: GameInfoView,
    ) -> Result<(), RenderError> {
        self.emit(RenderEvent::GameInfo {
            surface_id: surface.channel_id.clone(),
            info,
        })
        .await;
        Ok(())
    }

    async fn render_game_state(
        &self,
        surface: &GameSurface,
        directives: Vec<Directive>,
    ) -> Result<(), RenderError> {
        self.emit(RenderEvent::GameState {
            surface_id: surface.channel_id.clone(),
            directives,
        })
        .await;
        Ok(())
    }

    async fn render_overview(&self, view: OverviewView) -> Result<(), RenderError> {
        self.emit(RenderEvent::Overview { view }).await;
        Ok(())
    }

    async fn render_notice(&self, target: NoticeTarget, text: &str) -> Result<(), RenderError> {
        self.emit(RenderEvent::Notice {
            target,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn render_error(
        &self,
        target: NoticeTarget,
        what_failed: &str,
        reason: &str,
    ) -> Result<(), RenderError> {
        self.emit(RenderEvent::ErrorReport {
            target,
            what_failed: what_failed.to_string(),
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn render_final_standings(
        &self,
        surface: &GameSurface,
        overview_scope: &str,
        text: &str,
    ) -> Result<(), RenderError> {
        self.emit(RenderEvent::FinalStandings {
            session_id: surface.session_id.clone(),
            surface_id: surface.channel_id.clone(),
            text: text.to_string(),
        })
        .await;
        self.emit(RenderEvent::FinalStandings {
            session_id: overview_scope.to_string(),
            surface_id: surface.channel_id.clone(),
            text: text.to_string(),
        })
        .await;
        Ok(())
    }
}

/// Renderer test double that records every event and can be told to fail,
/// for asserting that render failures are logged and never propagated.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<RenderEvent>>,
    failing: AtomicBool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, event: RenderEvent) -> Result<(), RenderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("simulated failure".to_string()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render_lobby(&self, view: LobbyView) -> Result<(), RenderError> {
        self.record(RenderEvent::LobbyUpdated { lobby: view })
    }

    async fn lobby_closed(&self, lobby_id: &str, reason: &str) -> Result<(), RenderError> {
        self.record(RenderEvent::LobbyClosed {
            lobby_id: lobby_id.to_string(),
            reason: reason.to_string(),
        })
    }

    async fn open_game_surface(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<GameSurface, RenderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("simulated failure".to_string()));
        }
        let surface = GameSurface {
            session_id: session_id.to_string(),
            channel_id: format!("table-{}", Uuid::new_v4()),
            title: title.to_string(),
        };
        self.record(RenderEvent::SurfaceOpened {
            session_id: surface.session_id.clone(),
            surface_id: surface.channel_id.clone(),
            title: surface.title.clone(),
        })?;
        Ok(surface)
    }

    async fn close_game_surface(
        &self,
        surface: &GameSurface,
        reason: &str,
    ) -> Result<(), RenderError> {
        self.record(RenderEvent::SurfaceClosed {
            surface_id: surface.channel_id.clone(),
            reason: reason.to_string(),
        })
    }

    async fn render_game_info(
        &self,
        surface: &GameSurface,
        info: GameInfoView,
    ) -> Result<(), RenderError> {
        self.record(RenderEvent::GameInfo {
            surface_id: surface.channel_id.clone(),
            info,
        })
    }

    async fn render_game_state(
        &self,
        surface: &GameSurface,
        directives: Vec<Directive>,
    ) -> Result<(), RenderError> {
        self.record(RenderEvent::GameState {
            surface_id: surface.channel_id.clone(),
            directives,
        })
    }

    async fn render_overview(&self, view: OverviewView) -> Result<(), RenderError> {
        self.record(RenderEvent::Overview { view })
    }

    async fn render_notice(&self, target: NoticeTarget, text: &str) -> Result<(), RenderError> {
        self.record(RenderEvent::Notice {
            target,
            text: text.to_string(),
        })
    }

    async fn render_error(
        &self,
        target: NoticeTarget,
        what_failed: &str,
        reason: &str,
    ) -> Result<(), RenderError> {
        self.record(RenderEvent::ErrorReport {
            target,
            what_failed: what_failed.to_string(),
            reason: reason.to_string(),
        })
    }

    async fn render_final_standings(
        &self,
        surface: &GameSurface,
        overview_scope: &str,
        text: &str,
    ) -> Result<(), RenderError> {
        self.record(RenderEvent::FinalStandings {
            session_id: surface.session_id.clone(),
            surface_id: surface.channel_id.clone(),
            text: text.to_string(),
        })?;
        self.record(RenderEvent::FinalStandings {
            session_id: overview_scope.to_string(),
            surface_id: surface.channel_id.clone(),
            text: text.to_string(),
        })
    }
}
