use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::game::GameSession;
use crate::matchmaking::MatchmakingSession;
use crate::player::PlayerId;

#[derive(Default)]
struct DirectoryInner {
    /// Lobby id -> live matchmaking session.
    lobbies: HashMap<String, Arc<Mutex<MatchmakingSession>>>,
    /// Game session id -> live game session.
    games: HashMap<String, Arc<GameSession>>,
    /// Player -> owning lobby id.
    in_lobby: HashMap<PlayerId, String>,
    /// Player -> owning game session id.
    in_game: HashMap<PlayerId, String>,
}

/// Process-wide routing maps: every inbound event is resolved here to the
/// live session that owns it.
///
/// All four maps live behind one lock so a register or teardown is a single
/// atomic step; no entry can outlive its owning session because teardown is
/// one call that clears the session and every player pointing at it.
#[derive(Default)]
pub struct SessionDirectory {
    inner: RwLock<DirectoryInner>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_lobby(
        &self,
        lobby_id: &str,
        session: Arc<Mutex<MatchmakingSession>>,
        players: &[PlayerId],
    ) {
        let mut inner = self.inner.write().await;
        inner.lobbies.insert(lobby_id.to_string(), session);
        for player in players {
            inner.in_lobby.insert(*player, lobby_id.to_string());
        }
        debug!(lobby_id, "Lobby registered");
    }

    pub async fn add_lobby_player(&self, lobby_id: &str, player: PlayerId) {
        let mut inner = self.inner.write().await;
        inner.in_lobby.insert(player, lobby_id.to_string());
    }

    pub async fn remove_lobby_player(&self, player: &PlayerId) {
        let mut inner = self.inner.write().await;
        inner.in_lobby.remove(player);
    }

    /// Tear down a lobby: the session entry and every player routed to it.
    pub async fn remove_lobby(&self, lobby_id: &str) {
        let mut inner = self.inner.write().await;
        inner.lobbies.remove(lobby_id);
        inner.in_lobby.retain(|_, id| id != lobby_id);
        debug!(lobby_id, "Lobby deregistered");
    }

    pub async fn lobby(&self, lobby_id: &str) -> Option<Arc<Mutex<MatchmakingSession>>> {
        self.inner.read().await.lobbies.get(lobby_id).cloned()
    }

    pub async fn lobby_for_player(
        &self,
        player: &PlayerId,
    ) -> Option<Arc<Mutex<MatchmakingSession>>> {
        let inner = self.inner.read().await;
        let lobby_id = inner.in_lobby.get(player)?;
        inner.lobbies.get(lobby_id).cloned()
    }

    pub async fn register_game(
        &self,
        session_id: &str,
        session: Arc<GameSession>,
        players: &[PlayerId],
    ) {
        let mut inner = self.inner.write().await;
        inner.games.insert(session_id.to_string(), session);
        for player in players {
            inner.in_game.insert(*player, session_id.to_string());
        }
        debug!(session_id, "Game registered");
    }

    /// Tear down a game: the session entry and every player routed to it.
    pub async fn remove_game(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        inner.games.remove(session_id);
        inner.in_game.retain(|_, id| id != session_id);
        debug!(session_id, "Game deregistered");
    }

    pub async fn game(&self, session_id: &str) -> Option<Arc<GameSession>> {
        self.inner.read().await.games.get(session_id).cloned()
    }

    pub async fn game_for_player(&self, player: &PlayerId) -> Option<Arc<GameSession>> {
        let inner = self.inner.read().await;
        let session_id = inner.in_game.get(player)?;
        inner.games.get(session_id).cloned()
    }

    pub async fn player_in_lobby(&self, player: &PlayerId) -> bool {
        self.inner.read().await.in_lobby.contains_key(player)
    }

    pub async fn player_in_game(&self, player: &PlayerId) -> bool {
        self.inner.read().await.in_game.contains_key(player)
    }

    pub async fn lobby_count(&self) -> usize {
        self.inner.read().await.lobbies.len()
    }

    pub async fn game_count(&self) -> usize {
        self.inner.read().await.games.len()
    }
}
