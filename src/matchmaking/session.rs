use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::catalog::GameCatalog;
use crate::player::{PlayerId, PlayerRecord, StoreError, UserRef};
use crate::render::{LobbyPlayerView, LobbyView};
use crate::shared::CoreDeps;

/// Failure creating a lobby. On either variant nothing was registered; the
/// caller renders the failure state.
#[derive(Debug, thiserror::Error)]
pub enum CreateLobbyError {
    #[error("unknown game kind '{0}'")]
    UnknownGameKind(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined,
    AlreadyQueued,
    /// Private lobby and the requestor is not on the whitelist.
    NotInvited,
    /// Public lobby and the requestor is on the blacklist.
    Banned { creator_mention: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left,
    NotQueued,
    /// The last player left; the lobby terminated without a game.
    LobbyClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KickOutcome {
    Kicked,
    NotInLobby,
    LobbyClosed,
    NotCreator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BanOutcome {
    Banned { kicked: bool },
    /// Private lobby: the target was never on the whitelist, nothing to
    /// revoke.
    NotWhitelisted,
    LobbyClosed,
    NotCreator,
}

/// Everything `promote` needs to build the game session once `start`
/// succeeds.
#[derive(Debug, Clone)]
pub struct PromotionTicket {
    pub lobby_id: String,
    pub game_kind: String,
    pub creator: PlayerRecord,
    pub players: Vec<PlayerRecord>,
    pub rated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Ready(PromotionTicket),
    NotCreator,
    /// The player-count predicate does not hold; the transition is declined
    /// without a user-visible error.
    CountNotAllowed { queued: usize },
}

impl PartialEq for PromotionTicket {
    fn eq(&self, other: &Self) -> bool {
        self.lobby_id == other.lobby_id
    }
}

/// A lobby: the pre-game state machine collecting and validating players
/// until the creator starts the game or the queue empties.
///
/// Invariants while open: the creator is always queued; in a private lobby
/// every queued player is whitelisted; in a public lobby no queued player is
/// blacklisted.
pub struct MatchmakingSession {
    lobby_id: String,
    game_kind: String,
    creator: PlayerRecord,
    rated: bool,
    private: bool,
    whitelist: HashSet<PlayerRecord>,
    blacklist: HashSet<PlayerRecord>,
    queued: HashSet<PlayerRecord>,
    /// `None` while open, `Some(true)` once promoted, `Some(false)` once
    /// terminated without a game.
    outcome: Option<bool>,
    created_at: DateTime<Utc>,
    catalog: Arc<GameCatalog>,
    deps: CoreDeps,
}

impl std::fmt::Debug for MatchmakingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchmakingSession")
            .field("lobby_id", &self.lobby_id)
            .field("game_kind", &self.game_kind)
            .field("rated", &self.rated)
            .field("private", &self.private)
            .field("outcome", &self.outcome)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl MatchmakingSession {
    /// Open a lobby for `creator` and register it for event routing.
    ///
    /// Fails without registering anything if the creator's rating cannot be
    /// fetched.
    #[instrument(skip(deps, catalog, creator), fields(creator_id = %creator.id))]
    pub async fn create(
        deps: CoreDeps,
        catalog: Arc<GameCatalog>,
        creator: &UserRef,
        game_kind: &str,
        rated: bool,
        private: bool,
    ) -> Result<Arc<Mutex<MatchmakingSession>>, CreateLobbyError> {
        if catalog.get(game_kind).is_none() {
            return Err(CreateLobbyError::UnknownGameKind(game_kind.to_string()));
        }

        let creator_record = deps.players.get_player(game_kind, creator).await?;

        let lobby_id = petname::Petnames::default().generate_one(2, "-");
        let session = MatchmakingSession {
            lobby_id: lobby_id.clone(),
            game_kind: game_kind.to_string(),
            creator: creator_record.clone(),
            rated,
            private,
            whitelist: HashSet::from([creator_record.clone()]),
            blacklist: HashSet::new(),
            queued: HashSet::from([creator_record.clone()]),
            outcome: None,
            created_at: Utc::now(),
            catalog,
            deps: deps.clone(),
        };

        let view = session.lobby_view();
        let session = Arc::new(Mutex::new(session));
        deps.directory
            .register_lobby(&lobby_id, session.clone(), &[creator_record.id])
            .await;

        if let Err(e) = deps.renderer.render_lobby(view).await {
            warn!(lobby_id = %lobby_id, error = %e, "Failed to render new lobby");
        }

        info!(lobby_id = %lobby_id, game_kind, rated, private, "Lobby created");
        Ok(session)
    }

    /// A player asks to join the queue.
    #[instrument(skip(self, user), fields(lobby_id = %self.lobby_id, player_id = %user.id))]
    pub async fn join(&mut self, user: &UserRef) -> Result<JoinOutcome, StoreError> {
        if self.is_queued(&user.id) {
            debug!("Join rejected, player already queued");
            return Ok(JoinOutcome::AlreadyQueued);
        }

        let record = self.deps.players.get_player(&self.game_kind, user).await?;

        if self.private {
            if !self.whitelist.contains(&record) {
                debug!("Join rejected, player not on whitelist of private lobby");
                return Ok(JoinOutcome::NotInvited);
            }
        } else if self.blacklist.contains(&record) {
            debug!("Join rejected, player is blacklisted");
            return Ok(JoinOutcome::Banned {
                creator_mention: self.creator.mention(),
            });
        }

        self.deps
            .directory
            .add_lobby_player(&self.lobby_id, record.id)
            .await;
        self.queued.insert(record);
        self.repaint().await;
        debug!(queued = self.queued.len(), "Player joined lobby");
        Ok(JoinOutcome::Joined)
    }

    /// A player accepts an out-of-band invitation. Same acceptance semantics
    /// as `join`, but also grants whitelist membership (private) or clears
    /// blacklist membership (public).
    #[instrument(skip(self, user), fields(lobby_id = %self.lobby_id, player_id = %user.id))]
    pub async fn accept_invite(&mut self, user: &UserRef) -> Result<JoinOutcome, StoreError> {
        if self.is_queued(&user.id) {
            debug!("Invite acceptance rejected, player already queued");
            return Ok(JoinOutcome::AlreadyQueued);
        }

        let record = self.deps.players.get_player(&self.game_kind, user).await?;

        if self.private {
            self.whitelist.insert(record.clone());
        } else {
            self.blacklist.remove(&record);
        }

        self.deps
            .directory
            .add_lobby_player(&self.lobby_id, record.id)
            .await;
        self.queued.insert(record);
        self.repaint().await;
        debug!("Invite accepted");
        Ok(JoinOutcome::Joined)
    }

    /// A player leaves the queue. The lobby terminates when the last player
    /// leaves; departing creators hand the lobby to an arbitrary remaining
    /// member.
    #[instrument(skip(self), fields(lobby_id = %self.lobby_id, player_id = %player))]
    pub async fn leave(&mut self, player: &PlayerId) -> LeaveOutcome {
        let Some(record) = self.queued.iter().find(|p| p.id == *player).cloned() else {
            debug!("Leave rejected, player not queued");
            return LeaveOutcome::NotQueued;
        };

        self.queued.remove(&record);
        self.deps.directory.remove_lobby_player(player).await;

        if self.queued.is_empty() {
            self.close("You were the last person in the lobby, so the game was cancelled!")
                .await;
            return LeaveOutcome::LobbyClosed;
        }

        if record.id == self.creator.id {
            self.transfer_creator();
        }

        self.repaint().await;
        LeaveOutcome::Left
    }

    /// The creator removes a player from the queue. List membership is left
    /// untouched; the target may rejoin.
    #[instrument(skip(self, target), fields(lobby_id = %self.lobby_id, target_id = %target.id))]
    pub async fn kick(
        &mut self,
        requestor: &PlayerId,
        target: &UserRef,
        reason: &str,
    ) -> Result<KickOutcome, StoreError> {
        if *requestor != self.creator.id {
            debug!("Kick rejected, requestor is not the creator");
            return Ok(KickOutcome::NotCreator);
        }

        let record = self.deps.players.get_player(&self.game_kind, target).await?;

        let kicked = self.queued.remove(&record);
        if kicked {
            self.deps.directory.remove_lobby_player(&record.id).await;
        }

        if self.queued.is_empty() {
            self.close("The lobby emptied out, so the game was cancelled!")
                .await;
            return Ok(KickOutcome::LobbyClosed);
        }

        if record.id == self.creator.id {
            self.transfer_creator();
        }

        if !kicked {
            debug!("Kick was a no-op, target not in lobby");
            return Ok(KickOutcome::NotInLobby);
        }

        info!(reason, "Player kicked from lobby");
        self.repaint().await;
        Ok(KickOutcome::Kicked)
    }

    /// The creator bans a player: kicks them if queued, and additionally
    /// revokes whitelist membership (private) or adds blacklist membership
    /// (public).
    #[instrument(skip(self, target), fields(lobby_id = %self.lobby_id, target_id = %target.id))]
    pub async fn ban(
        &mut self,
        requestor: &PlayerId,
        target: &UserRef,
        reason: &str,
    ) -> Result<BanOutcome, StoreError> {
        if *requestor != self.creator.id {
            debug!("Ban rejected, requestor is not the creator");
            return Ok(BanOutcome::NotCreator);
        }

        let record = self.deps.players.get_player(&self.game_kind, target).await?;

        let kicked = self.queued.remove(&record);
        if kicked {
            self.deps.directory.remove_lobby_player(&record.id).await;
        }

        if self.queued.is_empty() {
            self.close("The lobby emptied out, so the game was cancelled!")
                .await;
            return Ok(BanOutcome::LobbyClosed);
        }

        if record.id == self.creator.id {
            self.transfer_creator();
        }

        if self.private {
            if !self.whitelist.remove(&record) {
                debug!("Ban was a no-op, target not on whitelist");
                return Ok(BanOutcome::NotWhitelisted);
            }
        } else {
            self.blacklist.insert(record);
        }

        info!(reason, kicked, "Player banned from lobby");
        self.repaint().await;
        Ok(BanOutcome::Banned { kicked })
    }

    /// The creator starts the game. Declines silently unless the queued
    /// player count satisfies the game's declared count spec.
    #[instrument(skip(self), fields(lobby_id = %self.lobby_id))]
    pub async fn start(&mut self, requestor: &PlayerId) -> StartOutcome {
        if *requestor != self.creator.id {
            debug!("Start rejected, requestor is not the creator");
            return StartOutcome::NotCreator;
        }

        let allowed = self
            .catalog
            .get(&self.game_kind)
            .map(|spec| spec.player_counts.allows(self.queued.len()))
            .unwrap_or(false);
        if !allowed {
            debug!(
                queued = self.queued.len(),
                "Start declined, player count not allowed"
            );
            return StartOutcome::CountNotAllowed {
                queued: self.queued.len(),
            };
        }

        self.outcome = Some(true);
        info!(queued = self.queued.len(), "Matchmaking successful");
        StartOutcome::Ready(PromotionTicket {
            lobby_id: self.lobby_id.clone(),
            game_kind: self.game_kind.clone(),
            creator: self.creator.clone(),
            players: self.queued.iter().cloned().collect(),
            rated: self.rated,
        })
    }

    /// Current lobby panel contents.
    pub fn lobby_view(&self) -> LobbyView {
        let spec = self.catalog.get(&self.game_kind);
        let (game_name, time_estimate, difficulty, description, author, allowed_players) =
            match spec {
                Some(spec) => (
                    spec.display_name.clone(),
                    spec.time_estimate.clone(),
                    spec.difficulty.clone(),
                    spec.description.clone(),
                    spec.author.clone(),
                    spec.player_counts.describe(),
                ),
                None => Default::default(),
            };

        let can_start = spec
            .map(|s| s.player_counts.allows(self.queued.len()))
            .unwrap_or(false);

        LobbyView {
            lobby_id: self.lobby_id.clone(),
            game_name,
            time_estimate,
            difficulty,
            allowed_players,
            rated: self.rated,
            private: self.private,
            players: self
                .queued
                .iter()
                .map(|p| LobbyPlayerView {
                    mention: p.mention(),
                    rating: p.formatted_rating(),
                    is_creator: p.id == self.creator.id,
                })
                .collect(),
            whitelist: self.whitelist.iter().map(|p| p.mention()).collect(),
            blacklist: self.blacklist.iter().map(|p| p.mention()).collect(),
            description,
            author,
            can_start,
        }
    }

    async fn repaint(&self) {
        if let Err(e) = self.deps.renderer.render_lobby(self.lobby_view()).await {
            warn!(lobby_id = %self.lobby_id, error = %e, "Failed to render lobby update");
        }
    }

    /// Terminate without a game: mark the outcome, drop the routing entries,
    /// take the lobby panel down.
    async fn close(&mut self, reason: &str) {
        self.outcome = Some(false);
        self.deps.directory.remove_lobby(&self.lobby_id).await;
        if let Err(e) = self.deps.renderer.lobby_closed(&self.lobby_id, reason).await {
            warn!(lobby_id = %self.lobby_id, error = %e, "Failed to render lobby teardown");
        }
        info!(lobby_id = %self.lobby_id, "Lobby terminated without a game");
    }

    fn transfer_creator(&mut self) {
        if let Some(next) = self.queued.iter().next().cloned() {
            info!(
                lobby_id = %self.lobby_id,
                new_creator = %next.id,
                "Creator left, transferring lobby ownership"
            );
            self.creator = next;
        }
    }

    fn is_queued(&self, player: &PlayerId) -> bool {
        self.queued.iter().any(|p| p.id == *player)
    }

    pub fn lobby_id(&self) -> &str {
        &self.lobby_id
    }

    pub fn game_kind(&self) -> &str {
        &self.game_kind
    }

    pub fn creator(&self) -> &PlayerRecord {
        &self.creator
    }

    pub fn rated(&self) -> bool {
        self.rated
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn queued_players(&self) -> &HashSet<PlayerRecord> {
        &self.queued
    }

    pub fn whitelist(&self) -> &HashSet<PlayerRecord> {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &HashSet<PlayerRecord> {
        &self.blacklist
    }

    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::standard_catalog;
    use crate::player::InMemoryPlayerRepository;
    use crate::registry::SessionDirectory;
    use crate::render::{RecordingRenderer, RenderEvent};

    struct Harness {
        deps: CoreDeps,
        catalog: Arc<GameCatalog>,
        players: Arc<InMemoryPlayerRepository>,
        renderer: Arc<RecordingRenderer>,
        directory: Arc<SessionDirectory>,
    }

    fn harness() -> Harness {
        let catalog = Arc::new(standard_catalog());
        let players = Arc::new(InMemoryPlayerRepository::new(catalog.clone()));
        let renderer = Arc::new(RecordingRenderer::new());
        let directory = Arc::new(SessionDirectory::new());
        let deps = CoreDeps {
            players: players.clone(),
            renderer: renderer.clone(),
            directory: directory.clone(),
        };
        Harness {
            deps,
            catalog,
            players,
            renderer,
            directory,
        }
    }

    fn user(name: &str) -> UserRef {
        UserRef::new(PlayerId::new(), name)
    }

    async fn open_lobby(
        h: &Harness,
        creator: &UserRef,
        private: bool,
    ) -> Arc<tokio::sync::Mutex<MatchmakingSession>> {
        MatchmakingSession::create(
            h.deps.clone(),
            h.catalog.clone(),
            creator,
            "tictactoe",
            false,
            private,
        )
        .await
        .unwrap()
    }

    /// Whitelist/blacklist consistency and creator membership, checked after
    /// every mutation in these tests.
    fn assert_invariants(session: &MatchmakingSession) {
        if !session.queued_players().is_empty() {
            assert!(
                session.queued_players().contains(session.creator()),
                "creator must stay queued while the lobby is open"
            );
        }
        if session.is_private() {
            for player in session.queued_players() {
                assert!(
                    session.whitelist().contains(player),
                    "private lobby queued a non-whitelisted player"
                );
            }
        } else {
            for player in session.queued_players() {
                assert!(
                    !session.blacklist().contains(player),
                    "public lobby queued a blacklisted player"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_create_registers_lobby_and_creator() {
        let h = harness();
        let creator = user("alice");
        let session = open_lobby(&h, &creator, false).await;

        let session = session.lock().await;
        assert_eq!(session.queued_players().len(), 1);
        assert_eq!(session.creator().id, creator.id);
        assert_eq!(session.outcome(), None);
        assert_invariants(&session);

        assert_eq!(h.directory.lobby_count().await, 1);
        assert!(h.directory.player_in_lobby(&creator.id).await);
        assert!(h
            .directory
            .lobby(session.lobby_id())
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_create_fails_cleanly_when_store_is_down() {
        let h = harness();
        h.players.set_unavailable(true);

        let result = MatchmakingSession::create(
            h.deps.clone(),
            h.catalog.clone(),
            &user("alice"),
            "tictactoe",
            true,
            false,
        )
        .await;

        assert!(matches!(
            result.unwrap_err(),
            CreateLobbyError::StoreUnavailable(_)
        ));
        // Nothing was registered and nothing was rendered
        assert_eq!(h.directory.lobby_count().await, 0);
        assert!(h.renderer.events().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_game_kind() {
        let h = harness();
        let result = MatchmakingSession::create(
            h.deps.clone(),
            h.catalog.clone(),
            &user("alice"),
            "no-such-game",
            true,
            false,
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            CreateLobbyError::UnknownGameKind(_)
        ));
        assert_eq!(h.directory.lobby_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_public_lobby() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        assert_eq!(session.join(&bob).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(session.queued_players().len(), 2);
        assert!(h.directory.player_in_lobby(&bob.id).await);
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let h = harness();
        let creator = user("alice");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        assert_eq!(
            session.join(&creator).await.unwrap(),
            JoinOutcome::AlreadyQueued
        );
        assert_eq!(session.queued_players().len(), 1);
    }

    #[tokio::test]
    async fn test_private_lobby_rejects_non_whitelisted_join() {
        let h = harness();
        let creator = user("alice");
        let stranger = user("mallory");
        let session = open_lobby(&h, &creator, true).await;
        let mut session = session.lock().await;

        h.renderer.clear();
        assert_eq!(
            session.join(&stranger).await.unwrap(),
            JoinOutcome::NotInvited
        );
        assert_eq!(session.queued_players().len(), 1);
        assert!(!h.directory.player_in_lobby(&stranger.id).await);
        // No lobby repaint happened for the rejected join
        assert!(h
            .renderer
            .events()
            .iter()
            .all(|e| !matches!(e, RenderEvent::LobbyUpdated { .. })));
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_blacklisted_player_cannot_join_public_lobby() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(
            session.ban(&creator.id, &bob, "spam").await.unwrap(),
            BanOutcome::Banned { kicked: true }
        );
        assert!(!h.directory.player_in_lobby(&bob.id).await);
        assert_invariants(&session);

        assert!(matches!(
            session.join(&bob).await.unwrap(),
            JoinOutcome::Banned { .. }
        ));
        assert_eq!(session.queued_players().len(), 1);
    }

    #[tokio::test]
    async fn test_leave_not_queued_rejected() {
        let h = harness();
        let session = open_lobby(&h, &user("alice"), false).await;
        let mut session = session.lock().await;

        assert_eq!(session.leave(&PlayerId::new()).await, LeaveOutcome::NotQueued);
        assert_eq!(session.queued_players().len(), 1);
    }

    #[tokio::test]
    async fn test_last_player_leaving_terminates_lobby() {
        let h = harness();
        let creator = user("alice");
        let session = open_lobby(&h, &creator, false).await;

        {
            let mut session = session.lock().await;
            assert_eq!(session.leave(&creator.id).await, LeaveOutcome::LobbyClosed);
            assert_eq!(session.outcome(), Some(false));
        }

        // All routing entries are gone; no game session was ever built
        assert_eq!(h.directory.lobby_count().await, 0);
        assert_eq!(h.directory.game_count().await, 0);
        assert!(!h.directory.player_in_lobby(&creator.id).await);
        assert!(h
            .renderer
            .events()
            .iter()
            .any(|e| matches!(e, RenderEvent::LobbyClosed { .. })));
    }

    #[tokio::test]
    async fn test_departing_creator_hands_lobby_over() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(session.leave(&creator.id).await, LeaveOutcome::Left);

        assert_eq!(session.creator().id, bob.id);
        assert_eq!(session.outcome(), None);
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_kick_requires_creator() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(
            session.kick(&bob.id, &creator, "coup").await.unwrap(),
            KickOutcome::NotCreator
        );
        assert_eq!(session.queued_players().len(), 2);
    }

    #[tokio::test]
    async fn test_kick_removes_player_without_list_mutation() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(
            session.kick(&creator.id, &bob, "afk").await.unwrap(),
            KickOutcome::Kicked
        );
        assert_eq!(session.queued_players().len(), 1);
        assert!(session.blacklist().is_empty());

        // Kicked players may rejoin
        assert_eq!(session.join(&bob).await.unwrap(), JoinOutcome::Joined);
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_kick_missing_target_is_a_noop() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let ghost = user("ghost");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(
            session.kick(&creator.id, &ghost, "who?").await.unwrap(),
            KickOutcome::NotInLobby
        );
        assert_eq!(session.queued_players().len(), 2);
    }

    #[tokio::test]
    async fn test_ban_in_private_lobby_revokes_whitelist() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, true).await;
        let mut session = session.lock().await;

        session.accept_invite(&bob).await.unwrap();
        assert!(session.whitelist().iter().any(|p| p.id == bob.id));

        assert_eq!(
            session.ban(&creator.id, &bob, "rude").await.unwrap(),
            BanOutcome::Banned { kicked: true }
        );
        assert!(!session.whitelist().iter().any(|p| p.id == bob.id));
        assert_invariants(&session);

        // And they can no longer join
        assert_eq!(session.join(&bob).await.unwrap(), JoinOutcome::NotInvited);
    }

    #[tokio::test]
    async fn test_ban_without_whitelist_membership_is_rejected() {
        let h = harness();
        let creator = user("alice");
        let stranger = user("mallory");
        let session = open_lobby(&h, &creator, true).await;
        let mut session = session.lock().await;

        assert_eq!(
            session.ban(&creator.id, &stranger, "preemptive").await.unwrap(),
            BanOutcome::NotWhitelisted
        );
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_accept_invite_clears_public_blacklist() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        session.ban(&creator.id, &bob, "mistake").await.unwrap();
        assert_eq!(session.blacklist().len(), 1);

        // An invite is the un-ban path for public lobbies
        assert_eq!(
            session.accept_invite(&bob).await.unwrap(),
            JoinOutcome::Joined
        );
        assert!(session.blacklist().is_empty());
        assert_eq!(session.queued_players().len(), 2);
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn test_start_requires_creator() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        assert_eq!(session.start(&bob.id).await, StartOutcome::NotCreator);
        assert_eq!(session.outcome(), None);
    }

    #[tokio::test]
    async fn test_start_declines_wrong_player_count() {
        let h = harness();
        let creator = user("alice");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        // Tic-Tac-Toe needs exactly two players
        assert_eq!(
            session.start(&creator.id).await,
            StartOutcome::CountNotAllowed { queued: 1 }
        );
        assert_eq!(session.outcome(), None);
    }

    #[tokio::test]
    async fn test_start_produces_promotion_ticket() {
        let h = harness();
        let creator = user("alice");
        let bob = user("bob");
        let session = open_lobby(&h, &creator, false).await;
        let mut session = session.lock().await;

        session.join(&bob).await.unwrap();
        let outcome = session.start(&creator.id).await;
        let StartOutcome::Ready(ticket) = outcome else {
            panic!("expected Ready, got {outcome:?}");
        };

        assert_eq!(session.outcome(), Some(true));
        assert_eq!(ticket.players.len(), 2);
        assert!(ticket.players.iter().any(|p| p.id == creator.id));
        assert!(ticket.players.iter().any(|p| p.id == bob.id));
        assert_eq!(ticket.game_kind, "tictactoe");
        assert!(!ticket.rated);
    }
}
