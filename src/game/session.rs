use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::catalog::GameKindSpec;
use crate::engine::{Directive, DirectiveKind, GameEngine, MoveArgs, MoveTable};
use crate::matchmaking::PromotionTicket;
use crate::player::{PlayerRecord, UserRef};
use crate::rating::RatingTuning;
use crate::render::{GameInfoView, GameSurface, NoticeTarget, OverviewView};
use crate::shared::{AppError, CoreDeps};

use super::settlement;

/// Result of dispatching one move event.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Move applied; the game continues.
    Applied,
    /// Move applied and the game reached a terminal outcome; settlement ran.
    Completed,
    /// Dropped without a user-visible response: the session is ending or not
    /// yet set up.
    Dropped,
    /// Rejected with a user-visible notice; no state changed.
    Rejected { reason: String },
    /// The engine failed applying the move. An error report was rendered to
    /// the acting player; the session stays active.
    EngineFailed { reason: String },
}

/// One in-progress game: wraps the game engine, serializes concurrent move
/// attempts, tracks whose turn it is, and hands terminal outcomes to
/// settlement.
///
/// Seating order is fixed at creation (shuffled once, never reordered); only
/// the current turn advances. Once `ending` is set no further moves are
/// accepted.
pub struct GameSession {
    session_id: String,
    game_kind: String,
    game_name: String,
    tuning: RatingTuning,
    creator: PlayerRecord,
    players: Vec<PlayerRecord>,
    rated: bool,
    /// Scope of the outward-facing overview panel (the originating lobby).
    overview_scope: String,
    moves: MoveTable,
    engine: Mutex<Box<dyn GameEngine>>,
    /// Serialization point: held for the whole of move processing, from the
    /// turn check through the outcome check.
    processing_move: Mutex<()>,
    ending: AtomicBool,
    current_turn: RwLock<Option<PlayerRecord>>,
    surface: Mutex<Option<GameSurface>>,
    started_at: DateTime<Utc>,
    deps: CoreDeps,
}

impl GameSession {
    /// Build the session from a successful matchmaking ticket. Seating order
    /// is decided here, once.
    pub fn create(deps: CoreDeps, spec: &GameKindSpec, ticket: &PromotionTicket) -> Arc<Self> {
        let mut players = ticket.players.clone();
        players.shuffle(&mut rand::rng());

        let engine = spec.construct(players.clone());
        let moves = engine.moves().clone();

        Arc::new(Self {
            session_id: Uuid::new_v4().to_string(),
            game_kind: ticket.game_kind.clone(),
            game_name: spec.display_name.clone(),
            tuning: spec.tuning,
            creator: ticket.creator.clone(),
            players,
            rated: ticket.rated,
            overview_scope: ticket.lobby_id.clone(),
            moves,
            engine: Mutex::new(engine),
            processing_move: Mutex::new(()),
            ending: AtomicBool::new(false),
            current_turn: RwLock::new(None),
            surface: Mutex::new(None),
            started_at: Utc::now(),
            deps,
        })
    }

    /// One-time post-construction step: open the dedicated sub-channel and
    /// paint placeholder state. Must complete before any move is accepted;
    /// moves arriving earlier are dropped.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn setup(&self) -> Result<(), AppError> {
        let rated_prefix = if self.rated { "Rated " } else { "" };
        let title = format!("{}{} game", rated_prefix, self.game_name);

        let surface = self
            .deps
            .renderer
            .open_game_surface(&self.session_id, &title)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to open game surface");
                AppError::Internal
            })?;

        // Placeholder paint so the surface's first message belongs to us
        if let Err(e) = self
            .deps
            .renderer
            .render_game_state(&surface, Vec::new())
            .await
        {
            warn!(error = %e, "Failed to paint placeholder state");
        }

        *self.surface.lock().await = Some(surface);
        debug!("Game surface established");
        Ok(())
    }

    /// Move delivered as a typed command invocation. Arguments were already
    /// validated against the move's declared schema.
    #[instrument(skip(self, user, args), fields(session_id = %self.session_id, player_id = %user.id))]
    pub async fn move_by_command(
        &self,
        user: &UserRef,
        name: &str,
        args: MoveArgs,
        current_turn_required: bool,
    ) -> MoveOutcome {
        self.process_move(user, name, args, current_turn_required)
            .await
    }

    /// Move delivered as a button click: arguments arrive as the
    /// `key=value,key2=value2` wire string and are coerced to the declared
    /// parameter types before the engine sees them.
    #[instrument(skip(self, user, raw_args), fields(session_id = %self.session_id, player_id = %user.id))]
    pub async fn move_by_button(
        &self,
        user: &UserRef,
        callback: &str,
        raw_args: &str,
        current_turn_required: bool,
    ) -> MoveOutcome {
        let Some(spec) = self.moves.get(callback) else {
            debug!(callback, "Button callback does not name a declared move");
            let reason = format!("Unknown move '{callback}'");
            self.notice_player(user, &reason).await;
            return MoveOutcome::Rejected { reason };
        };

        let args = match MoveArgs::from_button(spec, raw_args) {
            Ok(args) => args,
            Err(e) => {
                debug!(callback, error = %e, "Button arguments failed coercion");
                let reason = e.to_string();
                self.notice_player(user, &reason).await;
                return MoveOutcome::Rejected { reason };
            }
        };

        self.process_move(user, callback, args, current_turn_required)
            .await
    }

    /// Steps 2-7 of the move contract, serialized per session.
    async fn process_move(
        &self,
        user: &UserRef,
        name: &str,
        args: MoveArgs,
        current_turn_required: bool,
    ) -> MoveOutcome {
        // Fast terminal-state guard: logged, not surfaced to the user
        if self.ending.load(Ordering::SeqCst) {
            warn!(
                move_name = name,
                "Denied move because the game is ending"
            );
            return MoveOutcome::Dropped;
        }

        let _guard = self.processing_move.lock().await;
        debug!(move_name = name, "Processing move");

        if self.surface.lock().await.is_none() {
            warn!(move_name = name, "Denied move, session not set up yet");
            return MoveOutcome::Dropped;
        }

        // Re-check under the lock: settlement may have finished while this
        // move waited its turn
        if self.ending.load(Ordering::SeqCst) {
            warn!(
                move_name = name,
                "Denied move because the game ended while it was queued"
            );
            return MoveOutcome::Dropped;
        }

        let turn_id = self.engine.lock().await.current_turn();
        let turn_record = self.players.iter().find(|p| p.id == turn_id).cloned();
        *self.current_turn.write().await = turn_record;

        if current_turn_required && user.id != turn_id {
            debug!(
                move_name = name,
                current_turn = %turn_id,
                "Denied move, not this player's turn"
            );
            let reason = "It isn't your turn right now!".to_string();
            self.notice_player(user, &reason).await;
            return MoveOutcome::Rejected { reason };
        }

        let record = match self.deps.players.get_player(&self.game_kind, user).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Player store unreachable during move");
                let reason =
                    "Couldn't connect to the database! Try again later.".to_string();
                self.notice_player(user, &reason).await;
                return MoveOutcome::Rejected { reason };
            }
        };

        let invoked = self.engine.lock().await.invoke(name, &record, &args);
        match invoked {
            Err(e) => {
                // Recoverable: report to the acting player, keep playing
                error!(move_name = name, error = %e, "Engine failed applying move");
                if let Err(render_err) = self
                    .deps
                    .renderer
                    .render_error(
                        NoticeTarget::player(self.session_id.clone(), user.id),
                        "Error occurred while making a move!",
                        &e.to_string(),
                    )
                    .await
                {
                    warn!(error = %render_err, "Failed to render move error report");
                }
                return MoveOutcome::EngineFailed {
                    reason: e.to_string(),
                };
            }
            Ok(Some(reply)) => self.notice_player(user, &reply.text).await,
            Ok(None) => {}
        }

        self.display_state().await;

        let outcome = self.engine.lock().await.outcome();
        if let Some(outcome) = outcome {
            debug!(?outcome, "Received terminal game outcome, ending game");
            self.notice_player(user, "Game over!").await;
            settlement::game_over(self, outcome).await;
            return MoveOutcome::Completed;
        }

        MoveOutcome::Applied
    }

    /// Rebuild and push the three render surfaces: the info panel, the state
    /// panel, and the outward overview. Safe to call redundantly; nothing is
    /// mutated beyond the cached current turn.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn display_state(&self) {
        let (turn_id, directives) = {
            let engine = self.engine.lock().await;
            (engine.current_turn(), engine.state())
        };
        let turn_record = self.players.iter().find(|p| p.id == turn_id).cloned();
        *self.current_turn.write().await = turn_record.clone();

        let Some(surface) = self.surface.lock().await.clone() else {
            warn!("Skipping repaint, session not set up yet");
            return;
        };

        if let Some(turn) = &turn_record {
            let info = GameInfoView::new(&self.game_name, &self.players, turn);
            if let Err(e) = self.deps.renderer.render_game_info(&surface, info).await {
                warn!(error = %e, "Failed to render info panel");
            }
        }

        let panel = self.enforce_limits(directives);
        if let Err(e) = self.deps.renderer.render_game_state(&surface, panel).await {
            warn!(error = %e, "Failed to render state panel");
        }

        let overview = OverviewView {
            session_id: self.overview_scope.clone(),
            game_name: self.game_name.clone(),
            rated: self.rated,
            players: self.players.iter().map(|p| p.mention()).collect(),
            current_turn: turn_record.map(|t| t.mention()),
        };
        if let Err(e) = self.deps.renderer.render_overview(overview).await {
            warn!(error = %e, "Failed to render overview panel");
        }
    }

    /// Keep at most `limit()` directives of each kind, in emission order;
    /// everything over a limit is dropped and logged.
    fn enforce_limits(&self, directives: Vec<Directive>) -> Vec<Directive> {
        let mut counts: HashMap<DirectiveKind, usize> = HashMap::new();
        let mut dropped: HashMap<DirectiveKind, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(directives.len());

        for directive in directives {
            let kind = directive.kind();
            let seen = counts.entry(kind).or_insert(0);
            *seen += 1;
            if *seen > kind.limit() {
                *dropped.entry(kind).or_insert(0) += 1;
            } else {
                kept.push(directive);
            }
        }

        for kind in DirectiveKind::iter() {
            if let Some(count) = dropped.get(&kind) {
                warn!(
                    session_id = %self.session_id,
                    game_kind = %self.game_kind,
                    kind = %kind,
                    dropped = count,
                    limit = kind.limit(),
                    "Discarded state directives over the per-kind limit; this could cause a bad paint"
                );
            }
        }

        kept
    }

    async fn notice_player(&self, user: &UserRef, text: &str) {
        if let Err(e) = self
            .deps
            .renderer
            .render_notice(NoticeTarget::player(self.session_id.clone(), user.id), text)
            .await
        {
            warn!(error = %e, "Failed to render notice");
        }
    }

    pub(crate) fn mark_ending(&self) {
        self.ending.store(true, Ordering::SeqCst);
    }

    pub fn is_ending(&self) -> bool {
        self.ending.load(Ordering::SeqCst)
    }

    pub(crate) fn deps(&self) -> &CoreDeps {
        &self.deps
    }

    pub(crate) async fn surface_handle(&self) -> Option<GameSurface> {
        self.surface.lock().await.clone()
    }

    /// The engine's declared move surface.
    pub fn moves(&self) -> &MoveTable {
        &self.moves
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn game_kind(&self) -> &str {
        &self.game_kind
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn tuning(&self) -> &RatingTuning {
        &self.tuning
    }

    pub fn creator(&self) -> &PlayerRecord {
        &self.creator
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn rated(&self) -> bool {
        self.rated
    }

    pub fn overview_scope(&self) -> &str {
        &self.overview_scope
    }

    pub async fn current_turn(&self) -> Option<PlayerRecord> {
        self.current_turn.read().await.clone()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
