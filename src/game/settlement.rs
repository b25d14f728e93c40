use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use super::session::GameSession;
use crate::engine::Outcome;
use crate::player::PlayerRecord;
use crate::rating;
use crate::render::NoticeTarget;

/// Terminal routine for a game session.
///
/// Marks the session ending, tears its routing entries down (on every path,
/// including the error path), computes final standings, applies and persists
/// rating updates for rated games, pushes the standings to the in-game and
/// overview surfaces, and archives the game's sub-channel.
#[instrument(skip(session, outcome), fields(session_id = %session.session_id()))]
pub async fn game_over(session: &GameSession, outcome: Outcome) {
    session.mark_ending();
    let deps = session.deps();

    // Teardown cannot be skipped on any path: no registry entry may outlive
    // the session
    deps.directory.remove_game(session.session_id()).await;

    let surface = session.surface_handle().await;

    if let Outcome::Failure(reason) = &outcome {
        error!(reason = %reason, "Game ended with a terminal engine error");
        if let Err(e) = deps
            .renderer
            .render_error(
                NoticeTarget::session(session.session_id()),
                "Error during a move!",
                reason,
            )
            .await
        {
            warn!(error = %e, "Failed to render crash report");
        }
        if let Some(surface) = &surface {
            if let Err(e) = deps
                .renderer
                .close_game_surface(surface, "Game crashed.")
                .await
            {
                warn!(error = %e, "Failed to archive crashed game surface");
            }
        }
        return;
    }

    let Some((ranks, groups)) = normalize_outcome(&outcome, session.players()) else {
        error!("Terminal outcome referenced players outside this session");
        if let Some(surface) = &surface {
            if let Err(e) = deps
                .renderer
                .close_game_surface(surface, "Game crashed.")
                .await
            {
                warn!(error = %e, "Failed to archive game surface");
            }
        }
        return;
    };

    let standings = if session.rated() {
        let rated = rating::rate_groups(&groups, &ranks, session.tuning());
        let text = rating::rated_standings_text(&ranks, &rated);

        let records: Vec<PlayerRecord> = rated.iter().map(|e| e.updated_record()).collect();
        let updates = records
            .iter()
            .map(|record| deps.players.update_player(session.game_kind(), record));
        if join_all(updates).await.iter().any(|ok| !ok) {
            error!("Failed to persist one or more rating updates");
        }
        if !deps.players.recompute_rankings(session.game_kind()).await {
            error!("Failed to recompute global rankings");
        }

        text
    } else {
        rating::plain_standings_text(&ranks, &groups)
    };

    if let Some(surface) = &surface {
        if let Err(e) = deps
            .renderer
            .render_final_standings(surface, session.overview_scope(), &standings)
            .await
        {
            warn!(error = %e, "Failed to render final standings");
        }
        if let Err(e) = deps
            .renderer
            .close_game_surface(surface, "Game is over.")
            .await
        {
            warn!(error = %e, "Failed to archive game surface");
        }
    }

    info!(rated = session.rated(), "Game settled");
}

/// Flatten a terminal outcome into parallel `(ranks, groups)` vectors:
/// `groups[i]` finished at placement index `ranks[i]`, equal ranks are ties,
/// rank 0 is first place. A single winner normalizes to `[0, 1, 1, ...]`.
///
/// Returns `None` if the outcome names a player the session does not have.
fn normalize_outcome(
    outcome: &Outcome,
    players: &[PlayerRecord],
) -> Option<(Vec<usize>, Vec<PlayerRecord>)> {
    match outcome {
        Outcome::Winner(winner_id) => {
            let winner = players.iter().find(|p| p.id == *winner_id)?.clone();
            let mut groups = vec![winner];
            let mut ranks = vec![0];
            for player in players {
                if player.id != *winner_id {
                    groups.push(player.clone());
                    ranks.push(1);
                }
            }
            Some((ranks, groups))
        }
        Outcome::Placements(placements) => {
            let mut groups = Vec::new();
            let mut ranks = Vec::new();
            for (index, group) in placements.iter().enumerate() {
                for id in group {
                    groups.push(players.iter().find(|p| p.id == *id)?.clone());
                    ranks.push(index);
                }
            }
            Some((ranks, groups))
        }
        Outcome::Failure(_) => None,
    }
}
