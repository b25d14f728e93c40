use serde::{Deserialize, Serialize};
use skillratings::{
    trueskill::{trueskill_multi_team, TrueSkillConfig, TrueSkillRating},
    MultiTeamOutcome,
};

use crate::player::PlayerRecord;

/// Global mean anchor for every rating environment. Per-kind tuning constants
/// are expressed as multipliers against this value.
pub const MU: f64 = 1200.0;

/// TrueSkill environment constants for one game kind, relative to [`MU`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingTuning {
    /// Initial uncertainty, as a fraction of `MU`.
    pub sigma: f64,
    /// Skill distance mapping to ~76% win probability, as a fraction of `MU`.
    pub beta: f64,
    /// Additive dynamics factor, as a fraction of `MU`.
    pub tau: f64,
    /// Probability of a draw under this game's rules.
    pub draw_probability: f64,
}

impl Default for RatingTuning {
    fn default() -> Self {
        Self {
            sigma: 1.0 / 3.0,
            beta: 1.0 / 6.0,
            tau: 1.0 / 30.0,
            draw_probability: 0.1,
        }
    }
}

impl RatingTuning {
    /// The uncertainty assigned to a player who has never finished a rated
    /// game of this kind.
    pub fn initial_sigma(&self) -> f64 {
        MU * self.sigma
    }
}

/// One participant's rating before and after a rated settlement.
#[derive(Debug, Clone)]
pub struct RatedPlayer {
    pub record: PlayerRecord,
    pub new_mu: f64,
    pub new_sigma: f64,
}

impl RatedPlayer {
    pub fn delta(&self) -> f64 {
        self.new_mu - self.record.mu
    }

    /// The record to persist: same identity, updated skill estimate.
    pub fn updated_record(&self) -> PlayerRecord {
        PlayerRecord {
            mu: self.new_mu,
            sigma: self.new_sigma,
            ..self.record.clone()
        }
    }
}

/// Run the tie-aware group rating update.
///
/// `groups[i]` finished with placement index `ranks[i]`; equal rank values
/// denote a tie and lower values finish better (rank 0 is the winner). Each
/// player forms their own rating group, so ties are expressed purely through
/// the ranks vector.
pub fn rate_groups(
    groups: &[PlayerRecord],
    ranks: &[usize],
    tuning: &RatingTuning,
) -> Vec<RatedPlayer> {
    debug_assert_eq!(groups.len(), ranks.len());

    let config = TrueSkillConfig {
        draw_probability: tuning.draw_probability,
        beta: MU * tuning.beta,
        default_dynamics: MU * tuning.tau,
    };

    let teams: Vec<[TrueSkillRating; 1]> = groups
        .iter()
        .map(|p| {
            [TrueSkillRating {
                rating: p.mu,
                uncertainty: p.sigma,
            }]
        })
        .collect();

    let teams_and_ranks: Vec<(&[TrueSkillRating], MultiTeamOutcome)> = teams
        .iter()
        .zip(ranks.iter())
        .map(|(team, rank)| (&team[..], MultiTeamOutcome::new(*rank)))
        .collect();

    let rerated = trueskill_multi_team(&teams_and_ranks, &config);

    groups
        .iter()
        .zip(rerated.iter())
        .map(|(record, team)| RatedPlayer {
            record: record.clone(),
            new_mu: team[0].rating,
            new_sigma: team[0].uncertainty,
        })
        .collect()
}

/// Convert a ranks vector into display places: 1-based place per entry plus
/// whether that entry shares its place with anyone else.
///
/// Places are dense over people, not over rank ids: `[0, 1, 1, 2]` renders as
/// 1st, 2nd (tied), 2nd (tied), 4th.
pub fn places(ranks: &[usize]) -> Vec<(usize, bool)> {
    let mut out = Vec::with_capacity(ranks.len());
    let mut current_place = 1;
    let mut nums_current_place = 0;
    let mut matching = 0;

    for (i, rank) in ranks.iter().enumerate() {
        if *rank == matching {
            nums_current_place += 1;
        } else {
            current_place += nums_current_place;
            matching = *rank;
            nums_current_place = 1;
        }
        let tied = ranks.iter().filter(|r| **r == ranks[i]).count() > 1;
        out.push((current_place, tied));
    }
    out
}

/// Final standings text for an unrated game: one `<place><T if tied>. <mention>`
/// line per player.
pub fn plain_standings_text(ranks: &[usize], groups: &[PlayerRecord]) -> String {
    places(ranks)
        .iter()
        .zip(groups.iter())
        .map(|((place, tied), player)| {
            format!("{place}{}. {}", tie_marker(*tied), player.mention())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Final standings text for a rated game: place, mention, prior rating, and
/// the signed rating delta.
pub fn rated_standings_text(ranks: &[usize], rated: &[RatedPlayer]) -> String {
    places(ranks)
        .iter()
        .zip(rated.iter())
        .map(|((place, tied), entry)| {
            format!(
                "{place}{}. {} {} ({:+})",
                tie_marker(*tied),
                entry.record.mention(),
                entry.record.mu.round() as i64,
                entry.delta().round() as i64,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tie_marker(tied: bool) -> &'static str {
    if tied {
        "T"
    } else {
        ""
    }
}
