//! The rating engine: a pure transform from a player's pre-tournament record
//! and one tournament's games to an updated record plus its audit row.

use crate::audit::{AuditRecord, CalculationRule};
use crate::constants::ELO_STEP;
use crate::error::{RatingError, Result};
use crate::policy::RatingPolicy;
use crate::roster::{PlayerRecord, Regime};
use crate::tournaments::TournamentFlags;

/// One rated game from the player's point of view. The opponent rating is the
/// opponent's roster value as of before the tournament.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameResult {
    pub opponent_rating: i32,
    pub score: f64,
}

/// Classic expected score: strictly increasing in `own`, strictly decreasing
/// in `opponent`, always inside (0, 1).
pub fn expected_score(own: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) as f64 / ELO_STEP))
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

/// Computes the player's post-tournament record. Never mutates shared state;
/// all expected scores are taken against the same pre-tournament rating so the
/// order of games within a tournament cannot matter.
pub fn update(
    prior: &PlayerRecord,
    games: &[GameResult],
    flags: TournamentFlags,
    policy: &RatingPolicy,
    tournament: u32,
) -> Result<(PlayerRecord, AuditRecord)> {
    if games.is_empty() {
        return Err(RatingError::MalformedGame {
            id: prior.id,
            detail: "no games to rate".into(),
        });
    }
    for game in games {
        if game.score != 0.0 && game.score != 0.5 && game.score != 1.0 {
            return Err(RatingError::MalformedGame {
                id: prior.id,
                detail: format!("score {} is not 0, 0.5 or 1", game.score),
            });
        }
    }

    let num_games = games.len() as u32;
    let actual: f64 = games.iter().map(|g| g.score).sum();
    let sum_oppon: f64 = games.iter().map(|g| g.opponent_rating as f64).sum();
    let avg_oppon = sum_oppon / num_games as f64;
    let prior_regime = prior.regime(policy);

    let (updated, rule, k, expected) = match prior_regime {
        Regime::Established => {
            established_update(prior, games, flags, policy, actual, avg_oppon)?
        }
        Regime::Provisional => {
            provisional_update(prior, policy, num_games, actual, sum_oppon)?
        }
    };

    let audit = AuditRecord {
        tournament,
        player: prior.id,
        name: prior.name.clone(),
        prior_regime,
        prior_rating: prior.rating,
        prior_games: prior.total_games,
        rule,
        k,
        games: num_games,
        avg_oppon_rating: avg_oppon,
        expected_points: expected,
        actual_points: actual,
        delta: updated.rating - prior.rating,
        new_rating: updated.rating,
        new_games: updated.total_games,
        new_regime: updated.regime(policy),
    };
    Ok((updated, audit))
}

fn established_update(
    prior: &PlayerRecord,
    games: &[GameResult],
    flags: TournamentFlags,
    policy: &RatingPolicy,
    actual: f64,
    avg_oppon: f64,
) -> Result<(PlayerRecord, CalculationRule, Option<f64>, Option<f64>)> {
    let expected: f64 = games
        .iter()
        .map(|g| expected_score(prior.rating, g.opponent_rating))
        .sum();
    let points_above = actual - expected;
    let k = policy.k_for(prior.total_games);
    let num_games = games.len();

    let (rule, new_rating) =
        if flags.is_fexerj && policy.rating_performance_applies(num_games, points_above) {
            let perf = policy.performance_rating(avg_oppon, num_games as u32, actual);
            (
                CalculationRule::RatingPerformance,
                round(prior.rating as f64 + (perf - prior.rating as f64) / 2.0),
            )
        } else {
            let (rule, mult) = if policy.double_k_applies(num_games, points_above) {
                (CalculationRule::DoubleK, 2.0)
            } else {
                (CalculationRule::Normal, 1.0)
            };
            let rating = round(prior.rating as f64 + mult * k * points_above);
            (rule, rating.max(policy.rating_floor))
        };

    let updated = PlayerRecord {
        rating: new_rating,
        total_games: prior.total_games + num_games as u32,
        avg_oppon_rating: None,
        total_points: None,
        ..prior.clone()
    };
    Ok((updated, rule, Some(k), Some(expected)))
}

fn provisional_update(
    prior: &PlayerRecord,
    policy: &RatingPolicy,
    num_games: u32,
    actual: f64,
    sum_oppon: f64,
) -> Result<(PlayerRecord, CalculationRule, Option<f64>, Option<f64>)> {
    let (avg_prev, points_prev) = prior.provisional_accumulators(policy)?;

    // An unrated player whose first tournament scores zero keeps no trace of
    // it; the games are discarded for rating purposes.
    if prior.total_games == 0 && actual == 0.0 {
        return Ok((prior.clone(), CalculationRule::Discarded, None, None));
    }

    let new_games = prior.total_games + num_games;
    let new_avg = (avg_prev * prior.total_games as f64 + sum_oppon) / new_games as f64;
    let new_points = points_prev + actual;
    let performance = policy.performance_rating(new_avg, new_games, new_points);

    let established = new_games >= policy.established_threshold;
    let updated = PlayerRecord {
        rating: round(performance),
        total_games: new_games,
        // Crossing the threshold spends the estimate: the accumulators are
        // never consulted again.
        avg_oppon_rating: (!established).then_some(new_avg),
        total_points: (!established).then_some(new_points),
        ..prior.clone()
    };
    Ok((updated, CalculationRule::Provisional, None, None))
}
