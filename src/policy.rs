//! Federation rating policy: every tunable of the calculation lives here, not in
//! the engine.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the K-factor table: `k` applies from `min_games` played onwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KTier {
    pub min_games: u32,
    pub k: f64,
}

/// Threshold on points-above-expected for a bonus rule to fire, keyed by the
/// number of games played in the tournament.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BonusRule {
    pub games: u32,
    pub min_points_above: f64,
}

/// Formula deriving a provisional player's displayed rating from their
/// accumulated average opponent rating and score rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum PerformanceFormula {
    /// `avgOpp + scale * log10(s / (1 - s))`, with perfect and zero scores
    /// treated as if an extra drawn game had been played.
    LogOdds { scale: f64 },
    /// `avgOpp + constant * (s - 0.5)`.
    Linear { constant: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatingPolicy {
    /// Games needed before a rating stops being provisional.
    pub established_threshold: u32,
    /// An established rating never drops below this.
    pub rating_floor: i32,
    /// Ordered by `min_games`; the last tier at or below the player's game
    /// count wins.
    pub k_tiers: Vec<KTier>,
    pub performance: PerformanceFormula,
    /// K is doubled for the tournament when the matching entry fires.
    pub double_k: Vec<BonusRule>,
    /// The rating moves halfway to the tournament performance when the
    /// matching entry fires; only honored in FEXERJ-flagged tournaments.
    pub rating_performance: Vec<BonusRule>,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            established_threshold: 15,
            rating_floor: 1,
            k_tiers: vec![
                KTier { min_games: 0, k: 30.0 },
                KTier { min_games: 15, k: 25.0 },
                KTier { min_games: 40, k: 15.0 },
                KTier { min_games: 80, k: 10.0 },
            ],
            performance: PerformanceFormula::LogOdds { scale: 400.0 },
            double_k: vec![
                BonusRule { games: 4, min_points_above: 1.65 },
                BonusRule { games: 5, min_points_above: 1.43 },
                BonusRule { games: 6, min_points_above: 1.56 },
                BonusRule { games: 7, min_points_above: 1.69 },
            ],
            rating_performance: vec![
                BonusRule { games: 5, min_points_above: 1.84 },
                BonusRule { games: 6, min_points_above: 2.02 },
                BonusRule { games: 7, min_points_above: 2.16 },
            ],
        }
    }
}

impl RatingPolicy {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let policy: Self = toml::from_str(&text)
            .map_err(|e| RatingError::validation(format!("bad policy file {}: {e}", path.display())))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.established_threshold == 0 {
            return Err(RatingError::validation("established_threshold must be at least 1"));
        }
        match self.k_tiers.first() {
            None => return Err(RatingError::validation("k_tiers must not be empty")),
            Some(first) if first.min_games != 0 => {
                return Err(RatingError::validation("first K tier must start at 0 games"));
            }
            _ => {}
        }
        if !self.k_tiers.windows(2).all(|w| w[0].min_games < w[1].min_games) {
            return Err(RatingError::validation("k_tiers must be strictly increasing in min_games"));
        }
        Ok(())
    }

    /// Deterministic K lookup by lifetime game count. Assumes `validate` passed.
    pub fn k_for(&self, total_games: u32) -> f64 {
        self.k_tiers
            .iter()
            .take_while(|tier| tier.min_games <= total_games)
            .last()
            .map(|tier| tier.k)
            .unwrap_or_else(|| self.k_tiers[0].k)
    }

    pub fn double_k_applies(&self, games: usize, points_above: f64) -> bool {
        self.double_k
            .iter()
            .any(|rule| rule.games as usize == games && points_above >= rule.min_points_above)
    }

    pub fn rating_performance_applies(&self, games: usize, points_above: f64) -> bool {
        self.rating_performance
            .iter()
            .any(|rule| rule.games as usize == games && points_above >= rule.min_points_above)
    }

    /// Performance rating over `games` games against an average opponent
    /// rating of `avg_oppon`, scoring `points` in total.
    pub fn performance_rating(&self, avg_oppon: f64, games: u32, points: f64) -> f64 {
        let games_f = games as f64;
        match self.performance {
            PerformanceFormula::LogOdds { scale } => {
                let mut score = points / games_f;
                // A perfect (or zero) score has infinite log-odds; score it as
                // if one extra game had been drawn.
                if score == 1.0 {
                    score = (games_f + 0.5) / (games_f + 1.0);
                } else if score == 0.0 {
                    score = 0.5 / (games_f + 1.0);
                }
                avg_oppon + scale * (score / (1.0 - score)).log10()
            }
            PerformanceFormula::Linear { constant } => {
                avg_oppon + constant * (points / games_f - 0.5)
            }
        }
    }
}
