//! Per-player audit trail: every input to the rating formula, so a delta can be
//! re-derived by hand from the audit file alone.

use crate::constants::CSV_DELIMITER;
use crate::error::Result;
use crate::roster::Regime;
use serde::Serialize;
use std::path::Path;

/// Which branch of the calculation produced the new rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalculationRule {
    Normal,
    DoubleK,
    RatingPerformance,
    Provisional,
    /// An unrated player scoring zero in their first tournament; the result is
    /// discarded for rating purposes.
    Discarded,
}

/// One audit row per (tournament, player), in tournament-processing order.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    #[serde(rename = "Tournament")]
    pub tournament: u32,
    #[serde(rename = "Id_No")]
    pub player: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PriorRegime")]
    pub prior_regime: Regime,
    #[serde(rename = "PriorRating")]
    pub prior_rating: i32,
    #[serde(rename = "PriorGames")]
    pub prior_games: u32,
    #[serde(rename = "Rule")]
    pub rule: CalculationRule,
    #[serde(rename = "K")]
    pub k: Option<f64>,
    #[serde(rename = "Games")]
    pub games: u32,
    #[serde(rename = "AvgOpponRating")]
    pub avg_oppon_rating: f64,
    #[serde(rename = "ExpectedPoints")]
    pub expected_points: Option<f64>,
    #[serde(rename = "ActualPoints")]
    pub actual_points: f64,
    #[serde(rename = "Delta")]
    pub delta: i32,
    #[serde(rename = "NewRating")]
    pub new_rating: i32,
    #[serde(rename = "NewGames")]
    pub new_games: u32,
    #[serde(rename = "NewRegime")]
    pub new_regime: Regime,
}

#[derive(Debug, Default)]
pub struct AuditRecorder {
    rows: Vec<AuditRecord>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, row: AuditRecord) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[AuditRecord] {
        &self.rows
    }

    /// Same write-then-rename discipline as roster snapshots.
    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(CSV_DELIMITER)
                .from_path(&tmp)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
