use crate::constants::CSV_DELIMITER;
use crate::error::{RatingError, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// One row of the tournament list. `seq` (the `#` column) defines the batch
/// processing order.
#[derive(Debug, Clone, Deserialize)]
pub struct TournamentEntry {
    #[serde(rename = "#")]
    pub seq: u32,
    #[serde(rename = "CR_id")]
    pub cr_id: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "EndDate")]
    pub end_date: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "isIRT?", deserialize_with = "flag")]
    pub is_irt: bool,
    #[serde(rename = "isFEXERJ?", deserialize_with = "flag")]
    pub is_fexerj: bool,
}

/// The subset of tournament metadata the rating engine sees.
#[derive(Debug, Clone, Copy)]
pub struct TournamentFlags {
    /// Internal rating tournament; titling attribution only.
    pub is_irt: bool,
    /// Counts toward federation titles; gates the rating-performance rule.
    pub is_fexerj: bool,
}

impl TournamentEntry {
    pub fn flags(&self) -> TournamentFlags {
        TournamentFlags {
            is_irt: self.is_irt,
            is_fexerj: self.is_fexerj,
        }
    }
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match u8::deserialize(deserializer)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "flag must be 0 or 1, got {other}"
        ))),
    }
}

/// Loads the tournament list and validates that `#` is strictly increasing.
pub fn load_tournaments(path: &Path) -> Result<Vec<TournamentEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_path(path)?;
    let mut entries = Vec::new();
    for row in reader.deserialize::<TournamentEntry>() {
        let entry = row.map_err(|e| {
            RatingError::validation(format!("{}: bad tournament row: {e}", path.display()))
        })?;
        if let Some(prev) = entries.last().map(|t: &TournamentEntry| t.seq) {
            if entry.seq <= prev {
                return Err(RatingError::validation(format!(
                    "{}: tournament # must be strictly increasing ({} follows {prev})",
                    path.display(),
                    entry.seq
                )));
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}
