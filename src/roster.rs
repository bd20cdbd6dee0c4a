//! The canonical player roster: one record per `Id_No`, loaded from and saved to
//! the semicolon-separated rating list files.

use crate::constants::CSV_DELIMITER;
use crate::error::{RatingError, Result};
use crate::policy::RatingPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    Provisional,
    Established,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Provisional => write!(f, "Provisional"),
            Regime::Established => write!(f, "Established"),
        }
    }
}

/// One row of the rating list. The accumulator columns are populated only while
/// the player's rating is provisional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(rename = "Id_No")]
    pub id: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Rtg_Nat")]
    pub rating: i32,
    #[serde(rename = "ClubName")]
    pub club: String,
    #[serde(rename = "Birthday")]
    pub birthday: String,
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "Fed")]
    pub federation: String,
    #[serde(rename = "TotalNumGames")]
    pub total_games: u32,
    #[serde(rename = "AvgOpponRating")]
    pub avg_oppon_rating: Option<f64>,
    #[serde(rename = "TotalPoints")]
    pub total_points: Option<f64>,
}

impl PlayerRecord {
    /// Established iff enough lifetime games; the transition is one-way because
    /// `total_games` never decreases.
    pub fn regime(&self, policy: &RatingPolicy) -> Regime {
        if self.total_games >= policy.established_threshold {
            Regime::Established
        } else {
            Regime::Provisional
        }
    }

    /// `(AvgOpponRating, TotalPoints)` accumulated so far under the provisional
    /// regime. Asking this of an established record is an invariant violation.
    pub fn provisional_accumulators(&self, policy: &RatingPolicy) -> Result<(f64, f64)> {
        if self.regime(policy) == Regime::Established {
            return Err(RatingError::RegimeInvariant {
                id: self.id,
                detail: "provisional accumulators requested on an established record".into(),
            });
        }
        Ok((
            self.avg_oppon_rating.unwrap_or(0.0),
            self.total_points.unwrap_or(0.0),
        ))
    }
}

/// In-memory roster, ordered by `Id_No`. The sole writer of snapshot files.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: BTreeMap<u32, PlayerRecord>,
}

impl Roster {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(CSV_DELIMITER)
            .from_path(path)?;
        let mut players = BTreeMap::new();
        for row in reader.deserialize::<PlayerRecord>() {
            let record = row.map_err(|e| {
                RatingError::validation(format!("{}: bad roster row: {e}", path.display()))
            })?;
            let id = record.id;
            if players.insert(id, record).is_some() {
                return Err(RatingError::validation(format!(
                    "{}: duplicate player id {id}",
                    path.display()
                )));
            }
        }
        Ok(Self { players })
    }

    pub fn get(&self, id: u32) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Merges one tournament's worth of updated records into a new roster.
    /// All-or-nothing: any rejected update leaves `self` untouched.
    pub fn apply_batch(
        &self,
        updates: BTreeMap<u32, PlayerRecord>,
        policy: &RatingPolicy,
    ) -> Result<Roster> {
        let mut players = self.players.clone();
        for (id, update) in updates {
            if update.id != id {
                return Err(RatingError::validation(format!(
                    "update keyed by {id} carries record for {}",
                    update.id
                )));
            }
            let prior = players.get(&id).ok_or_else(|| {
                RatingError::validation(format!("update for player {id} not present in roster"))
            })?;
            if update.total_games < prior.total_games {
                return Err(RatingError::RegimeInvariant {
                    id,
                    detail: format!(
                        "total games would shrink from {} to {}",
                        prior.total_games, update.total_games
                    ),
                });
            }
            if prior.regime(policy) == Regime::Established
                && update.regime(policy) == Regime::Provisional
            {
                return Err(RatingError::RegimeInvariant {
                    id,
                    detail: "established rating cannot revert to provisional".into(),
                });
            }
            if update.regime(policy) == Regime::Established
                && (update.avg_oppon_rating.is_some() || update.total_points.is_some())
            {
                return Err(RatingError::RegimeInvariant {
                    id,
                    detail: "established record still carries provisional accumulators".into(),
                });
            }
            players.insert(id, update);
        }
        Ok(Roster { players })
    }

    /// Writes the roster to `path` via a temporary file in the same directory
    /// followed by a rename, so a partially written snapshot is never visible.
    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(CSV_DELIMITER)
                .from_path(&tmp)?;
            for record in self.players.values() {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
