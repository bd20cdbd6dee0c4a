//! Obtaining raw tournament results. The network side lives behind the
//! `ResultsFetcher` trait so the batch runner can be driven from canned data.

use crate::constants::CHESS_RESULTS_URL;
use crate::error::{RatingError, Result};
use crate::tournaments::TournamentEntry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// One game as read off the results grid: the opponent is still a starting
/// rank, not a roster id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGame {
    pub opponent_rank: u32,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct RawParticipant {
    pub start_rank: u32,
    /// Id from the results page; `None` when the page lists 0 or nothing and
    /// the identity has to be resolved manually.
    pub id_no: Option<u32>,
    pub name: String,
    pub games: Vec<RawGame>,
}

#[derive(Debug, Clone, Default)]
pub struct TournamentGames {
    pub participants: Vec<RawParticipant>,
}

pub trait ResultsFetcher {
    fn fetch(&self, tournament: &TournamentEntry) -> Result<TournamentGames>;
}

/// Scrapes chess-results.com: the starting-rank list for identities and the
/// `art=5` results grid for the games.
#[derive(Debug, Clone)]
pub struct ChessResultsFetcher {
    base_url: String,
}

impl Default for ChessResultsFetcher {
    fn default() -> Self {
        Self {
            base_url: CHESS_RESULTS_URL.to_string(),
        }
    }
}

impl ChessResultsFetcher {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn get(&self, url: &str, seq: u32) -> Result<String> {
        let mut response = ureq::get(url)
            .call()
            .map_err(|e| RatingError::fetch(seq, format!("{url}: {e}")))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| RatingError::fetch(seq, format!("{url}: {e}")))
    }
}

impl ResultsFetcher for ChessResultsFetcher {
    fn fetch(&self, tournament: &TournamentEntry) -> Result<TournamentGames> {
        let seq = tournament.seq;
        let ranking_url = format!("{}/tnr{}.aspx?lan=1", self.base_url, tournament.cr_id);
        let ranking = parse_starting_rank(&self.get(&ranking_url, seq)?)
            .map_err(|e| RatingError::fetch(seq, format!("{ranking_url}: {e}")))?;

        let grid_url = format!("{}/tnr{}.aspx?lan=1&art=5", self.base_url, tournament.cr_id);
        let grid = parse_results_grid(&self.get(&grid_url, seq)?)
            .map_err(|e| RatingError::fetch(seq, format!("{grid_url}: {e}")))?;

        let mut participants = Vec::new();
        for (start_rank, games) in grid {
            if games.is_empty() {
                continue;
            }
            let (id_no, name) = ranking.get(&start_rank).cloned().ok_or_else(|| {
                RatingError::fetch(
                    seq,
                    format!("starting rank {start_rank} plays games but is not in the ranking table"),
                )
            })?;
            participants.push(RawParticipant {
                start_rank,
                id_no,
                name,
                games,
            });
        }
        Ok(TournamentGames { participants })
    }
}

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<table[^>]*class="?CRs1"?[^>]*>(.*?)</table>"#).unwrap());
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

fn cell_text(raw: &str) -> String {
    TAG_RE
        .replace_all(raw, "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Rows of the first `CRs1` table as plain-text cells.
fn table_rows(html: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let table = TABLE_RE
        .captures(html)
        .ok_or_else(|| "no CRs1 result table found".to_string())?;
    let body = table.get(1).map_or("", |m| m.as_str());
    Ok(ROW_RE
        .captures_iter(body)
        .map(|row| {
            CELL_RE
                .captures_iter(row.get(1).map_or("", |m| m.as_str()))
                .map(|cell| cell_text(cell.get(1).map_or("", |m| m.as_str())))
                .collect()
        })
        .collect())
}

fn column(header: &[String], name: &str) -> std::result::Result<usize, String> {
    header
        .iter()
        .position(|cell| cell.as_str() == name)
        .ok_or_else(|| format!("column {name:?} not found in result table header"))
}

/// Starting-rank table: rank -> (id from the page, display name).
pub fn parse_starting_rank(
    html: &str,
) -> std::result::Result<HashMap<u32, (Option<u32>, String)>, String> {
    let rows = table_rows(html)?;
    let header = rows.first().ok_or("empty ranking table")?;
    let id_col = column(header, "ID")?;
    let name_col = column(header, "Name")?;

    let mut ranking = HashMap::new();
    for row in &rows[1..] {
        let Some(rank) = row.first().and_then(|c| c.parse::<u32>().ok()) else {
            continue; // group separators and repeated headers
        };
        let id_no = row
            .get(id_col)
            .and_then(|c| c.parse::<u32>().ok())
            .filter(|&id| id != 0);
        let name = row.get(name_col).cloned().unwrap_or_default();
        ranking.insert(rank, (id_no, name));
    }
    Ok(ranking)
}

/// The `art=5` results grid: per starting rank, the rated games. Cells look
/// like `12w1`, `3b½`, `5w0`; byes (`-1`, `-0`) and forfeits (trailing `K`)
/// carry no rating weight and are skipped.
pub fn parse_results_grid(
    html: &str,
) -> std::result::Result<Vec<(u32, Vec<RawGame>)>, String> {
    let rows = table_rows(html)?;
    let header = rows.first().ok_or("empty results grid")?;
    let first_round = column(header, "1.Rd")?;
    let after_rounds = column(header, "Pts.")?;

    let mut grid = Vec::new();
    for row in &rows[1..] {
        let Some(rank) = row.first().and_then(|c| c.parse::<u32>().ok()) else {
            continue;
        };
        let games = (first_round..after_rounds)
            .filter_map(|col| row.get(col).and_then(|cell| parse_result_cell(cell)))
            .collect();
        grid.push((rank, games));
    }
    Ok(grid)
}

fn parse_result_cell(cell: &str) -> Option<RawGame> {
    let chars: Vec<char> = cell.trim().chars().collect();
    if chars.len() < 3 {
        return None; // too short to name an opponent: byes, "-1", empty
    }
    let score = match chars[chars.len() - 1] {
        '1' => 1.0,
        '0' => 0.0,
        '½' => 0.5,
        _ => return None, // forfeits ("K") and anything unreadable
    };
    // Strip the result and the color letter to leave the opponent's rank.
    let opponent_rank: u32 = chars[..chars.len() - 2]
        .iter()
        .collect::<String>()
        .parse()
        .ok()?;
    Some(RawGame {
        opponent_rank,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANKING: &str = r#"
        <html><body><table class="CRs1">
        <tr><th>No.</th><th>Name</th><th>ID</th><th>Rtg</th></tr>
        <tr><td>1</td><td>Ana&nbsp;Silva</td><td>2</td><td>1725</td></tr>
        <tr><td>2</td><td>Bruno Costa</td><td>9</td><td>1510</td></tr>
        <tr><td>3</td><td>Carla Dias</td><td>0</td><td>0</td></tr>
        </table></body></html>"#;

    const GRID: &str = r#"
        <html><body><table class="CRs1">
        <tr><th>Rk.</th><th>Name</th><th>1.Rd</th><th>2.Rd</th><th>3.Rd</th><th>Pts.</th></tr>
        <tr><td>1</td><td>Ana Silva</td><td>2w1</td><td>3b½</td><td>-1</td><td>2.5</td></tr>
        <tr><td>2</td><td>Bruno Costa</td><td>1b0</td><td>-0</td><td>3w1K</td><td>1</td></tr>
        <tr><td>3</td><td>Carla Dias</td><td>-1</td><td>1w½</td><td>2b0K</td><td>1.5</td></tr>
        </table></body></html>"#;

    #[test]
    fn ranking_table_is_parsed() {
        let ranking = parse_starting_rank(RANKING).unwrap();
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[&1], (Some(2), "Ana Silva".to_string()));
        assert_eq!(ranking[&2], (Some(9), "Bruno Costa".to_string()));
        // A page id of 0 means unknown.
        assert_eq!(ranking[&3], (None, "Carla Dias".to_string()));
    }

    #[test]
    fn results_grid_skips_byes_and_forfeits() {
        let grid = parse_results_grid(GRID).unwrap();
        assert_eq!(grid.len(), 3);

        let (rank, games) = &grid[0];
        assert_eq!(*rank, 1);
        assert_eq!(
            games.as_slice(),
            &[
                RawGame { opponent_rank: 2, score: 1.0 },
                RawGame { opponent_rank: 3, score: 0.5 },
            ]
        );

        // Bruno: one real game, one bye, one forfeit win.
        let (_, games) = &grid[1];
        assert_eq!(games.as_slice(), &[RawGame { opponent_rank: 1, score: 0.0 }]);
    }

    #[test]
    fn missing_table_is_an_error() {
        assert!(parse_starting_rank("<html><body>maintenance</body></html>").is_err());
        assert!(parse_results_grid("<table class=\"other\"></table>").is_err());
    }
}
