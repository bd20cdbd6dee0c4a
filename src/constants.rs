pub const CHESS_RESULTS_URL: &str = "https://chess-results.com";

pub const CSV_DELIMITER: u8 = b';';
pub const ELO_STEP: f64 = 400.0;

pub const IDENTITY_CACHE_FILE: &str = "manual_entry_list.json";

/// Roster snapshot written after tournament `n`.
pub fn snapshot_file(n: u32) -> String {
    format!("RatingList_after_{n}.csv")
}

/// Audit trail written alongside the snapshot for tournament `n`.
pub fn audit_file(n: u32) -> String {
    format!("Audit_of_Tournament_{n}.csv")
}
