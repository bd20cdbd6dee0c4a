use thiserror::Error;

pub type Result<T> = std::result::Result<T, RatingError>;

/// Errors surfaced by the rating cycle. Every variant carries enough context
/// (tournament `#`, player id) to fix the source data and resume the run.
#[derive(Debug, Error)]
pub enum RatingError {
    /// Malformed input data: bad CSV row, missing column, non-monotonic
    /// tournament numbers, unusable policy file. Fatal before any processing.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A tournament page could not be fetched or parsed. The run halts at this
    /// tournament; earlier snapshots stay valid.
    #[error("tournament {tournament}: fetch failed: {reason}")]
    Fetch { tournament: u32, reason: String },

    /// A participant could not be matched to a roster entry and the resolver
    /// declined or answered with an unknown id.
    #[error("tournament {tournament}: cannot resolve player {name:?} (starting rank {start_rank})")]
    UnresolvedPlayer {
        tournament: u32,
        name: String,
        start_rank: u32,
    },

    /// Internal consistency failure, never silently corrected.
    #[error("regime invariant violated for player {id}: {detail}")]
    RegimeInvariant { id: u32, detail: String },

    /// A game set handed to the engine that the engine cannot rate.
    #[error("malformed games for player {id}: {detail}")]
    MalformedGame { id: u32, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RatingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn fetch(tournament: u32, reason: impl Into<String>) -> Self {
        Self::Fetch {
            tournament,
            reason: reason.into(),
        }
    }
}
