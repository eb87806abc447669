//! Error types shared by the adapters and the cycles.

use thiserror::Error;

/// Failure to obtain a value from a price or fee provider.
///
/// Always recoverable: the entity is skipped for the current tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field `{0}` missing from payload")]
    MissingField(&'static str),

    #[error("field `{field}` is not a number: {raw}")]
    NotANumber { field: &'static str, raw: String },

    #[error("upstream reported an error: {0}")]
    Upstream(String),
}

/// Failure to resolve or rename a display slot.
#[derive(Debug, Error)]
pub enum SlotError {
    /// The slot no longer exists; the entity should be deregistered.
    #[error("display slot not found")]
    NotFound,

    #[error("missing permission to manage display slot")]
    Forbidden,

    #[error("rate limited by the chat platform")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

/// Failure talking to the social feed upstream.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Upstream asked us to back off. `reset_at` is a unix timestamp when known.
    #[error("rate limited (reset at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },

    #[error("unknown user @{0}")]
    UnknownUser(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
