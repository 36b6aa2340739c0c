//! Conduit errors.

use thiserror::Error;

/// Result type for Conduit calls.
pub type ConduitResult<T> = Result<T, ConduitError>;

/// Conduit errors.
#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an `error_code`.
    #[error("{code}: {info}")]
    Remote { code: String, info: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid conduit uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("no repository with callsign {0}")]
    UnknownRepository(String),
}

impl ConduitError {
    /// Check if the server rejected the call, as opposed to the call never
    /// reaching it.
    pub fn is_remote(&self) -> bool {
        matches!(self, ConduitError::Remote { .. })
    }
}
