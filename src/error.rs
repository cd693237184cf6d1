//! Error types for playersig

use thiserror::Error;

/// Main error type for playersig operations
#[derive(Debug, Error)]
pub enum PlayersigError {
    /// The helper-object catalog or the transformation function could not be
    /// located in the player script. The deciphering format has changed;
    /// retrying with the same script version will not help.
    #[error("decipher procedure unavailable: {0}")]
    ProcedureUnavailable(String),

    /// A resolved operation's argument is out of range for the signature
    /// being transformed.
    #[error("malformed procedure: swap index {index} out of range for signature of length {len}")]
    MalformedProcedure { index: usize, len: usize },

    /// The signed-format descriptor is missing one of its required fields.
    #[error("invalid cipher parameters: missing `{0}` in signed-format descriptor")]
    InvalidCipherParameters(&'static str),

    #[error("video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("playlist unavailable: {0}")]
    PlaylistUnavailable(String),

    #[error("search results unavailable")]
    SearchUnavailable,

    #[error("blocked by the platform's network filter")]
    Blocked,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("integer parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
}

impl PlayersigError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlayersigError::Fetch(_))
    }

    /// Check if error signals an upstream format change rather than a
    /// problem with this particular content item
    pub fn is_format_change(&self) -> bool {
        matches!(
            self,
            PlayersigError::ProcedureUnavailable(_) | PlayersigError::InvalidCipherParameters(_)
        )
    }
}
