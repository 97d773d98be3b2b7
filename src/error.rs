use thiserror::Error;

/// Errors that abort processing of an input.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The request never produced a response.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// A mandatory field is missing from a fetched page.
    #[error("required field `{0}` not found on page")]
    Validation(&'static str),

    /// A free-text query did not resolve to a catalog page.
    #[error("no catalog page found for `{0}`")]
    Resolution(String),

    /// The search endpoint returned something that is not the expected JSON.
    #[error("malformed search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid selector `{css}`: {message}")]
    Selector { css: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Short name of the error class, used in the final log line.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Transport { .. } | ScrapeError::Status { .. } => "TransportError",
            ScrapeError::Validation(_) => "ValidationError",
            ScrapeError::Resolution(_) => "ResolutionError",
            ScrapeError::Decode(_) => "DecodeError",
            ScrapeError::Io(_) => "IoError",
            ScrapeError::Pattern(_) | ScrapeError::Selector { .. } | ScrapeError::Config(_) => {
                "ConfigError"
            }
        }
    }
}
