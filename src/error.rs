//! Error types for the harvesting library.

use thiserror::Error;

/// Result type alias for harvesting operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that can occur while acquiring content.
///
/// Only [`HarvestError::AutomationUnavailable`] and input validation errors
/// escape an acquisition run. Everything else is absorbed per candidate.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The rendering engine could not be started.
    #[error("Automation engine unavailable: {0}")]
    AutomationUnavailable(String),

    /// A candidate URL failed to load after every retry.
    #[error("Navigation to {url} failed after {attempts} attempts: {source}")]
    NavigationExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<HarvestError>,
    },

    /// A single navigation attempt did not finish in time.
    #[error("Navigation timed out after {0}ms")]
    NavigationTimeout(u64),

    /// The browser reported a failure (connection reset, TLS, closed target).
    #[error("Browser error: {0}")]
    Browser(String),

    /// Empty keyword and no source URL.
    #[error("Invalid keyword: {0}")]
    InvalidKeyword(String),

    /// Configuration could not be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Identity (cookies, headers) could not be loaded or applied.
    #[error("Identity error: {0}")]
    Identity(String),

    /// Failed to parse rendered markup.
    #[error("Failed to parse markup: {0}")]
    Parse(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl HarvestError {
    /// Returns true if this error ends the whole run rather than one candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AutomationUnavailable(_) | Self::InvalidKeyword(_) | Self::UrlParse(_)
        )
    }
}
