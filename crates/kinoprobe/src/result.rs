//! Result and error types for kinoprobe.

use thiserror::Error;

/// Result type for kinoprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the catalog UI or API
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A wait condition never held within its budget
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Every candidate of a mandatory locator set was exhausted
    #[error("Could not resolve {what}: all locator candidates exhausted")]
    ResolutionFailed {
        /// What was being resolved
        what: String,
    },

    /// A click target was obscured by another element
    ///
    /// Recovered internally by the forced-dispatch fallback; callers only
    /// see this when the fallback itself fails.
    #[error("Click blocked on {what}")]
    InteractionBlocked {
        /// Description of the blocked target
        what: String,
    },

    /// Workflow operation called in the wrong state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page-level error from the browser collaborator
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Unusable configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Catalog API returned a non-success status
    #[error("API request failed with status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Check whether this error is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
