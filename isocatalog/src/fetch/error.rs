//! Fetch error types.

use thiserror::Error;

/// Errors produced by the fetch gateway.
///
/// Clonable so that memoized lookups can hand the same failure to every
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("failed to decode {format} from {url}: {reason}")]
    Decode {
        url: String,
        format: &'static str,
        reason: String,
    },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// Returns true when another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Request { .. } | FetchError::Body { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}
