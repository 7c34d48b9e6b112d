//! Error taxonomy for catalog runs.
//!
//! ```text
//! FetchError ──┐
//! ParseError ──┼──► CatalogError   non-fatal, routed to a failure sink
//! ValidationError ┘        │
//!                          ▼
//!                     SourceError   ends one source's contribution
//! ```
//!
//! Nothing here aborts a run: the worst outcome for any error is that one
//! source is marked failed in the status report.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::ValidationError;
use crate::checksum::ParseError;
use crate::fetch::FetchError;

/// Any problem a collaborator or validation can hit while building configs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Collaborator-specific failure, e.g. an index page with no releases.
    #[error("{0}")]
    Other(String),
}

impl CatalogError {
    pub fn other(message: impl Into<String>) -> Self {
        CatalogError::Other(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            CatalogError::Fetch(e) => e.is_cancelled(),
            CatalogError::Validation(ValidationError::Unresolvable { source, .. }) => {
                source.is_cancelled()
            }
            _ => false,
        }
    }
}

/// Why a source contributed nothing to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The collaborator reported the source unusable.
    #[error(transparent)]
    Total(CatalogError),

    /// The collaborator returned successfully but with no configs.
    #[error("source produced no configs")]
    NothingProduced,

    /// Every produced config was dropped by validation or normalization.
    #[error("no valid configs found")]
    NoValidConfigs,

    /// The source task panicked.
    #[error("source task panicked: {0}")]
    Panicked(String),

    /// The run was cancelled before the source finished.
    #[error("cancelled")]
    Cancelled,
}

/// Errors loading catalog settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_preserve_display() {
        let fetch = FetchError::Status {
            url: "https://a/".into(),
            status: 500,
        };
        let err: CatalogError = fetch.clone().into();
        assert_eq!(err.to_string(), fetch.to_string());

        let parse: CatalogError = ParseError::NoWhitespace.into();
        assert_eq!(parse.to_string(), "no whitespace was present in the checksum data");
    }

    #[test]
    fn test_cancellation_is_detected_through_wrappers() {
        let cancelled = FetchError::Cancelled { url: "https://a/".into() };
        assert!(CatalogError::from(cancelled.clone()).is_cancelled());
        assert!(CatalogError::from(ValidationError::Unresolvable {
            url: "https://a/".into(),
            source: cancelled,
        })
        .is_cancelled());
        assert!(!CatalogError::other("boom").is_cancelled());
    }

    #[test]
    fn test_source_error_messages() {
        assert_eq!(SourceError::NoValidConfigs.to_string(), "no valid configs found");
        let total = SourceError::Total(CatalogError::other("index page empty"));
        assert_eq!(total.to_string(), "index page empty");
    }
}
