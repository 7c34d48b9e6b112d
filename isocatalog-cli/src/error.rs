//! CLI error type.

use std::path::PathBuf;

use isocatalog::{ConfigError, FetchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown source '{0}' (use --list to see available sources)")]
    UnknownSource(String),

    #[error("run cancelled")]
    Cancelled,
}
