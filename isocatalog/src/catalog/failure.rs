//! Non-fatal failure records and their per-source sinks.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::model::{Arch, Config};

/// Sends wait until the drain has taken the previous failure.
const SINK_CAPACITY: usize = 1;

/// A non-fatal problem tied to one release of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub release: String,
    pub edition: String,
    pub arch: Option<Arch>,
    pub error: CatalogError,
}

impl Failure {
    pub fn new(error: impl Into<CatalogError>) -> Self {
        Self {
            release: String::new(),
            edition: String::new(),
            arch: None,
            error: error.into(),
        }
    }

    /// A failure carrying the identity of `config`.
    pub fn for_config(config: &Config, error: impl Into<CatalogError>) -> Self {
        Self {
            release: config.release.clone(),
            edition: config.edition.clone(),
            arch: config.arch.clone(),
            error: error.into(),
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = edition.into();
        self
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identity = Vec::new();
        if !self.release.is_empty() {
            identity.push(self.release.as_str());
        }
        if !self.edition.is_empty() {
            identity.push(self.edition.as_str());
        }
        if let Some(arch) = &self.arch {
            identity.push(arch.as_str());
        }

        if identity.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "[{}] {}", identity.join(" "), self.error)
        }
    }
}

/// Severity tier of a failure sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Fetch or validation problems that drop a release.
    Primary,
    /// A missing integrity hash. Never drops a release.
    Checksum,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Primary => f.write_str("primary"),
            FailureKind::Checksum => f.write_str("checksum"),
        }
    }
}

/// Destination for non-fatal failures of one source.
///
/// Clonable so collaborators can hand it to their own concurrent work.
/// The sink closes when the engine drops its context and every clone is
/// gone; collaborators never close it themselves.
#[derive(Debug, Clone)]
pub struct FailureSink {
    source: String,
    kind: FailureKind,
    tx: mpsc::Sender<Failure>,
}

impl FailureSink {
    /// Records a failure, waiting for the drain to accept it.
    pub async fn send(&self, failure: Failure) {
        debug!(source = %self.source, kind = %self.kind, failure = %failure, "Failure recorded");
        if self.tx.send(failure).await.is_err() {
            warn!(source = %self.source, kind = %self.kind, "Failure sink already drained");
        }
    }
}

/// Receiving half of a sink, consumed by its drain task.
pub(crate) struct FailureDrain {
    rx: mpsc::Receiver<Failure>,
}

impl FailureDrain {
    /// Starts the drain. It finishes once every sender is dropped.
    pub(crate) fn spawn(mut self) -> JoinHandle<Vec<Failure>> {
        tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(failure) = self.rx.recv().await {
                failures.push(failure);
            }
            failures
        })
    }
}

pub(crate) fn failure_channel(source: &str, kind: FailureKind) -> (FailureSink, FailureDrain) {
    let (tx, rx) = mpsc::channel(SINK_CAPACITY);
    let sink = FailureSink {
        source: source.to_string(),
        kind,
        tx,
    };
    (sink, FailureDrain { rx })
}
