//! Per-source outcome report.
//!
//! Source tasks append to one shared report while the run is in flight,
//! so the report sits behind a mutex. Rendering is left to the caller; the
//! report only exposes a serializable snapshot.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::Failure;
use crate::error::SourceError;
use crate::model::{Config, OsData, OsMetadata, Source};

/// Artifact category, as shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArtifactKind {
    #[serde(rename = "ISO")]
    Iso,
    #[serde(rename = "IMG")]
    Img,
    #[serde(rename = "Fixed ISO (CD-ROM)")]
    FixedIso,
    #[serde(rename = "Floppy")]
    Floppy,
    #[serde(rename = "Disk image")]
    Disk,
}

/// One artifact of a successful release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub kind: ArtifactKind,
    pub url: String,
    pub has_checksum: bool,
}

/// One release of a successful source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseStatus {
    pub release: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edition: String,
    pub arch: String,
    pub artifacts: Vec<ArtifactStatus>,
}

impl ReleaseStatus {
    fn from_config(config: &Config) -> Self {
        let tagged = |kind: ArtifactKind, sources: &[Source]| {
            sources
                .iter()
                .map(move |source| ArtifactStatus {
                    kind,
                    url: source.url().to_string(),
                    has_checksum: source
                        .as_web()
                        .is_some_and(|web| web.checksum.is_some()),
                })
                .collect::<Vec<_>>()
        };

        let mut artifacts = tagged(ArtifactKind::Iso, &config.iso);
        artifacts.extend(tagged(ArtifactKind::Img, &config.img));
        artifacts.extend(tagged(ArtifactKind::FixedIso, &config.fixed_iso));
        artifacts.extend(tagged(ArtifactKind::Floppy, &config.floppy));
        artifacts.extend(config.disk_images.iter().map(|disk| ArtifactStatus {
            kind: ArtifactKind::Disk,
            url: disk.source.url().to_string(),
            has_checksum: disk
                .source
                .as_web()
                .is_some_and(|web| web.checksum.is_some()),
        }));

        Self {
            release: config.release.clone(),
            edition: config.edition.clone(),
            arch: config.effective_arch().to_string(),
            artifacts,
        }
    }
}

/// A non-fatal failure as kept in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    pub error: String,
}

impl From<&Failure> for FailureRecord {
    fn from(failure: &Failure) -> Self {
        Self {
            release: failure.release.clone(),
            edition: failure.edition.clone(),
            arch: failure.arch.as_ref().map(ToString::to_string),
            error: failure.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceOutcome {
    Succeeded,
    Failed { error: String },
}

/// Everything recorded about one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    #[serde(flatten)]
    pub metadata: OsMetadata,
    pub outcome: SourceOutcome,
    pub releases: Vec<ReleaseStatus>,
    pub failures: Vec<FailureRecord>,
    pub checksum_failures: Vec<FailureRecord>,
    pub finished_at: DateTime<Utc>,
}

impl SourceStatus {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == SourceOutcome::Succeeded
    }
}

/// Serializable view of the whole report.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub succeeded: usize,
    pub failed: usize,
    pub sources: Vec<SourceStatus>,
}

/// Thread-safe accumulator of source outcomes.
#[derive(Debug)]
pub struct StatusReport {
    started_at: DateTime<Utc>,
    inner: Mutex<StatusInner>,
}

#[derive(Debug, Default)]
struct StatusInner {
    sources: Vec<SourceStatus>,
    finished_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            inner: Mutex::new(StatusInner::default()),
        }
    }

    /// Records a source that made it into the catalog.
    pub fn record_success(
        &self,
        data: &OsData,
        failures: &[Failure],
        checksum_failures: &[Failure],
    ) {
        info!(
            source = %data.name(),
            releases = data.releases.len(),
            failures = failures.len(),
            checksum_failures = checksum_failures.len(),
            "Source succeeded"
        );
        log_failures(data.name(), failures, checksum_failures);

        let status = SourceStatus {
            metadata: data.metadata.clone(),
            outcome: SourceOutcome::Succeeded,
            releases: data.releases.iter().map(ReleaseStatus::from_config).collect(),
            failures: failures.iter().map(FailureRecord::from).collect(),
            checksum_failures: checksum_failures.iter().map(FailureRecord::from).collect(),
            finished_at: Utc::now(),
        };
        self.inner.lock().sources.push(status);
    }

    /// Records a source that contributed nothing.
    pub fn record_failure(
        &self,
        metadata: OsMetadata,
        error: &SourceError,
        failures: &[Failure],
        checksum_failures: &[Failure],
    ) {
        warn!(source = %metadata.name, error = %error, "Source failed");
        log_failures(&metadata.name, failures, checksum_failures);

        let status = SourceStatus {
            metadata,
            outcome: SourceOutcome::Failed {
                error: error.to_string(),
            },
            releases: Vec::new(),
            failures: failures.iter().map(FailureRecord::from).collect(),
            checksum_failures: checksum_failures.iter().map(FailureRecord::from).collect(),
            finished_at: Utc::now(),
        };
        self.inner.lock().sources.push(status);
    }

    /// Marks the run complete.
    pub fn finish(&self) {
        self.inner.lock().finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished_at.is_some()
    }

    pub fn source(&self, name: &str) -> Option<SourceStatus> {
        self.inner
            .lock()
            .sources
            .iter()
            .find(|status| status.name() == name)
            .cloned()
    }

    pub fn succeeded(&self) -> usize {
        self.inner.lock().sources.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.inner.lock().sources.iter().filter(|s| !s.succeeded()).count()
    }

    /// Copy of the report with sources sorted by name.
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        let mut sources = inner.sources.clone();
        let finished_at = inner.finished_at;
        drop(inner);

        sources.sort_by(|a, b| a.name().cmp(b.name()));
        let succeeded = sources.iter().filter(|s| s.succeeded()).count();
        StatusSnapshot {
            started_at: self.started_at,
            finished_at,
            succeeded,
            failed: sources.len() - succeeded,
            sources,
        }
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self::new()
    }
}

fn log_failures(source: &str, failures: &[Failure], checksum_failures: &[Failure]) {
    for failure in failures {
        warn!(source, failure = %failure, "Release failed");
    }
    for failure in checksum_failures {
        warn!(source, failure = %failure, "Checksum unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::model::{Arch, WebSource};

    fn metadata(name: &str) -> OsMetadata {
        OsMetadata::new(name, name.to_uppercase(), "https://example.org/", "")
    }

    #[test]
    fn test_success_records_releases_and_failures() {
        let report = StatusReport::new();
        let data = OsData::new(
            metadata("alpine"),
            vec![Config::new("v3.20")
                .with_arch(Arch::Aarch64)
                .with_iso(WebSource::new("https://m/a.iso").with_checksum("ff"))
                .with_fixed_iso(Source::web("https://m/b.iso"))],
        );
        let failures = vec![Failure::new(CatalogError::other("mirror down")).with_release("v3.19")];

        report.record_success(&data, &failures, &[]);

        let status = report.source("alpine").unwrap();
        assert!(status.succeeded());
        assert_eq!(status.failures.len(), 1);
        assert_eq!(status.failures[0].release, "v3.19");
        assert!(status.checksum_failures.is_empty());

        let artifacts = &status.releases[0].artifacts;
        assert_eq!(artifacts[0].kind, ArtifactKind::Iso);
        assert!(artifacts[0].has_checksum);
        assert_eq!(artifacts[1].kind, ArtifactKind::FixedIso);
        assert!(!artifacts[1].has_checksum);
        assert_eq!(status.releases[0].arch, "aarch64");
    }

    #[test]
    fn test_failure_keeps_error_and_partial_failures() {
        let report = StatusReport::new();
        let checksum = vec![Failure::new(CatalogError::other("no sums"))];
        report.record_failure(metadata("freedos"), &SourceError::NoValidConfigs, &[], &checksum);

        let status = report.source("freedos").unwrap();
        assert_eq!(
            status.outcome,
            SourceOutcome::Failed {
                error: "no valid configs found".into()
            }
        );
        assert_eq!(status.checksum_failures.len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 0);
    }

    #[test]
    fn test_snapshot_sorted_and_serializable() {
        let report = StatusReport::new();
        report.record_failure(metadata("zorin"), &SourceError::NothingProduced, &[], &[]);
        report.record_success(&OsData::new(metadata("alpine"), Vec::new()), &[], &[]);
        report.finish();

        let snapshot = report.snapshot();
        let names: Vec<_> = snapshot.sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["alpine", "zorin"]);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert!(snapshot.finished_at.is_some());

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["sources"][0]["name"], "alpine");
        assert_eq!(value["sources"][0]["outcome"]["state"], "succeeded");
        assert_eq!(value["sources"][1]["outcome"]["state"], "failed");
    }

    #[test]
    fn test_concurrent_appends() {
        let report = std::sync::Arc::new(StatusReport::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let report = report.clone();
                std::thread::spawn(move || {
                    report.record_failure(
                        metadata(&format!("os{i}")),
                        &SourceError::Cancelled,
                        &[],
                        &[],
                    );
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(report.snapshot().sources.len(), 8);
    }
}
