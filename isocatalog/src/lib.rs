//! isocatalog - operating system release catalog builder
//!
//! Queries many independent download sites concurrently, validates every
//! artifact reference and emits one deterministic JSON catalog for
//! quickget.
//!
//! # Architecture
//!
//! ```text
//! OsProvider (per OS) ──► CatalogEngine ──► ConfigValidator ──► normalize ──► Vec<OsData>
//!         │                     │                 │
//!         └────────── FetchGateway (global + per-host permits, retries) ◄─┘
//!                               │
//!                          StatusReport
//! ```
//!
//! # Example
//!
//! ```ignore
//! let token = CancellationToken::new();
//! let gateway = Arc::new(FetchGateway::new(FetchSettings::default(), token)?);
//! let run = CatalogEngine::new(gateway).run(providers).await;
//! std::fs::write("quickget_data.json", catalog_to_json(&run.catalog)?)?;
//! ```

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod discover;
pub mod error;
pub mod fetch;
pub mod model;
pub mod status;
pub mod version;

pub use catalog::{CatalogEngine, CatalogRun, Failure, Memo, OsProvider, ProduceContext};
pub use config::CatalogSettings;
pub use error::{CatalogError, ConfigError, SourceError};
pub use fetch::{FetchError, FetchGateway, FetchSettings};
pub use model::{Arch, Config, OsData, OsMetadata, Source};
pub use status::{StatusReport, StatusSnapshot};

/// Serializes a catalog in the layout quickget reads.
///
/// Default `guest_os` and `arch` values are omitted from every release.
pub fn catalog_to_json(catalog: &[OsData]) -> Result<String, serde_json::Error> {
    serde_json::to_string(catalog)
}

/// Pretty-printed form of [`catalog_to_json`], for inspection.
pub fn catalog_to_json_pretty(catalog: &[OsData]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(catalog)
}
