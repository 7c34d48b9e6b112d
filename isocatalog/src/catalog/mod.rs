//! Catalog orchestration.
//!
//! Providers produce raw configs, the validator resolves their URLs, and
//! normalization puts them in output order. [`CatalogEngine`] drives all
//! of it for every registered provider at once.

mod engine;
mod failure;
mod memo;
mod normalize;
mod provider;
mod validate;

pub use engine::{CatalogEngine, CatalogRun};
pub use failure::{Failure, FailureKind, FailureSink};
pub use memo::Memo;
pub use normalize::{normalize, release_order};
pub use provider::{OsProvider, ProduceContext};
pub use validate::{file_name_from_url, validate_config, ConfigValidator, ValidationError};
