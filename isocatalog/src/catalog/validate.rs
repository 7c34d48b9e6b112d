//! URL validation and file name enrichment.
//!
//! Every produced config is checked on its own task. All of its sources
//! are resolved concurrently through the gateway; one unresolvable source
//! drops the whole config.
//!
//! ```text
//! Config ──► resolve every source ──► all ok? ──► fill missing file names ──► keep
//!                                       │
//!                                       └── no ──► Failure to primary sink ──► drop
//! ```
//!
//! The original URL stays in the catalog; mirrors redirect to hosts that
//! vary between requests, so only the file name is taken from the final
//! location.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::failure::{Failure, FailureSink};
use crate::error::CatalogError;
use crate::fetch::{FetchError, FetchGateway};
use crate::model::{Config, Source, Validation};

const TOO_MANY_REQUESTS: u16 = 429;
const FORBIDDEN: u16 = 403;

/// Why an artifact reference was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("could not resolve {url}: {source}")]
    Unresolvable { url: String, source: FetchError },

    #[error("{url} resolved with HTTP {status}")]
    Rejected { url: String, status: u16 },

    #[error("no file name in resolved URL {url}")]
    NoFileName { url: String },

    #[error("config has no artifacts")]
    NoArtifacts,
}

/// Resolves and enriches configs before they enter the catalog.
#[derive(Clone)]
pub struct ConfigValidator {
    gateway: Arc<FetchGateway>,
}

impl ConfigValidator {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self { gateway }
    }

    /// Validates configs concurrently, returning the survivors.
    ///
    /// Rejected configs are reported to `failures`. Survivor order is
    /// unspecified.
    pub async fn validate_all(&self, configs: Vec<Config>, failures: &FailureSink) -> Vec<Config> {
        let mut tasks = JoinSet::new();
        let mut identities = HashMap::with_capacity(configs.len());
        for config in configs {
            let identity = (config.release.clone(), config.edition.clone(), config.arch.clone());
            let gateway = Arc::clone(&self.gateway);
            let handle = tasks.spawn(async move { validate_config(&gateway, config).await });
            identities.insert(handle.id(), identity);
        }

        let mut valid = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(config))) => valid.push(config),
                Ok((_, Err(failure))) => failures.send(failure).await,
                Err(e) => {
                    error!(error = %e, "Validation task failed");
                    let (release, edition, arch) = identities.remove(&e.id()).unwrap_or_default();
                    let failure = Failure {
                        release,
                        edition,
                        arch,
                        error: CatalogError::other(format!("validation task failed: {e}")),
                    };
                    failures.send(failure).await;
                }
            }
        }
        valid
    }
}

/// Validates one config in place.
pub async fn validate_config(gateway: &FetchGateway, mut config: Config) -> Result<Config, Failure> {
    if config.sources().next().is_none() {
        return Err(Failure::for_config(&config, ValidationError::NoArtifacts));
    }
    if config.validation.skip {
        debug!(config = %config.label(), "Validation skipped");
        return Ok(config);
    }

    let policy = config.validation;
    let outcome = try_join_all(
        config
            .sources_mut()
            .map(|source| validate_source(gateway, source, policy)),
    )
    .await;

    match outcome {
        Ok(_) => Ok(config),
        Err(e) => Err(Failure::for_config(&config, e)),
    }
}

async fn validate_source(
    gateway: &FetchGateway,
    source: &mut Source,
    policy: Validation,
) -> Result<(), ValidationError> {
    match source {
        Source::Web(web) => {
            let final_url = resolve(gateway, &web.url, policy).await?;
            if web.file_name.is_none() {
                web.file_name = Some(file_name_from_url(&final_url)?);
            }
        }
        Source::Container(container) => {
            resolve(gateway, &container.url, policy).await?;
        }
    }
    Ok(())
}

/// Resolves `url`, returning the final location when it is acceptable.
async fn resolve(gateway: &FetchGateway, url: &str, policy: Validation) -> Result<String, ValidationError> {
    let check = gateway
        .check_url(url)
        .await
        .map_err(|source| ValidationError::Unresolvable {
            url: url.to_string(),
            source,
        })?;

    match check.status {
        _ if check.is_success() => Ok(check.final_url),
        TOO_MANY_REQUESTS => {
            warn!(url, "Rate limited while validating, accepting");
            Ok(check.final_url)
        }
        FORBIDDEN if policy.accept_forbidden => Ok(check.final_url),
        status => Err(ValidationError::Rejected {
            url: url.to_string(),
            status,
        }),
    }
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn file_name_from_url(url: &str) -> Result<String, ValidationError> {
    let no_file_name = || ValidationError::NoFileName {
        url: url.to_string(),
    };
    let parsed = url::Url::parse(url).map_err(|_| no_file_name())?;
    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(no_file_name)?;

    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    if decoded.is_empty() {
        return Err(no_file_name());
    }
    Ok(decoded)
}
