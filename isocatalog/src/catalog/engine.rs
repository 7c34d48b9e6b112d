//! Runs every registered provider concurrently and merges the results.
//!
//! # Architecture
//!
//! ```text
//!                       ┌──────────────────── JoinSet ────────────────────┐
//! providers ──spawn──►  │ source task (one per provider, no cap)          │
//!                       │   1. start both failure drains                  │
//!                       │   2. produce ──► FetchGateway (permits)         │
//!                       │   3. validate ──► FetchGateway (permits)        │
//!                       │   4. drop context: sinks close, drains finish   │
//!                       │   5. normalize, record status                   │
//!                       └──────────────┬──────────────────────────────────┘
//!                                      │ Option<OsData>
//!                                      ▼
//!                               sort by name ──► CatalogRun
//! ```
//!
//! Throttling lives entirely in the gateway, so the number of sources in
//! flight is independent of the number of requests in flight. A source
//! that fails, panics or is cancelled is recorded and skipped; it never
//! affects its siblings. A panic inside produce or validation is caught
//! in the source task, so failures recorded before it are kept.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use super::failure::{failure_channel, Failure, FailureKind};
use super::normalize::normalize;
use super::provider::{OsProvider, ProduceContext};
use super::validate::ConfigValidator;
use crate::error::SourceError;
use crate::fetch::FetchGateway;
use crate::model::{Config, OsData};
use crate::status::StatusReport;

/// Result of a catalog run.
#[derive(Debug)]
pub struct CatalogRun {
    /// Successful sources, sorted by name.
    pub catalog: Vec<OsData>,
    /// Outcome of every source, successful or not.
    pub status: Arc<StatusReport>,
}

/// Orchestrates providers over a shared fetch gateway.
pub struct CatalogEngine {
    gateway: Arc<FetchGateway>,
}

impl CatalogEngine {
    pub fn new(gateway: Arc<FetchGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<FetchGateway> {
        &self.gateway
    }

    /// Runs every provider to completion.
    ///
    /// Always returns; individual failures end up in the status report.
    /// Cancelling the gateway's token makes in-flight sources finish early
    /// as [`SourceError::Cancelled`].
    pub async fn run(&self, providers: Vec<Arc<dyn OsProvider>>) -> CatalogRun {
        let started = Instant::now();
        let status = Arc::new(StatusReport::new());
        let total = providers.len();
        info!(sources = total, "Starting catalog run");

        let mut tasks = JoinSet::new();
        let mut identities = HashMap::with_capacity(total);
        for provider in providers {
            let metadata = provider.metadata();
            let gateway = Arc::clone(&self.gateway);
            let status = Arc::clone(&status);
            let handle = tasks.spawn(process_source(gateway, provider, status));
            identities.insert(handle.id(), metadata);
        }

        let mut catalog = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Some(data))) => catalog.push(data),
                Ok((_, None)) => {}
                Err(e) => {
                    let metadata = identities.remove(&e.id()).unwrap_or_default();
                    let reason = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    error!(source = %metadata.name, reason = %reason, "Source task died");
                    status.record_failure(metadata, &SourceError::Panicked(reason), &[], &[]);
                }
            }
        }

        catalog.sort_by(|a, b| a.name().cmp(b.name()));
        status.finish();

        info!(
            sources = total,
            succeeded = catalog.len(),
            failed = total - catalog.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            cancelled = self.gateway.cancellation_token().is_cancelled(),
            "Catalog run complete"
        );

        CatalogRun { catalog, status }
    }
}

/// Runs one provider through produce, validation and normalization.
async fn process_source(
    gateway: Arc<FetchGateway>,
    provider: Arc<dyn OsProvider>,
    status: Arc<StatusReport>,
) -> Option<OsData> {
    let metadata = provider.metadata();
    let cancellation = gateway.cancellation_token().clone();

    // Drains run before produce so the first send always has a receiver
    let (failures, failure_drain) = failure_channel(&metadata.name, FailureKind::Primary);
    let (checksum_failures, checksum_drain) =
        failure_channel(&metadata.name, FailureKind::Checksum);
    let failure_drain = failure_drain.spawn();
    let checksum_drain = checksum_drain.spawn();

    let ctx = ProduceContext::new(Arc::clone(&gateway), failures, checksum_failures);

    let outcome = AssertUnwindSafe(produce_and_validate(&gateway, provider.as_ref(), &ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let reason = panic_message(payload);
            error!(source = %metadata.name, reason = %reason, "Source panicked");
            Err(SourceError::Panicked(reason))
        });

    // Closing the engine's senders lets the drains finish
    drop(ctx);
    let failures = collect(failure_drain, &metadata.name).await;
    let checksum_failures = collect(checksum_drain, &metadata.name).await;

    let outcome = outcome.and_then(|configs| {
        if cancellation.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        let releases = normalize(configs);
        if releases.is_empty() {
            Err(SourceError::NoValidConfigs)
        } else {
            Ok(releases)
        }
    });

    match outcome {
        Ok(releases) => {
            let data = OsData::new(metadata, releases);
            status.record_success(&data, &failures, &checksum_failures);
            Some(data)
        }
        Err(e) => {
            status.record_failure(metadata, &e, &failures, &checksum_failures);
            None
        }
    }
}

async fn produce_and_validate(
    gateway: &Arc<FetchGateway>,
    provider: &dyn OsProvider,
    ctx: &ProduceContext,
) -> Result<Vec<Config>, SourceError> {
    let cancellation = gateway.cancellation_token();
    let produced = tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(SourceError::Cancelled),
        result = provider.produce(ctx) => result.map_err(|e| {
            if e.is_cancelled() {
                SourceError::Cancelled
            } else {
                SourceError::Total(e)
            }
        }),
    };

    match produced? {
        configs if configs.is_empty() => Err(SourceError::NothingProduced),
        configs => {
            let validator = ConfigValidator::new(Arc::clone(gateway));
            Ok(validator.validate_all(configs, ctx.failures()).await)
        }
    }
}

async fn collect(drain: JoinHandle<Vec<Failure>>, source: &str) -> Vec<Failure> {
    drain.await.unwrap_or_else(|e| {
        error!(source, error = %e, "Failure drain died");
        Vec::new()
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
