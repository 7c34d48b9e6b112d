//! The contract every per-OS collaborator implements.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::failure::{Failure, FailureSink};
use crate::error::CatalogError;
use crate::fetch::FetchGateway;
use crate::model::{Config, OsMetadata};

/// A pluggable source of releases for one operating system.
///
/// `produce` may run its own concurrent work. Problems that only affect
/// some releases go to the context's sinks; returning `Err` declares the
/// whole source unusable and discards anything it produced.
///
/// Implementations must not hold on to the context's sinks after
/// `produce` returns; the engine closes them once validation is done.
pub trait OsProvider: Send + Sync {
    /// Identity of the operating system.
    fn metadata(&self) -> OsMetadata;

    /// Discovers every release the source currently offers.
    fn produce<'a>(
        &'a self,
        ctx: &'a ProduceContext,
    ) -> BoxFuture<'a, Result<Vec<Config>, CatalogError>>;
}

/// Everything a provider needs while producing configs.
pub struct ProduceContext {
    gateway: Arc<FetchGateway>,
    failures: FailureSink,
    checksum_failures: FailureSink,
}

impl ProduceContext {
    pub(crate) fn new(
        gateway: Arc<FetchGateway>,
        failures: FailureSink,
        checksum_failures: FailureSink,
    ) -> Self {
        Self {
            gateway,
            failures,
            checksum_failures,
        }
    }

    pub fn gateway(&self) -> &FetchGateway {
        &self.gateway
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        self.gateway.cancellation_token()
    }

    /// Sink for fetch and validation problems.
    pub fn failures(&self) -> &FailureSink {
        &self.failures
    }

    /// Sink for missing checksums.
    pub fn checksum_failures(&self) -> &FailureSink {
        &self.checksum_failures
    }

    pub async fn fail(&self, failure: Failure) {
        self.failures.send(failure).await;
    }

    pub async fn fail_checksum(&self, failure: Failure) {
        self.checksum_failures.send(failure).await;
    }
}
