//! One-time asynchronous initialization shared between collaborators.

use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::CatalogError;

/// A lazily computed value shared by several collaborators.
///
/// The first caller runs the initializer; concurrent callers wait for it
/// and then all see the same result. Errors are cached too, so a failed
/// lookup is not retried within a run. Several Ubuntu flavours share one
/// release list this way.
#[derive(Debug)]
pub struct Memo<T> {
    cell: OnceCell<Result<T, CatalogError>>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<&T, CatalogError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        self.cell
            .get_or_init(init)
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The cached result, if initialization has finished.
    pub fn get(&self) -> Option<Result<&T, &CatalogError>> {
        self.cell.get().map(Result::as_ref)
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}
