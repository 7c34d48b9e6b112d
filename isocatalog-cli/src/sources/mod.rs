//! Bundled operating system collaborators.

use std::sync::Arc;

use isocatalog::OsProvider;

use crate::error::CliError;

pub mod alpine;
pub mod freedos;
pub mod ubuntu;

/// Every bundled provider.
pub fn registry() -> Vec<Arc<dyn OsProvider>> {
    let mut providers: Vec<Arc<dyn OsProvider>> =
        vec![Arc::new(alpine::Alpine), Arc::new(freedos::FreeDos)];
    providers.extend(ubuntu::family());
    providers
}

/// Keeps only the providers named in `names`; all of them when empty.
pub fn select(
    providers: Vec<Arc<dyn OsProvider>>,
    names: &[String],
) -> Result<Vec<Arc<dyn OsProvider>>, CliError> {
    if names.is_empty() {
        return Ok(providers);
    }
    if let Some(unknown) = names
        .iter()
        .find(|name| !providers.iter().any(|p| p.metadata().name == **name))
    {
        return Err(CliError::UnknownSource(unknown.clone()));
    }
    Ok(providers
        .into_iter()
        .filter(|p| names.contains(&p.metadata().name))
        .collect())
}
