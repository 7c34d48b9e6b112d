//! Release discovery helpers shared by collaborators.
//!
//! Most mirrors publish an index page with one link per release. These
//! helpers fetch such a page, pull the first capture group of every match
//! of a precompiled pattern, and trim or order the result.

use std::cmp::Ordering;

use regex::Regex;
use serde::Deserialize;

use crate::fetch::{FetchError, FetchGateway};

pub use crate::version::{integer_compare, version_compare};

/// Extracts capture group 1 of every match, or the whole match when the
/// pattern has no groups.
pub fn release_matches(page: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .captures_iter(page)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Releases in page order, keeping at most the first `limit`.
pub async fn basic_releases(
    gateway: &FetchGateway,
    url: &str,
    pattern: &Regex,
    limit: Option<usize>,
) -> Result<Vec<String>, FetchError> {
    let page = gateway.fetch_text(url).await?;
    let mut releases = release_matches(&page, pattern);
    if let Some(limit) = limit {
        releases.truncate(limit);
    }
    Ok(releases)
}

/// Releases in reverse page order, keeping at most the last `limit` from
/// the page. Suits indexes that list oldest first.
pub async fn reverse_releases(
    gateway: &FetchGateway,
    url: &str,
    pattern: &Regex,
    limit: Option<usize>,
) -> Result<Vec<String>, FetchError> {
    let page = gateway.fetch_text(url).await?;
    let mut releases = release_matches(&page, pattern);
    keep_last(&mut releases, limit);
    releases.reverse();
    Ok(releases)
}

/// Releases sorted ascending by `compare`, keeping the greatest `limit`.
pub async fn sorted_releases<F>(
    gateway: &FetchGateway,
    url: &str,
    pattern: &Regex,
    limit: Option<usize>,
    compare: F,
) -> Result<Vec<String>, FetchError>
where
    F: FnMut(&String, &String) -> Ordering,
{
    let page = gateway.fetch_text(url).await?;
    let mut releases = release_matches(&page, pattern);
    releases.sort_by(compare);
    keep_last(&mut releases, limit);
    Ok(releases)
}

fn keep_last(releases: &mut Vec<String>, limit: Option<usize>) {
    if let Some(limit) = limit {
        let start = releases.len().saturating_sub(limit);
        releases.drain(..start);
    }
}

/// A release object from the GitHub REST API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub body: Option<String>,
}

impl GithubRelease {
    /// First asset whose name satisfies `predicate`.
    pub fn find_asset(&self, predicate: impl Fn(&str) -> bool) -> Option<&GithubAsset> {
        self.assets.iter().find(|asset| predicate(&asset.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub url: String,
}

/// Fetches the release list of `owner/repo`, newest first.
pub async fn github_releases(
    gateway: &FetchGateway,
    repo: &str,
) -> Result<Vec<GithubRelease>, FetchError> {
    let url = format!("https://api.github.com/repos/{repo}/releases");
    gateway.fetch_json_accepting(&url).await
}
