//! Checksum document parsing.
//!
//! Mirrors publish hashes in two layouts:
//!
//! ```text
//! Whitespace (sha256sum / md5sum output):
//!     9f86d08...  alpine-virt-3.20.1-x86_64.iso
//!     a665a45... *ubuntu-24.04-desktop-amd64.iso
//!
//! Labeled (BSD-style tagged output):
//!     SHA256 (FreeBSD-14.1-RELEASE-amd64-disc1.iso) = 9f86d08...
//! ```
//!
//! [`ChecksumFormat`] turns either layout into a [`ChecksumMap`] keyed by
//! file name. A `*` binary-mode marker stays part of the key, exactly as
//! the tool printed it.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::error::CatalogError;
use crate::fetch::{FetchError, FetchGateway};

/// File name to hash, for one checksum document.
pub type ChecksumMap = HashMap<String, String>;

/// Errors from checksum text that lacks the expected structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no whitespace was present in the checksum data")]
    NoWhitespace,

    #[error("pattern '{pattern}' has no capture group {group}")]
    MissingGroup { pattern: String, group: usize },
}

/// Hash algorithms with a prebuilt labeled pattern.
#[derive(Debug, Clone, Copy)]
enum Algorithm {
    Md5,
    Sha256,
    Sha512,
}

impl Algorithm {
    fn label(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        }
    }
}

/// Builds the `ALGO (file) = hash` pattern for one algorithm.
///
/// Group 1 is the file name, group 2 the hash.
fn labeled_regex(algorithm: Algorithm) -> &'static Regex {
    static MD5: OnceLock<Regex> = OnceLock::new();
    static SHA256: OnceLock<Regex> = OnceLock::new();
    static SHA512: OnceLock<Regex> = OnceLock::new();

    let cell = match algorithm {
        Algorithm::Md5 => &MD5,
        Algorithm::Sha256 => &SHA256,
        Algorithm::Sha512 => &SHA512,
    };
    cell.get_or_init(|| {
        let label = algorithm.label();
        Regex::new(&format!(r"{label} \(([^)]+)\) = ([0-9a-fA-F]+)")).unwrap()
    })
}

/// A regex with designated file name and hash capture groups.
#[derive(Debug, Clone)]
pub struct LabeledPattern {
    regex: Regex,
    file_group: usize,
    hash_group: usize,
}

impl LabeledPattern {
    /// Builds a pattern, checking that both groups exist.
    pub fn new(regex: Regex, file_group: usize, hash_group: usize) -> Result<Self, ParseError> {
        // captures_len counts the implicit whole-match group
        for group in [file_group, hash_group] {
            if group == 0 || group >= regex.captures_len() {
                return Err(ParseError::MissingGroup {
                    pattern: regex.as_str().to_string(),
                    group,
                });
            }
        }
        Ok(Self {
            regex,
            file_group,
            hash_group,
        })
    }

    /// `MD5 (file) = hash`
    pub fn md5() -> Self {
        Self::prebuilt(labeled_regex(Algorithm::Md5))
    }

    /// `SHA256 (file) = hash`
    pub fn sha256() -> Self {
        Self::prebuilt(labeled_regex(Algorithm::Sha256))
    }

    /// `SHA512 (file) = hash`
    pub fn sha512() -> Self {
        Self::prebuilt(labeled_regex(Algorithm::Sha512))
    }

    fn prebuilt(regex: &Regex) -> Self {
        Self {
            regex: regex.clone(),
            file_group: 1,
            hash_group: 2,
        }
    }

    fn parse(&self, text: &str) -> ChecksumMap {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let file = caps.get(self.file_group)?.as_str().trim();
                let hash = caps.get(self.hash_group)?.as_str().trim();
                (!file.is_empty() && !hash.is_empty())
                    .then(|| (file.to_string(), hash.to_string()))
            })
            .collect()
    }
}

/// Layout of a checksum document.
#[derive(Debug, Clone)]
pub enum ChecksumFormat {
    /// `<hash><whitespace><file>` per line.
    Whitespace,
    /// A labeled regex such as `SHA256 (file) = hash`.
    Labeled(LabeledPattern),
}

impl ChecksumFormat {
    pub fn md5() -> Self {
        ChecksumFormat::Labeled(LabeledPattern::md5())
    }

    pub fn sha256() -> Self {
        ChecksumFormat::Labeled(LabeledPattern::sha256())
    }

    pub fn sha512() -> Self {
        ChecksumFormat::Labeled(LabeledPattern::sha512())
    }

    /// Parses a checksum document. Lines that do not match are skipped.
    pub fn parse(&self, text: &str) -> ChecksumMap {
        match self {
            ChecksumFormat::Whitespace => parse_whitespace(text),
            ChecksumFormat::Labeled(pattern) => pattern.parse(text),
        }
    }
}

fn parse_whitespace(text: &str) -> ChecksumMap {
    text.lines()
        .filter_map(|line| {
            let (hash, file) = line.trim().split_once(char::is_whitespace)?;
            let (hash, file) = (hash.trim(), file.trim());
            (!hash.is_empty() && !file.is_empty()).then(|| (file.to_string(), hash.to_string()))
        })
        .collect()
}

/// Returns the leading token of `<hash><whitespace>...` text.
///
/// For endpoints that serve exactly one hash, usually followed by the file
/// name.
pub fn single_value(text: &str) -> Result<String, ParseError> {
    let text = text.trim_start();
    let (hash, _) = text
        .split_once(char::is_whitespace)
        .ok_or(ParseError::NoWhitespace)?;
    Ok(hash.to_string())
}

/// Fetches and parses a checksum document.
pub async fn fetch_checksums(
    gateway: &FetchGateway,
    url: &str,
    format: &ChecksumFormat,
) -> Result<ChecksumMap, FetchError> {
    let text = gateway.fetch_text(url).await?;
    Ok(format.parse(&text))
}

/// Fetches a single-hash checksum document.
pub async fn fetch_single_value(gateway: &FetchGateway, url: &str) -> Result<String, CatalogError> {
    let text = gateway.fetch_text(url).await?;
    Ok(single_value(&text)?)
}
