//! Lenient release version parsing.

use std::cmp::Ordering;

use semver::Prerelease;

/// A release label read as a dotted numeric version.
///
/// Accepts what mirrors actually publish rather than strict semver: any
/// number of numeric segments, an optional `v` prefix and an optional
/// `-prerelease` suffix. `24.04`, `v3.20`, `1.3`, `2024.06.1` and
/// `14.1-RC1` all parse; `rolling`, `latest` and `daily-live` do not.
///
/// Missing trailing segments compare as zero, so `1.0 == 1`.
#[derive(Debug, Clone)]
pub struct ReleaseVersion {
    segments: Vec<u64>,
    pre: Prerelease,
}

impl ReleaseVersion {
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let label = label
            .strip_prefix('v')
            .or_else(|| label.strip_prefix('V'))
            .unwrap_or(label);
        let label = label.split_once('+').map_or(label, |(core, _build)| core);
        let (core, pre) = match label.split_once('-') {
            Some((core, pre)) => (core, Prerelease::new(pre).ok()?),
            None => (label, Prerelease::EMPTY),
        };

        let segments = core
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    segment.parse::<u64>().ok()
                }
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { segments, pre })
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| {
                let a = self.segments.get(i).copied().unwrap_or(0);
                let b = other.segments.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            // A release without a prerelease tag outranks its prereleases
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ReleaseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ReleaseVersion {}

/// Ascending comparison of release labels as versions.
///
/// Labels that are not versions sort before every version and compare
/// lexicographically among themselves. Total, so safe for `sort_by`.
pub fn version_compare(a: &str, b: &str) -> Ordering {
    match (ReleaseVersion::parse(a), ReleaseVersion::parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Ascending comparison of release labels as integers.
///
/// Non-numeric labels sort first, lexicographically.
pub fn integer_compare(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(ia), Ok(ib)) => ia.cmp(&ib).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
