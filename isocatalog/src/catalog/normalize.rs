//! Defaulting, filtering and ordering of a source's configs.

use std::cmp::Ordering;

use tracing::debug;

use crate::model::LATEST_RELEASE;
use crate::model::{Arch, Config, GuestOs};
use crate::version::ReleaseVersion;

/// Normalizes configs for output.
///
/// - empty release becomes `latest`
/// - missing guest OS becomes `linux`
/// - missing architecture becomes `x86_64`, and `amd64` / `arm64` map to
///   their canonical names
/// - configs for any other architecture are dropped
/// - the result is sorted newest release first, then by edition
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize(configs: Vec<Config>) -> Vec<Config> {
    let mut configs: Vec<Config> = configs
        .into_iter()
        .map(apply_defaults)
        .filter(|config| {
            let keep = config.effective_arch().is_supported();
            if !keep {
                debug!(config = %config.label(), "Dropping config with unsupported architecture");
            }
            keep
        })
        .collect();

    configs.sort_by(|a, b| {
        release_order(&a.release, &b.release).then_with(|| a.edition.cmp(&b.edition))
    });
    configs
}

fn apply_defaults(mut config: Config) -> Config {
    if config.release.trim().is_empty() {
        config.release = LATEST_RELEASE.to_string();
    }
    if config.guest_os.is_none() {
        config.guest_os = Some(GuestOs::Linux);
    }
    config.arch = Some(config.arch.take().unwrap_or(Arch::X86_64).canonicalize());
    config
}

/// Orders release labels newest first.
///
/// Versions compare numerically, descending. Labels that are not versions,
/// such as `rolling` or `latest`, come before all versions and compare
/// among themselves in reverse lexicographic order. Equal versions with
/// different spellings fall back to reverse lexicographic order, which
/// keeps the ordering total.
pub fn release_order(a: &str, b: &str) -> Ordering {
    match (ReleaseVersion::parse(a), ReleaseVersion::parse(b)) {
        (Some(va), Some(vb)) => vb.cmp(&va).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => b.cmp(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use proptest::prelude::*;

    fn release(label: &str) -> Config {
        Config::new(label).with_iso(Source::web(format!("https://m.example/{label}.iso")))
    }

    fn releases(configs: &[Config]) -> Vec<&str> {
        configs.iter().map(|c| c.release.as_str()).collect()
    }

    #[test]
    fn test_versions_sort_newest_first() {
        let sorted = normalize(vec![release("22.04"), release("24.04"), release("20.04")]);
        assert_eq!(releases(&sorted), vec!["24.04", "22.04", "20.04"]);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        let sorted = normalize(vec![release("3.9"), release("3.10"), release("3.20")]);
        assert_eq!(releases(&sorted), vec!["3.20", "3.10", "3.9"]);
    }

    #[test]
    fn test_labels_sort_without_panicking() {
        let sorted = normalize(vec![
            release("1.0"),
            release("rolling"),
            release("latest"),
            release("2.0"),
        ]);
        assert_eq!(releases(&sorted), vec!["rolling", "latest", "2.0", "1.0"]);
    }

    #[test]
    fn test_edition_breaks_ties() {
        let sorted = normalize(vec![
            release("40").with_edition("xfce"),
            release("40").with_edition("kde"),
            release("41").with_edition("xfce"),
        ]);
        let labels: Vec<_> = sorted
            .iter()
            .map(|c| format!("{} {}", c.release, c.edition))
            .collect();
        assert_eq!(labels, vec!["41 xfce", "40 kde", "40 xfce"]);
    }

    #[test]
    fn test_defaults_applied() {
        let sorted = normalize(vec![Config::new("")]);
        assert_eq!(sorted[0].release, "latest");
        assert_eq!(sorted[0].guest_os, Some(GuestOs::Linux));
        assert_eq!(sorted[0].arch, Some(Arch::X86_64));
    }

    #[test]
    fn test_aliases_mapped_and_unknown_dropped() {
        let sorted = normalize(vec![
            release("1").with_arch(Arch::from("amd64")),
            release("2").with_arch(Arch::from("arm64")),
            release("3").with_arch(Arch::from("ppc64le")),
        ]);
        assert_eq!(releases(&sorted), vec!["2", "1"]);
        assert_eq!(sorted[0].arch, Some(Arch::Aarch64));
        assert_eq!(sorted[1].arch, Some(Arch::X86_64));
    }

    #[test]
    fn test_defaults_omitted_from_json() {
        let sorted = normalize(vec![release("1")]);
        let value = serde_json::to_value(&sorted[0]).unwrap();
        assert!(value.get("arch").is_none());
        assert!(value.get("guest_os").is_none());
    }

    fn arb_config() -> impl Strategy<Value = Config> {
        let labels = prop_oneof![
            "[0-9]{1,2}(\\.[0-9]{1,2}){0,2}",
            Just(String::new()),
            Just("rolling".to_string()),
            Just("latest".to_string()),
            "v[0-9]\\.[0-9]{1,2}",
        ];
        let arches = prop_oneof![
            Just(None),
            Just(Some(Arch::from("amd64"))),
            Just(Some(Arch::from("arm64"))),
            Just(Some(Arch::Riscv64)),
            Just(Some(Arch::from("sparc"))),
        ];
        (labels, "[a-z]{0,3}", arches).prop_map(|(label, edition, arch)| {
            let mut config = Config::new(label).with_edition(edition);
            config.arch = arch;
            config
        })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(configs in proptest::collection::vec(arb_config(), 0..30)) {
            let once = normalize(configs);
            let twice = normalize(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_release_order_is_antisymmetric(a in "[v0-9.a-z]{0,6}", b in "[v0-9.a-z]{0,6}") {
            prop_assert_eq!(release_order(&a, &b), release_order(&b, &a).reverse());
        }
    }
}
