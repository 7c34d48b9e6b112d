//! FreeDOS.

use std::sync::OnceLock;

use futures::future::{join_all, BoxFuture};
use isocatalog::catalog::{Failure, OsProvider, ProduceContext};
use isocatalog::checksum::{fetch_checksums, ChecksumFormat, ChecksumMap};
use isocatalog::discover::basic_releases;
use isocatalog::model::{ArchiveFormat, Config, GuestOs, OsMetadata, WebSource};
use isocatalog::CatalogError;
use regex::Regex;

const MIRROR: &str = "https://www.ibiblio.org/pub/micro/pc-stuff/freedos/files/distributions/";

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"href="(\d+\.\d+)/""#).unwrap())
}

/// Captures the file name, the edition and the extension.
fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"href="(FD\d+-?(.*?CD)\.(iso|zip))""#).unwrap())
}

fn checksum_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"FD\d+.sha|verify.txt").unwrap())
}

pub struct FreeDos;

impl OsProvider for FreeDos {
    fn metadata(&self) -> OsMetadata {
        OsMetadata::new(
            "freedos",
            "FreeDOS",
            "https://www.freedos.org/",
            "DOS-compatible operating system that you can use to play classic DOS games, run legacy business software, or develop embedded systems.",
        )
    }

    fn produce<'a>(
        &'a self,
        ctx: &'a ProduceContext,
    ) -> BoxFuture<'a, Result<Vec<Config>, CatalogError>> {
        Box::pin(produce(ctx))
    }
}

async fn produce(ctx: &ProduceContext) -> Result<Vec<Config>, CatalogError> {
    let releases = basic_releases(ctx.gateway(), MIRROR, release_pattern(), None).await?;
    let configs = join_all(releases.iter().map(|release| release_configs(ctx, release))).await;
    Ok(configs.into_iter().flatten().collect())
}

async fn release_configs(ctx: &ProduceContext, release: &str) -> Vec<Config> {
    let mirror = format!("{MIRROR}{release}/official/");
    let page = match ctx.gateway().fetch_text(&mirror).await {
        Ok(page) => page,
        Err(e) => {
            ctx.fail(Failure::new(e).with_release(release)).await;
            return Vec::new();
        }
    };

    let checksums = match release_checksums(ctx, &mirror, &page).await {
        Ok(checksums) => checksums,
        Err(e) => {
            ctx.fail_checksum(Failure::new(e).with_release(release))
                .await;
            ChecksumMap::new()
        }
    };

    image_pattern()
        .captures_iter(&page)
        .map(|caps| {
            let file = &caps[1];
            let mut iso = WebSource::new(format!("{mirror}{file}"))
                .with_checksum(checksums.get(file).cloned().unwrap_or_default());
            if &caps[3] == "zip" {
                iso = iso.with_archive_format(ArchiveFormat::Zip);
            }
            Config::new(release)
                .with_edition(&caps[2])
                .with_guest_os(GuestOs::FreeDos)
                .with_iso(iso)
        })
        .collect()
}

async fn release_checksums(
    ctx: &ProduceContext,
    mirror: &str,
    page: &str,
) -> Result<ChecksumMap, CatalogError> {
    let file = checksum_file_pattern()
        .find(page)
        .ok_or_else(|| CatalogError::other("no checksum file listed"))?;
    let url = format!("{mirror}{}", file.as_str());
    Ok(fetch_checksums(ctx.gateway(), &url, &ChecksumFormat::Whitespace).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::{run, PageClient};
    use std::sync::Arc;

    const INDEX: &str = r#"<a href="1.2/">1.2/</a> <a href="1.3/">1.3/</a> <a href="1.4/">1.4/</a>"#;
    const OFFICIAL_13: &str = r#"<a href="FD13-LegacyCD.zip">FD13-LegacyCD.zip</a>
<a href="FD13-LiveCD.zip">FD13-LiveCD.zip</a>
<a href="verify.txt">verify.txt</a>"#;
    const VERIFY_13: &str = "1234abcd  FD13-LiveCD.zip\n5678ef00  FD13-LegacyCD.zip\n";
    const OFFICIAL_12: &str = r#"<a href="FD12CD.iso">FD12CD.iso</a>"#;

    #[test]
    fn test_image_pattern_editions() {
        let editions: Vec<_> = image_pattern()
            .captures_iter(OFFICIAL_13)
            .map(|caps| caps[2].to_string())
            .collect();
        assert_eq!(editions, vec!["LegacyCD", "LiveCD"]);

        let caps = image_pattern().captures(OFFICIAL_12).unwrap();
        assert_eq!(&caps[1], "FD12CD.iso");
        assert_eq!(&caps[2], "CD");
    }

    #[tokio::test]
    async fn test_freedos_configs() {
        let client = PageClient::new()
            .page(MIRROR, INDEX)
            .page(&format!("{MIRROR}1.3/official/"), OFFICIAL_13)
            .page(&format!("{MIRROR}1.3/official/verify.txt"), VERIFY_13)
            .page(&format!("{MIRROR}1.2/official/"), OFFICIAL_12)
            .missing(&format!("{MIRROR}1.4/official/"));

        let run = run(client, vec![Arc::new(FreeDos)]).await;

        let releases = &run.catalog[0].releases;
        let labels: Vec<_> = releases
            .iter()
            .map(|c| format!("{} {}", c.release, c.edition))
            .collect();
        assert_eq!(labels, vec!["1.3 LegacyCD", "1.3 LiveCD", "1.2 CD"]);

        let live = releases[1].iso[0].as_web().unwrap();
        assert_eq!(live.checksum.as_deref(), Some("1234abcd"));
        assert_eq!(live.archive_format, Some(ArchiveFormat::Zip));
        assert_eq!(releases[1].guest_os, Some(GuestOs::FreeDos));

        let legacy_iso = releases[2].iso[0].as_web().unwrap();
        assert_eq!(legacy_iso.checksum, None);
        assert_eq!(legacy_iso.archive_format, None);

        let status = run.status.source("freedos").unwrap();
        assert_eq!(status.failures.len(), 1);
        assert_eq!(status.failures[0].release, "1.4");
        assert_eq!(status.checksum_failures.len(), 1);
        assert_eq!(status.checksum_failures[0].release, "1.2");
    }
}
