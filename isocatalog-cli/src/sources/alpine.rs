//! Alpine Linux.

use std::sync::OnceLock;

use futures::future::{join_all, BoxFuture};
use isocatalog::catalog::{Failure, OsProvider, ProduceContext};
use isocatalog::discover::basic_releases;
use isocatalog::model::{Arch, Config, OsMetadata, WebSource};
use isocatalog::CatalogError;
use regex::Regex;

const MIRROR: &str = "https://dl-cdn.alpinelinux.org/alpine/";
const ARCHES: [Arch; 2] = [Arch::X86_64, Arch::Aarch64];

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<a href="(v[0-9]+\.[0-9]+)/""#).unwrap())
}

/// Matches the virt ISO entry of `latest-releases.yaml` and its sha256.
fn iso_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)iso: (alpine-virt-[0-9]+\.[0-9]+.*?.iso).*? sha256: ([0-9a-f]+)").unwrap()
    })
}

pub struct Alpine;

impl OsProvider for Alpine {
    fn metadata(&self) -> OsMetadata {
        OsMetadata::new(
            "alpine",
            "Alpine Linux",
            "https://alpinelinux.org/",
            "Security-oriented, lightweight Linux distribution based on musl libc and busybox.",
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

    let jobs = releases
        .iter()
        .flat_map(|release| ARCHES.iter().map(move |arch| (release.as_str(), arch.clone())));
    let configs = join_all(jobs.map(|(release, arch)| release_config(ctx, release, arch))).await;

    Ok(configs.into_iter().flatten().collect())
}

async fn release_config(ctx: &ProduceContext, release: &str, arch: Arch) -> Option<Config> {
    let mirror = format!("{MIRROR}{release}/releases/{arch}/");
    let page = match ctx
        .gateway()
        .fetch_text(&format!("{mirror}latest-releases.yaml"))
        .await
    {
        Ok(page) => page,
        Err(e) => {
            ctx.fail(Failure::new(e).with_release(release).with_arch(arch))
                .await;
            return None;
        }
    };

    // Old branches have no virt flavour
    let caps = iso_pattern().captures(&page)?;
    let iso = WebSource::new(format!("{mirror}{}", &caps[1])).with_checksum(&caps[2]);
    Some(Config::new(release).with_arch(arch).with_iso(iso))
}
