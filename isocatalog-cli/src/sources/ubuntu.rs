//! Ubuntu and its official flavours.
//!
//! All flavours share one release list from Launchpad, fetched once per
//! run, and publish a `SHA256SUMS` file next to their images.

use std::sync::{Arc, OnceLock};

use futures::future::{join_all, BoxFuture};
use isocatalog::catalog::{Failure, Memo, OsProvider, ProduceContext};
use isocatalog::checksum::single_value;
use isocatalog::fetch::FetchGateway;
use isocatalog::model::{ArchiveFormat, Arch, Config, GuestOs, OsMetadata, WebSource};
use isocatalog::version::ReleaseVersion;
use isocatalog::CatalogError;
use serde::Deserialize;

const LAUNCHPAD_SERIES_URL: &str = "https://api.launchpad.net/devel/ubuntu/series";
const DAILY_LIVE: &str = "daily-live";

const X86_64_ONLY: &[Arch] = &[Arch::X86_64];
const X86_64_AARCH64: &[Arch] = &[Arch::X86_64, Arch::Aarch64];
const ALL_ARCHES: &[Arch] = &[Arch::X86_64, Arch::Aarch64, Arch::Riscv64];

struct Flavour {
    name: &'static str,
    pretty_name: &'static str,
    homepage: &'static str,
    description: &'static str,
    /// Directory name on cdimage.ubuntu.com.
    variant: &'static str,
    arches: &'static [Arch],
}

const FLAVOURS: &[Flavour] = &[
    Flavour {
        name: "edubuntu",
        pretty_name: "Edubuntu",
        homepage: "https://www.edubuntu.org/",
        description: "Stable, secure and privacy concious option for schools.",
        variant: "edubuntu",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "kubuntu",
        pretty_name: "Kubuntu",
        homepage: "https://kubuntu.org/",
        description: "Free, complete, and open-source alternative to Microsoft Windows and Mac OS X which contains everything you need to work, play, or share.",
        variant: "kubuntu",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "lubuntu",
        pretty_name: "Lubuntu",
        homepage: "https://lubuntu.me/",
        description: "Complete Operating System that ships the essential apps and services for daily use: office applications, PDF reader, image editor, music and video players, etc.",
        variant: "lubuntu",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu",
        pretty_name: "Ubuntu",
        homepage: "https://www.ubuntu.com/",
        description: "Complete desktop Linux operating system, freely available with both community and professional support.",
        variant: "ubuntu",
        arches: X86_64_AARCH64,
    },
    Flavour {
        name: "ubuntu-budgie",
        pretty_name: "Ubuntu Budgie",
        homepage: "https://ubuntubudgie.org/",
        description: "Community developed distribution, integrating the Budgie Desktop Environment with Ubuntu at its core.",
        variant: "ubuntu-budgie",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu-cinnamon",
        pretty_name: "Ubuntu Cinnamon",
        homepage: "https://ubuntucinnamon.org/",
        description: "Community-driven, featuring Linux Mint's Cinnamon Desktop with Ubuntu at the core.",
        variant: "ubuntucinnamon",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu-kylin",
        pretty_name: "Ubuntu Kylin",
        homepage: "https://www.ubuntukylin.com/",
        description: "Universal desktop operating system for personal computers, laptops, and embedded devices.",
        variant: "ubuntukylin",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu-mate",
        pretty_name: "Ubuntu MATE",
        homepage: "https://ubuntu-mate.org/",
        description: "Stable, easy-to-use operating system with a configurable desktop environment.",
        variant: "ubuntu-mate",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu-server",
        pretty_name: "Ubuntu Server",
        homepage: "https://www.ubuntu.com/server",
        description: "Brings economic and technical scalability to your datacentre, public or private.",
        variant: "ubuntu-server",
        arches: ALL_ARCHES,
    },
    Flavour {
        name: "ubuntu-studio",
        pretty_name: "Ubuntu Studio",
        homepage: "https://ubuntustudio.org/",
        description: "Comes preinstalled with a selection of the most common free multimedia applications available, and is configured for best performance for various purposes: Audio, Graphics, Video, Photography and Publishing.",
        variant: "ubuntustudio",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "ubuntu-unity",
        pretty_name: "Ubuntu Unity",
        homepage: "https://ubuntuunity.org/",
        description: "Flavor of Ubuntu featuring the Unity7 desktop environment.",
        variant: "ubuntu-unity",
        arches: X86_64_ONLY,
    },
    Flavour {
        name: "xubuntu",
        pretty_name: "Xubuntu",
        homepage: "https://xubuntu.org/",
        description: "Elegant and easy to use operating system. Xubuntu comes with Xfce, which is a stable, light and configurable desktop environment.",
        variant: "xubuntu",
        arches: X86_64_ONLY,
    },
];

/// One provider per flavour, all sharing a single release lookup.
pub fn family() -> Vec<Arc<dyn OsProvider>> {
    let releases = Arc::new(Memo::new());
    FLAVOURS
        .iter()
        .map(|flavour| {
            Arc::new(UbuntuFlavour {
                flavour,
                releases: Arc::clone(&releases),
            }) as Arc<dyn OsProvider>
        })
        .collect()
}

pub struct UbuntuFlavour {
    flavour: &'static Flavour,
    releases: Arc<Memo<Vec<String>>>,
}

impl OsProvider for UbuntuFlavour {
    fn metadata(&self) -> OsMetadata {
        let f = self.flavour;
        OsMetadata::new(f.name, f.pretty_name, f.homepage, f.description)
    }

    fn produce<'a>(
        &'a self,
        ctx: &'a ProduceContext,
    ) -> BoxFuture<'a, Result<Vec<Config>, CatalogError>> {
        Box::pin(async move {
            let releases = self
                .releases
                .get_or_init(|| fetch_releases(ctx.gateway()))
                .await?;

            let variant = self.flavour.variant;
            let jobs = releases.iter().flat_map(|release| {
                self.flavour
                    .arches
                    .iter()
                    .map(move |arch| (release.as_str(), arch.clone()))
            });
            let configs =
                join_all(jobs.map(|(release, arch)| release_config(ctx, variant, release, arch)))
                    .await;

            Ok(configs.into_iter().flatten().collect())
        })
    }
}

#[derive(Debug, Deserialize)]
struct LaunchpadSeries {
    entries: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    version: String,
    status: String,
}

/// Supported releases from Launchpad, plus the daily build.
async fn fetch_releases(gateway: &FetchGateway) -> Result<Vec<String>, CatalogError> {
    let series: LaunchpadSeries = gateway.fetch_json(LAUNCHPAD_SERIES_URL).await?;
    let mut releases: Vec<String> = series
        .entries
        .into_iter()
        .filter(|e| e.status == "Supported" || e.status == "Current Stable Release")
        .map(|e| e.version)
        .collect();
    releases.push(DAILY_LIVE.to_string());
    Ok(releases)
}

fn release_url(release: &str, variant: &str, arch: &Arch) -> String {
    if release == DAILY_LIVE {
        format!("https://cdimage.ubuntu.com/{variant}/daily-live/current/")
    } else if variant == "ubuntu-server" || (variant == "ubuntu" && *arch == Arch::X86_64) {
        format!("https://releases.ubuntu.com/{release}/")
    } else if variant == "ubuntu" {
        format!("https://cdimage.ubuntu.com/releases/{release}/release/")
    } else {
        format!("https://cdimage.ubuntu.com/{variant}/releases/{release}/release/")
    }
}

/// Picks the `SHA256SUMS` line for this variant's image.
fn find_line<'a>(sums: &'a str, variant: &str, arch: &Arch) -> Option<&'a str> {
    let arch_text = match arch {
        Arch::X86_64 => "amd64.iso",
        Arch::Aarch64 => "arm64.iso",
        Arch::Riscv64 => "riscv64.img.gz",
        Arch::Other(_) => return None,
    };
    let sku = match variant {
        "ubuntu-server" => "live-server",
        "ubuntustudio" => "dvd",
        _ => "desktop",
    };
    sums.lines()
        .find(|line| line.contains(arch_text) && line.contains(sku))
}

fn predates_xenial(release: &str) -> bool {
    static XENIAL: OnceLock<Option<ReleaseVersion>> = OnceLock::new();
    let xenial = XENIAL.get_or_init(|| ReleaseVersion::parse("16.04"));
    match (ReleaseVersion::parse(release), xenial) {
        (Some(version), Some(xenial)) => version < *xenial,
        _ => false,
    }
}

async fn release_config(
    ctx: &ProduceContext,
    variant: &str,
    release: &str,
    arch: Arch,
) -> Option<Config> {
    let base = release_url(release, variant, &arch);
    let sums = match ctx.gateway().fetch_text(&format!("{base}SHA256SUMS")).await {
        Ok(sums) => sums,
        Err(e) => {
            ctx.fail(Failure::new(e).with_release(release).with_arch(arch))
                .await;
            return None;
        }
    };
    let line = find_line(&sums, variant, &arch)?;

    let checksum = match single_value(line) {
        Ok(checksum) => checksum,
        Err(e) => {
            ctx.fail_checksum(Failure::new(e).with_release(release).with_arch(arch.clone()))
                .await;
            String::new()
        }
    };
    let file = match line.split_once('*') {
        Some((_, file)) => file.trim(),
        None => line.split_whitespace().last().unwrap_or(line),
    };

    let source = WebSource::new(format!("{base}{file}")).with_checksum(checksum);
    let mut config = Config::new(release).with_arch(arch.clone());
    if predates_xenial(release) {
        config = config.with_guest_os(GuestOs::LinuxOld);
    }
    Some(if arch == Arch::Riscv64 {
        config.with_img(source.with_archive_format(ArchiveFormat::Gz))
    } else {
        config.with_iso(source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support::{run, PageClient};

    const SERIES: &str = r#"{"entries":[
        {"version":"24.10","status":"Current Stable Release"},
        {"version":"24.04","status":"Supported"},
        {"version":"23.10","status":"Obsolete"},
        {"version":"14.04","status":"Supported"}
    ]}"#;

    fn sums(name: &str) -> String {
        format!(
            "aaaa *{name}-desktop-amd64.iso\nbbbb *{name}-live-server-amd64.iso\n\
             cccc *{name}-live-server-arm64.iso\ndddd *{name}-live-server-riscv64.img.gz\n"
        )
    }

    #[test]
    fn test_release_urls() {
        assert_eq!(
            release_url("24.04", "ubuntu", &Arch::X86_64),
            "https://releases.ubuntu.com/24.04/"
        );
        assert_eq!(
            release_url("24.04", "ubuntu", &Arch::Aarch64),
            "https://cdimage.ubuntu.com/releases/24.04/release/"
        );
        assert_eq!(
            release_url("24.04", "ubuntu-server", &Arch::Riscv64),
            "https://releases.ubuntu.com/24.04/"
        );
        assert_eq!(
            release_url("24.04", "kubuntu", &Arch::X86_64),
            "https://cdimage.ubuntu.com/kubuntu/releases/24.04/release/"
        );
        assert_eq!(
            release_url(DAILY_LIVE, "xubuntu", &Arch::X86_64),
            "https://cdimage.ubuntu.com/xubuntu/daily-live/current/"
        );
    }

    #[test]
    fn test_find_line_by_sku() {
        let text = sums("ubuntu-24.04");
        assert_eq!(
            find_line(&text, "ubuntu-server", &Arch::Aarch64),
            Some("cccc *ubuntu-24.04-live-server-arm64.iso")
        );
        assert_eq!(
            find_line(&text, "ubuntu", &Arch::X86_64),
            Some("aaaa *ubuntu-24.04-desktop-amd64.iso")
        );
        assert_eq!(find_line(&text, "ubuntustudio", &Arch::X86_64), None);
    }

    #[test]
    fn test_predates_xenial() {
        assert!(predates_xenial("14.04"));
        assert!(!predates_xenial("16.04"));
        assert!(!predates_xenial("daily-live"));
    }

    #[tokio::test]
    async fn test_server_configs_across_arches() {
        let mut client = PageClient::new().page(LAUNCHPAD_SERIES_URL, SERIES);
        for release in ["24.10", "24.04", "14.04"] {
            client = client.page(
                &format!("https://releases.ubuntu.com/{release}/SHA256SUMS"),
                &sums(&format!("ubuntu-{release}")),
            );
        }
        client = client.missing("https://cdimage.ubuntu.com/ubuntu-server/daily-live/current/SHA256SUMS");

        let server: Vec<_> = family()
            .into_iter()
            .filter(|p| p.metadata().name == "ubuntu-server")
            .collect();
        let run = run(client, server).await;

        let releases = &run.catalog[0].releases;
        // 3 releases x 3 arches; the daily build failed
        assert_eq!(releases.len(), 9);
        assert_eq!(releases[0].release, "24.10");

        let riscv = releases
            .iter()
            .find(|c| c.release == "24.04" && c.effective_arch() == Arch::Riscv64)
            .unwrap();
        let img = riscv.img[0].as_web().unwrap();
        assert_eq!(
            img.url,
            "https://releases.ubuntu.com/24.04/ubuntu-24.04-live-server-riscv64.img.gz"
        );
        assert_eq!(img.archive_format, Some(ArchiveFormat::Gz));
        assert_eq!(img.checksum.as_deref(), Some("dddd"));

        let trusty = releases.iter().find(|c| c.release == "14.04").unwrap();
        assert_eq!(trusty.guest_os, Some(GuestOs::LinuxOld));

        let status = run.status.source("ubuntu-server").unwrap();
        // One failure per architecture of the daily build
        assert_eq!(status.failures.len(), 3);
    }

    #[tokio::test]
    async fn test_release_list_shared_between_flavours() {
        let client = PageClient::new().missing(LAUNCHPAD_SERIES_URL);
        let run = run(client, family()).await;
        assert!(run.catalog.is_empty());
        assert_eq!(run.status.snapshot().failed, FLAVOURS.len());
    }
}
