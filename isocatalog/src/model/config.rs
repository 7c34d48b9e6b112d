//! Release entries and per-OS catalog records.

use serde::{Deserialize, Serialize};

use super::{Arch, DiskFormat, GuestOs, Source};

/// Release tag used when a collaborator leaves the release empty.
pub const LATEST_RELEASE: &str = "latest";

/// Per-config validation policy. Never serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validation {
    /// Skip URL resolution entirely. Used for sources that refuse
    /// unauthenticated requests.
    pub skip: bool,
    /// Treat HTTP 403 from a mirror as reachable.
    pub accept_forbidden: bool,
}

/// A disk image together with its sizing hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub source: Source,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DiskFormat>,
}

impl Disk {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            size: None,
            format: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_format(mut self, format: DiskFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// One release / edition / architecture entry of an operating system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub release: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub edition: String,

    /// `None` and `Some(Linux)` are equivalent; both are omitted on output.
    #[serde(default, alias = "os", skip_serializing_if = "omit_guest_os")]
    pub guest_os: Option<GuestOs>,

    /// `None` and `Some(X86_64)` are equivalent; both are omitted on output.
    #[serde(default, skip_serializing_if = "omit_arch")]
    pub arch: Option<Arch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub iso: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub img: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_iso: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floppy: Vec<Source>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disk_images: Vec<Disk>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tpm: bool,

    /// Minimum RAM in bytes, when the guest needs more than quickemu's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,

    #[serde(skip)]
    pub validation: Validation,
}

fn omit_guest_os(value: &Option<GuestOs>) -> bool {
    matches!(value, None | Some(GuestOs::Linux))
}

fn omit_arch(value: &Option<Arch>) -> bool {
    matches!(value, None | Some(Arch::X86_64))
}

impl Config {
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            ..Default::default()
        }
    }

    pub fn with_edition(mut self, edition: impl Into<String>) -> Self {
        self.edition = edition.into();
        self
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn with_guest_os(mut self, guest_os: GuestOs) -> Self {
        self.guest_os = Some(guest_os);
        self
    }

    pub fn with_iso(mut self, source: impl Into<Source>) -> Self {
        self.iso.push(source.into());
        self
    }

    pub fn with_img(mut self, source: impl Into<Source>) -> Self {
        self.img.push(source.into());
        self
    }

    pub fn with_fixed_iso(mut self, source: impl Into<Source>) -> Self {
        self.fixed_iso.push(source.into());
        self
    }

    pub fn with_floppy(mut self, source: impl Into<Source>) -> Self {
        self.floppy.push(source.into());
        self
    }

    pub fn with_disk(mut self, disk: Disk) -> Self {
        self.disk_images.push(disk);
        self
    }

    pub fn with_tpm(mut self) -> Self {
        self.tpm = true;
        self
    }

    pub fn with_ram(mut self, bytes: u64) -> Self {
        self.ram = Some(bytes);
        self
    }

    /// Marks the config as exempt from URL validation.
    pub fn skip_validation(mut self) -> Self {
        self.validation.skip = true;
        self
    }

    /// Accepts HTTP 403 responses during validation.
    pub fn accept_forbidden(mut self) -> Self {
        self.validation.accept_forbidden = true;
        self
    }

    /// The architecture with the `x86_64` default applied.
    pub fn effective_arch(&self) -> Arch {
        self.arch.clone().unwrap_or(Arch::X86_64)
    }

    /// Every artifact source, including those nested in disk images.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.iso
            .iter()
            .chain(&self.img)
            .chain(&self.fixed_iso)
            .chain(&self.floppy)
            .chain(self.disk_images.iter().map(|disk| &disk.source))
    }

    /// Mutable access to every artifact source.
    pub fn sources_mut(&mut self) -> impl Iterator<Item = &mut Source> {
        self.iso
            .iter_mut()
            .chain(self.img.iter_mut())
            .chain(self.fixed_iso.iter_mut())
            .chain(self.floppy.iter_mut())
            .chain(self.disk_images.iter_mut().map(|disk| &mut disk.source))
    }

    /// Human-readable identity used in log lines and failure records.
    pub fn label(&self) -> String {
        let mut label = self.release.clone();
        if !self.edition.is_empty() {
            label.push(' ');
            label.push_str(&self.edition);
        }
        label.push_str(&format!(" ({})", self.effective_arch()));
        label
    }
}

/// Descriptive metadata of an operating system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsMetadata {
    pub name: String,
    pub pretty_name: String,
    pub homepage: String,
    pub description: String,
}

impl OsMetadata {
    pub fn new(
        name: impl Into<String>,
        pretty_name: impl Into<String>,
        homepage: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pretty_name: pretty_name.into(),
            homepage: homepage.into(),
            description: description.into(),
        }
    }
}

/// The final catalog record of one operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsData {
    #[serde(flatten)]
    pub metadata: OsMetadata,
    pub releases: Vec<Config>,
}

impl OsData {
    pub fn new(metadata: OsMetadata, releases: Vec<Config>) -> Self {
        Self { metadata, releases }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}
