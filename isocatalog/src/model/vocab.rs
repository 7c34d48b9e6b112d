//! Closed vocabularies used by catalog entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// CPU architecture of a release artifact.
///
/// The three architectures quickemu can boot are named variants. Anything
/// else a collaborator reports is kept verbatim in [`Arch::Other`] so that
/// normalization can filter it out rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Arch {
    X86_64,
    Aarch64,
    Riscv64,
    Other(String),
}

impl Arch {
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Riscv64 => "riscv64",
            Arch::Other(s) => s,
        }
    }

    /// Returns true for architectures kept in the final catalog.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Arch::Other(_))
    }

    /// Maps common aliases onto the canonical spelling.
    ///
    /// `amd64` becomes `x86_64` and `arm64` becomes `aarch64`. Unknown
    /// names are preserved as [`Arch::Other`].
    pub fn canonicalize(self) -> Self {
        match self {
            Arch::Other(s) => match s.as_str() {
                "" | "amd64" | "x86_64" => Arch::X86_64,
                "arm64" | "aarch64" => Arch::Aarch64,
                "riscv64" => Arch::Riscv64,
                _ => Arch::Other(s),
            },
            known => known,
        }
    }
}

impl From<String> for Arch {
    fn from(value: String) -> Self {
        match value.as_str() {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            "riscv64" => Arch::Riscv64,
            _ => Arch::Other(value),
        }
    }
}

impl From<&str> for Arch {
    fn from(value: &str) -> Self {
        Arch::from(value.to_string())
    }
}

impl From<Arch> for String {
    fn from(value: Arch) -> Self {
        match value {
            Arch::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest operating system family, used by quickemu to pick machine defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GuestOs {
    #[default]
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "linux_old")]
    LinuxOld,
    #[serde(rename = "windows")]
    Windows,
    #[serde(rename = "windows_server")]
    WindowsServer,
    #[serde(rename = "macos")]
    MacOs,
    #[serde(rename = "freebsd")]
    FreeBsd,
    #[serde(rename = "ghostbsd")]
    GhostBsd,
    #[serde(rename = "bsd")]
    GenericBsd,
    #[serde(rename = "freedos")]
    FreeDos,
    #[serde(rename = "haiku")]
    Haiku,
    #[serde(rename = "solaris")]
    Solaris,
    #[serde(rename = "kolibrios")]
    KolibriOs,
    #[serde(rename = "reactos")]
    ReactOs,
    #[serde(rename = "batocera")]
    Batocera,
}

/// Compression or container format of a downloaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "tar")]
    Tar,
    #[serde(rename = "tar.bz2")]
    TarBz2,
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "tar.xz")]
    TarXz,
    #[serde(rename = "xz")]
    Xz,
    #[serde(rename = "gz")]
    Gz,
    #[serde(rename = "bz2")]
    Bz2,
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "7z")]
    SevenZip,
}

/// Disk image format understood by qemu-img.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    Qcow2,
    Raw,
    Qed,
    Qcow,
    Vdi,
    Vpc,
    Vhdx,
}
