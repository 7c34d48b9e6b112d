//! Catalog data model.
//!
//! The types in this module form the JSON document consumed by quickget.
//! Field names and enum spellings are part of that wire contract.
//!
//! ```text
//! OsData
//!  ├── name / pretty_name / homepage / description
//!  └── releases: Vec<Config>
//!        ├── release, edition, guest_os, arch
//!        ├── iso / img / fixed_iso / floppy: Vec<Source>
//!        └── disk_images: Vec<Disk>
//!
//! Source = Web(WebSource) | Container(ContainerSource)
//! ```

mod config;
mod source;
mod vocab;

pub use config::{Config, Disk, OsData, OsMetadata, Validation, LATEST_RELEASE};
pub use source::{ContainerSource, Source, WebSource};
pub use vocab::{ArchiveFormat, Arch, DiskFormat, GuestOs};
