//! Artifact references.

use serde::{Deserialize, Serialize};

use super::ArchiveFormat;

/// A reference to one downloadable artifact.
///
/// Serialized externally tagged, so exactly one of `web` or `docker`
/// appears in the JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "web")]
    Web(WebSource),
    #[serde(rename = "docker")]
    Container(ContainerSource),
}

impl Source {
    /// Plain web download with no checksum.
    pub fn web(url: impl Into<String>) -> Self {
        Source::Web(WebSource::new(url))
    }

    /// Web download with a checksum. An empty checksum is treated as absent.
    pub fn web_with_checksum(url: impl Into<String>, checksum: impl Into<String>) -> Self {
        Source::Web(WebSource::new(url).with_checksum(checksum))
    }

    /// The URL that validation resolves for this source.
    pub fn url(&self) -> &str {
        match self {
            Source::Web(web) => &web.url,
            Source::Container(container) => &container.url,
        }
    }

    pub fn as_web(&self) -> Option<&WebSource> {
        match self {
            Source::Web(web) => Some(web),
            Source::Container(_) => None,
        }
    }
}

impl From<WebSource> for Source {
    fn from(value: WebSource) -> Self {
        Source::Web(value)
    }
}

impl From<ContainerSource> for Source {
    fn from(value: ContainerSource) -> Self {
        Source::Container(value)
    }
}

/// An HTTP(S) download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_format: Option<ArchiveFormat>,

    /// Name the artifact is saved under. Filled in from the final redirect
    /// URL during validation when a collaborator leaves it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl WebSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            checksum: None,
            archive_format: None,
            file_name: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        let checksum = checksum.into();
        self.checksum = (!checksum.is_empty()).then_some(checksum);
        self
    }

    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = Some(format);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// A container image that produces the artifact when run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSource {
    pub url: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_dirs: Vec<String>,

    pub output_filename: String,
}

impl ContainerSource {
    pub fn new(url: impl Into<String>, output_filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            privileged: false,
            shared_dirs: Vec::new(),
            output_filename: output_filename.into(),
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn with_shared_dir(mut self, dir: impl Into<String>) -> Self {
        self.shared_dirs.push(dir.into());
        self
    }
}
