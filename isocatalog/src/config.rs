//! Run settings loaded from an INI file.
//!
//! ```ini
//! [fetch]
//! max_concurrent_requests = 150
//! max_retries = 4
//! retry_base_delay_ms = 1000
//! retry_max_delay_ms = 30000
//! request_timeout_secs = 60
//! connect_timeout_secs = 30
//! user_agent = isocatalog/0.1
//!
//! [host_limits]
//! sourceforge.net = 5
//! zrn.co = 3
//!
//! [output]
//! catalog = quickget_data.json
//! status = status.json
//! ```
//!
//! Every key is optional. A `[host_limits]` section replaces the built-in
//! table rather than extending it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tokio::sync::Semaphore;

use crate::error::ConfigError;
use crate::fetch::{FetchSettings, HostLimits};

pub const DEFAULT_CATALOG_PATH: &str = "quickget_data.json";
pub const DEFAULT_STATUS_PATH: &str = "status.json";

/// Settings for one catalog run.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub fetch: FetchSettings,

    /// Where the catalog JSON is written.
    pub output_path: PathBuf,

    /// Where the status snapshot is written, if anywhere.
    pub status_path: Option<PathBuf>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            output_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            status_path: Some(PathBuf::from(DEFAULT_STATUS_PATH)),
        }
    }
}

impl CatalogSettings {
    /// Loads settings from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Loads settings from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses settings from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(fetch) = ini.section(Some("fetch")) {
            let section = Section::new("fetch", fetch);
            let f = &mut settings.fetch;
            if let Some(max) = section.parse::<usize>("max_concurrent_requests")? {
                f.max_concurrent_requests = section.positive("max_concurrent_requests", max)?;
            }
            if let Some(retries) = section.parse::<u32>("max_retries")? {
                f.max_retries = retries;
            }
            if let Some(ms) = section.parse::<u64>("retry_base_delay_ms")? {
                f.retry_base_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = section.parse::<u64>("retry_max_delay_ms")? {
                f.retry_max_delay = Duration::from_millis(ms);
            }
            if let Some(secs) = section.parse::<u64>("request_timeout_secs")? {
                f.request_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = section.parse::<u64>("connect_timeout_secs")? {
                f.connect_timeout = Duration::from_secs(secs);
            }
            if let Some(agent) = fetch.get("user_agent") {
                f.user_agent = agent.to_string();
            }
        }

        if let Some(hosts) = ini.section(Some("host_limits")) {
            let section = Section::new("host_limits", hosts);
            let mut limits = HostLimits::empty();
            for (host, _) in hosts.iter() {
                if let Some(limit) = section.parse::<usize>(host)? {
                    limits.insert(host, section.positive(host, limit)?);
                }
            }
            settings.fetch.host_limits = limits;
        }

        if let Some(output) = ini.section(Some("output")) {
            if let Some(catalog) = output.get("catalog") {
                settings.output_path = PathBuf::from(catalog);
            }
            if let Some(status) = output.get("status") {
                settings.status_path = (!status.trim().is_empty()).then(|| PathBuf::from(status));
            }
        }

        Ok(settings)
    }
}

struct Section<'a> {
    name: &'static str,
    properties: &'a Properties,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, properties: &'a Properties) -> Self {
        Self { name, properties }
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.properties.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| self.invalid(key, raw, e.to_string()))
    }

    fn positive(&self, key: &str, value: usize) -> Result<usize, ConfigError> {
        if value == 0 {
            Err(self.invalid(key, "0", "must be at least 1".to_string()))
        } else if value > Semaphore::MAX_PERMITS {
            Err(self.invalid(
                key,
                &value.to_string(),
                format!("must be at most {}", Semaphore::MAX_PERMITS),
            ))
        } else {
            Ok(value)
        }
    }

    fn invalid(&self, key: &str, value: &str, reason: String) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let settings = CatalogSettings::default();
        assert_eq!(settings.output_path, PathBuf::from("quickget_data.json"));
        assert_eq!(settings.status_path, Some(PathBuf::from("status.json")));
        assert_eq!(settings.fetch.max_concurrent_requests, 150);
    }

    #[test]
    fn test_parse_overrides() {
        let settings = CatalogSettings::parse(
            "[fetch]\nmax_concurrent_requests = 20\nmax_retries = 1\nretry_base_delay_ms = 250\n\
             [host_limits]\nmirror.example = 2\n\
             [output]\ncatalog = out/catalog.json\nstatus =\n",
        )
        .unwrap();

        assert_eq!(settings.fetch.max_concurrent_requests, 20);
        assert_eq!(settings.fetch.max_retries, 1);
        assert_eq!(settings.fetch.retry_base_delay, Duration::from_millis(250));
        assert_eq!(
            settings.fetch.host_limits.limit_for("mirror.example"),
            Some(("mirror.example", 2))
        );
        // The section replaces the built-in table
        assert_eq!(settings.fetch.host_limits.limit_for("sourceforge.net"), None);
        assert_eq!(settings.output_path, PathBuf::from("out/catalog.json"));
        assert_eq!(settings.status_path, None);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = CatalogSettings::parse("[fetch]\nmax_retries = lots\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "max_retries"
        ));

        let err = CatalogSettings::parse("[host_limits]\nzrn.co = 0\n").unwrap_err();
        assert!(err.to_string().contains("must be at least 1"));
    }

    #[test]
    fn test_oversized_limits_are_rejected() {
        let huge = Semaphore::MAX_PERMITS + 1;

        let err = CatalogSettings::parse(&format!("[fetch]\nmax_concurrent_requests = {huge}\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "max_concurrent_requests"
        ));

        let err =
            CatalogSettings::parse(&format!("[host_limits]\nzrn.co = {huge}\n")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref section, ref key, .. }
                if section == "host_limits" && key == "zrn.co"
        ));
        assert!(err.to_string().contains("must be at most"));

        let max = Semaphore::MAX_PERMITS;
        let settings =
            CatalogSettings::parse(&format!("[fetch]\nmax_concurrent_requests = {max}\n"))
                .unwrap();
        assert_eq!(settings.fetch.max_concurrent_requests, max);
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isocatalog.ini");
        assert_eq!(
            CatalogSettings::load_or_default(&path).unwrap().output_path,
            PathBuf::from(DEFAULT_CATALOG_PATH)
        );

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[fetch]\nuser_agent = test-agent").unwrap();
        drop(file);

        let settings = CatalogSettings::load_or_default(&path).unwrap();
        assert_eq!(settings.fetch.user_agent, "test-agent");
        assert!(CatalogSettings::load(&dir.path().join("nope.ini")).is_err());
    }
}
