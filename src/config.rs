//! TOML configuration file.
//!
//! Every section and key is optional. A missing file is the same as an empty
//! one; `portal.base_url` is only required once a sync actually runs.
//!
//! ```toml
//! [account]
//! username = "a0123456"
//! password = "..."          # or COURSE_SYNC_PASSWORD
//!
//! [account.reject]
//! video = true
//!
//! [portal]
//! base_url = "https://portal.example.ac.jp"
//!
//! [sync]
//! download_dir = "/home/me/Desktop/CourseSync"
//! cooldown_minutes = 10
//! interval_minutes = 240
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::download::RetryPolicy;
use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY, REQUEST_TIMEOUT_SECS, RUN_TIMEOUT_SECS,
};
use crate::engine::SyncOptions;
use crate::portal::{HttpSettings, PortalEndpoints, RejectPolicy};

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "course-sync";
/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Folder created under the desktop (or home) when `download_dir` is unset.
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "CourseSync";

/// Errors loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is missing or out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted key, e.g. `sync.max_concurrency`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// `[account]`
    pub account: AccountConfig,
    /// `[portal]`
    pub portal: PortalConfig,
    /// `[sync]`
    pub sync: SyncConfig,
    /// `[settings_ui]`
    pub settings_ui: SettingsUiConfig,
}

/// `[account]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    /// Portal account id.
    pub username: Option<String>,
    /// Password; `COURSE_SYNC_PASSWORD` takes precedence.
    pub password: Option<String>,
    /// Resource categories to skip.
    pub reject: RejectPolicy,
}

/// `[portal]` section. Unset paths use the portal defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalConfig {
    pub base_url: Option<String>,
    pub login_path: Option<String>,
    pub sso_url: Option<String>,
    pub sites_path: Option<String>,
    pub resources_path: Option<String>,
    pub accept_path: Option<String>,
    pub accept_ref_prefix: Option<String>,
    pub rejection_message: Option<String>,
    pub submit_label: Option<String>,
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Root folder for downloads and the ledger.
    pub download_dir: Option<PathBuf>,
    /// Minimum minutes between a completed run and the next manual run.
    pub cooldown_minutes: u64,
    /// Minutes between scheduled runs in watch mode.
    pub interval_minutes: u64,
    /// In-flight catalog or fetch requests (1..=64).
    pub max_concurrency: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Accept-then-retry rounds for gated resources.
    pub acceptance_attempts: u32,
    /// Base backoff between acceptance rounds after the first.
    pub acceptance_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            cooldown_minutes: 10,
            interval_minutes: 240,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            run_timeout_secs: RUN_TIMEOUT_SECS,
            acceptance_attempts: 1,
            acceptance_backoff_ms: 500,
        }
    }
}

/// `[settings_ui]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsUiConfig {
    /// Program and arguments; the config path is appended. Defaults to `$EDITOR` or `vi`.
    pub command: Option<Vec<String>>,
}

/// Default config path: `<config dir>/course-sync/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl AppConfig {
    /// Loads and validates `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable, malformed, or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sync = &self.sync;
        if !(1..=64).contains(&sync.max_concurrency) {
            return Err(ConfigError::invalid(
                "sync.max_concurrency",
                format!("{}. Expected range: 1..=64", sync.max_concurrency),
            ));
        }
        validate_range("sync.connect_timeout_secs", sync.connect_timeout_secs, 1, 3600)?;
        validate_range("sync.request_timeout_secs", sync.request_timeout_secs, 1, 3600)?;
        validate_range("sync.run_timeout_secs", sync.run_timeout_secs, 1, 86_400)?;
        validate_range("sync.cooldown_minutes", sync.cooldown_minutes, 0, 1440)?;
        validate_range("sync.interval_minutes", sync.interval_minutes, 1, 10_080)?;
        validate_range(
            "sync.acceptance_attempts",
            u64::from(sync.acceptance_attempts),
            1,
            10,
        )?;
        validate_range("sync.acceptance_backoff_ms", sync.acceptance_backoff_ms, 0, 60_000)?;

        if let Some(path) = &self.portal.resources_path
            && !path.contains("{site_id}")
        {
            return Err(ConfigError::invalid(
                "portal.resources_path",
                format!("{path}. Must contain {{site_id}}"),
            ));
        }
        if self.portal.base_url.is_some() {
            self.endpoints()?;
        }
        if let Some(command) = &self.settings_ui.command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::invalid("settings_ui.command", "program must not be empty"));
        }
        Ok(())
    }

    /// Portal endpoints with any overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `portal.base_url` is unset or not an http(s) URL.
    pub fn endpoints(&self) -> Result<PortalEndpoints, ConfigError> {
        let portal = &self.portal;
        let base = portal
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::invalid("portal.base_url", "not set"))?;
        let mut endpoints = PortalEndpoints::new(base)
            .map_err(|e| ConfigError::invalid("portal.base_url", e.to_string()))?;

        if let Some(v) = &portal.login_path {
            endpoints = endpoints.with_login_path(v);
        }
        if let Some(v) = &portal.sso_url {
            endpoints = endpoints.with_sso_url(v);
        }
        if let Some(v) = &portal.sites_path {
            endpoints = endpoints.with_sites_path(v);
        }
        if let Some(v) = &portal.resources_path {
            endpoints = endpoints.with_resources_path(v);
        }
        if let Some(v) = &portal.accept_path {
            endpoints = endpoints.with_accept_path(v);
        }
        if let Some(v) = &portal.accept_ref_prefix {
            endpoints = endpoints.with_accept_ref_prefix(v);
        }
        if let Some(v) = &portal.rejection_message {
            endpoints = endpoints.with_rejection_message(v);
        }
        if let Some(v) = &portal.submit_label {
            endpoints = endpoints.with_submit_label(v);
        }
        Ok(endpoints)
    }

    /// Run tunables derived from `[sync]`.
    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        let sync = &self.sync;
        SyncOptions {
            http: HttpSettings {
                connect_timeout: Duration::from_secs(sync.connect_timeout_secs),
                request_timeout: Duration::from_secs(sync.request_timeout_secs),
            },
            max_concurrency: sync.max_concurrency,
            run_timeout: Duration::from_secs(sync.run_timeout_secs),
            acceptance: RetryPolicy::new(
                sync.acceptance_attempts,
                Duration::from_millis(sync.acceptance_backoff_ms),
            ),
        }
    }

    /// Download root: `sync.download_dir`, else desktop (or home) plus `CourseSync`.
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        self.sync.download_dir.clone().unwrap_or_else(|| {
            dirs::desktop_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_DOWNLOAD_FOLDER)
        })
    }

    /// Manual-trigger cooldown.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.sync.cooldown_minutes * 60)
    }

    /// Scheduled-run interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_minutes * 60)
    }
}

fn validate_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: {min}..={max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.sync.cooldown_minutes, 10);
        assert_eq!(config.interval(), Duration::from_secs(4 * 60 * 60));
        assert_eq!(config.sync_options(), SyncOptions::default());
        assert!(config.account.username.is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let config = AppConfig::parse(
            r#"
            [account]
            username = "a0123456"
            password = "pw"

            [account.reject]
            video = true
            document = true

            [portal]
            base_url = "https://portal.example.ac.jp"
            sites_path = "/sites.json"

            [sync]
            download_dir = "/tmp/courses"
            max_concurrency = 4
            acceptance_attempts = 3

            [settings_ui]
            command = ["code", "--wait"]
            "#,
        )
        .unwrap();

        assert_eq!(config.account.username.as_deref(), Some("a0123456"));
        assert!(config.account.reject.video);
        assert!(!config.account.reject.audio);
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/courses"));
        assert_eq!(config.sync_options().acceptance.max_attempts(), 3);
        assert_eq!(
            config.endpoints().unwrap().sites(),
            "https://portal.example.ac.jp/sites.json"
        );
    }

    #[test]
    fn test_out_of_range_concurrency_rejected() {
        let err = AppConfig::parse("[sync]\nmax_concurrency = 0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sync.max_concurrency"), "Expected field in: {msg}");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = AppConfig::parse("[sync]\nturbo = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let err = AppConfig::parse("[portal]\nbase_url = \"ftp://x\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "portal.base_url",
                ..
            }
        ));
    }

    #[test]
    fn test_resources_path_needs_placeholder() {
        let err = AppConfig::parse("[portal]\nresources_path = \"/content.json\"").unwrap_err();
        assert!(err.to_string().contains("portal.resources_path"));
    }

    #[test]
    fn test_endpoints_require_base_url() {
        assert!(AppConfig::default().endpoints().is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync\n").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"), "got {err}");
    }
}
