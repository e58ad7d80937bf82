//! Where account credentials come from.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::config::AppConfig;
use crate::engine::Credentials;
use crate::error::{Secret, SyncError};

/// Environment variable that overrides `account.password`.
pub const PASSWORD_ENV: &str = "COURSE_SYNC_PASSWORD";

/// Supplies the account for a run.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Returns the current account, or [`SyncError::NotConfigured`].
    async fn credentials(&self) -> Result<Credentials, SyncError>;
}

/// Reads the account from the config file on every call, so edits made in
/// the settings UI take effect without a restart.
#[derive(Debug, Clone)]
pub struct ConfigCredentials {
    path: PathBuf,
}

impl ConfigCredentials {
    /// Reads credentials from the config file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialSource for ConfigCredentials {
    async fn credentials(&self) -> Result<Credentials, SyncError> {
        let path = self.path.clone();
        let config = tokio::task::spawn_blocking(move || AppConfig::load(&path))
            .await
            .map_err(|e| SyncError::not_configured(format!("config reader failed: {e}")))?
            .map_err(|e| SyncError::not_configured(e.to_string()))?;
        debug!(path = %self.path.display(), "re-read account from config");
        credentials_from_config(&config, std::env::var(PASSWORD_ENV).ok())
    }
}

/// Builds credentials from a loaded config; `env_password` wins over the file.
///
/// # Errors
///
/// Returns [`SyncError::NotConfigured`] if the username or password is missing or blank.
pub fn credentials_from_config(
    config: &AppConfig,
    env_password: Option<String>,
) -> Result<Credentials, SyncError> {
    let id = config
        .account
        .username
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::not_configured("account.username is not set"))?;
    let secret = env_password
        .filter(|p| !p.is_empty())
        .or_else(|| config.account.password.clone())
        .filter(|p| !p.is_empty())
        .map(Secret::new)
        .ok_or_else(|| {
            SyncError::not_configured(format!(
                "account.password is not set (or export {PASSWORD_ENV})"
            ))
        })?;

    Ok(Credentials {
        id: id.to_string(),
        secret,
        reject: config.account.reject,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(username: Option<&str>, password: Option<&str>) -> AppConfig {
        let mut config = AppConfig::default();
        config.account.username = username.map(ToString::to_string);
        config.account.password = password.map(ToString::to_string);
        config
    }

    #[test]
    fn test_missing_username_is_not_configured() {
        let err = credentials_from_config(&config(None, Some("pw")), None).unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured { .. }));
        let err = credentials_from_config(&config(Some("  "), Some("pw")), None).unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured { .. }));
    }

    #[test]
    fn test_missing_password_is_not_configured() {
        let err = credentials_from_config(&config(Some("a1"), None), None).unwrap_err();
        assert!(err.to_string().contains(PASSWORD_ENV));
    }

    #[test]
    fn test_env_password_overrides_file() {
        let creds =
            credentials_from_config(&config(Some("a1"), Some("file")), Some("env".to_string()))
                .unwrap();
        assert_eq!(creds.secret.expose(), "env");
        let creds =
            credentials_from_config(&config(Some("a1"), Some("file")), Some(String::new()))
                .unwrap();
        assert_eq!(creds.secret.expose(), "file");
    }

    #[tokio::test]
    async fn test_config_credentials_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[account]\nusername = \"a1\"\npassword = \"pw\"\n[account.reject]\naudio = true\n",
        )
        .unwrap();

        let creds = ConfigCredentials::new(&path).credentials().await;
        // The environment may override the password; the id and policy come from the file.
        let creds = creds.unwrap();
        assert_eq!(creds.id, "a1");
        assert!(creds.reject.audio);
    }
}
