//! The external settings editor.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Shows the settings UI and resolves once it is closed.
#[async_trait]
pub trait SettingsUi: Send + Sync {
    /// Opens the UI and waits for it to close.
    async fn show(&self) -> Result<(), SyncError>;
}

/// Opens the config file in an external program (an editor by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSettingsUi {
    program: String,
    args: Vec<String>,
    config_path: PathBuf,
}

impl CommandSettingsUi {
    /// Runs `command[0] command[1..] <config_path>`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotConfigured`] if `command` is empty.
    pub fn new(command: &[String], config_path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SyncError::not_configured("settings_ui.command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            config_path: config_path.into(),
        })
    }

    /// Uses `$VISUAL`, then `$EDITOR`, then `vi`.
    #[must_use]
    pub fn editor(config_path: impl Into<PathBuf>) -> Self {
        let program = ["VISUAL", "EDITOR"]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self {
            program,
            args: Vec::new(),
            config_path: config_path.into(),
        }
    }

    /// Program that will be launched.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SettingsUi for CommandSettingsUi {
    async fn show(&self) -> Result<(), SyncError> {
        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }

        debug!(program = %self.program, path = %self.config_path.display(), "opening settings");
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&self.config_path)
            .status()
            .await
            .map_err(|e| SyncError::io(&self.program, e))?;
        if !status.success() {
            warn!(program = %self.program, code = ?status.code(), "settings program exited with failure");
        }
        Ok(())
    }
}
