//! Trigger handling around the sync engine.
//!
//! [`SyncService`] is what the binary drives: it applies the run guard and
//! cooldown, fetches credentials (opening the settings UI when none are
//! configured), runs the engine, and reports the result to the user.
//! [`SyncService::serve`] is the long-running loop behind `watch` mode.

mod credentials;
mod notifier;
mod settings_ui;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

pub use credentials::{ConfigCredentials, CredentialSource, PASSWORD_ENV, credentials_from_config};
pub use notifier::{LogNotifier, Notifier};
pub use settings_ui::{CommandSettingsUi, SettingsUi};

use crate::engine::{Credentials, SyncEngine, SyncResult};
use crate::error::{ErrorKind, SyncError};
use crate::failure::{SYNC_STARTED_MESSAGE, SYNC_SUCCEEDED_MESSAGE, alert_messages, throttle_message};
use crate::guard::{Acquire, SingleInstance, SyncGuard, Trigger};

/// Requests accepted by [`SyncService::serve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Manual sync.
    Sync,
    /// Open the settings UI.
    Settings,
    /// Stop after in-flight work finishes.
    Quit,
}

/// What happened to a trigger.
#[derive(Debug)]
pub enum RunOutcome {
    /// Another run was in progress; nothing was done.
    Skipped,
    /// A manual trigger arrived inside the cooldown.
    Throttled {
        /// Minutes until a manual run is allowed.
        remaining_minutes: u64,
    },
    /// A run happened (possibly aborted early).
    Finished(SyncResult),
}

/// Runs syncs on demand and on a schedule.
#[derive(Clone)]
pub struct SyncService {
    engine: SyncEngine,
    guard: SyncGuard,
    settings_guard: SingleInstance,
    credentials: Arc<dyn CredentialSource>,
    notifier: Arc<dyn Notifier>,
    settings_ui: Arc<dyn SettingsUi>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("engine", &self.engine)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl SyncService {
    /// Wires a service together.
    #[must_use]
    pub fn new(
        engine: SyncEngine,
        guard: SyncGuard,
        credentials: Arc<dyn CredentialSource>,
        notifier: Arc<dyn Notifier>,
        settings_ui: Arc<dyn SettingsUi>,
    ) -> Self {
        Self {
            engine,
            guard,
            settings_guard: SingleInstance::new(),
            credentials,
            notifier,
            settings_ui,
        }
    }

    /// Handles one trigger end to end.
    ///
    /// After a rejected login the settings UI is opened and awaited before
    /// returning, once the run guard has been released.
    #[instrument(skip(self))]
    pub async fn trigger(&self, trigger: Trigger) -> RunOutcome {
        let permit = match self.guard.try_acquire(trigger) {
            Acquire::Granted(permit) => permit,
            Acquire::AlreadyRunning => return RunOutcome::Skipped,
            Acquire::CoolingDown { remaining_minutes } => {
                self.notifier.notify(&throttle_message(remaining_minutes));
                return RunOutcome::Throttled { remaining_minutes };
            }
        };

        let result = match self.resolve_credentials().await {
            Ok(credentials) => {
                self.notifier.notify(SYNC_STARTED_MESSAGE);
                self.engine.run(&credentials).await
            }
            Err(error) => SyncResult::aborted(error),
        };
        permit.release();

        if self.report(&result) {
            self.show_settings().await;
        }
        RunOutcome::Finished(result)
    }

    /// Opens the settings UI and waits for it to close. Returns false if it
    /// was already open.
    pub async fn show_settings(&self) -> bool {
        let Some(_showing) = self.settings_guard.try_show() else {
            debug!("settings UI already open");
            return false;
        };
        if let Err(e) = self.settings_ui.show().await {
            warn!(error = %e, "settings UI failed");
            for message in alert_messages(&[e]) {
                self.notifier.alert(&message);
            }
        }
        true
    }

    /// Runs until `Quit` (or the sender is dropped), firing a scheduled run
    /// every `interval`. In-flight work is awaited before returning.
    #[instrument(skip(self, commands))]
    pub async fn serve(
        &self,
        mut commands: mpsc::Receiver<Command>,
        interval: Duration,
        run_now: bool,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tasks = JoinSet::new();

        if run_now {
            self.spawn_run(&mut tasks, Trigger::Scheduled);
        }

        info!(interval_secs = interval.as_secs(), "watching for triggers");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.spawn_run(&mut tasks, Trigger::Scheduled),
                command = commands.recv() => match command {
                    Some(Command::Sync) => self.spawn_run(&mut tasks, Trigger::Manual),
                    Some(Command::Settings) => {
                        let service = self.clone();
                        tasks.spawn(async move {
                            service.show_settings().await;
                        });
                    }
                    Some(Command::Quit) | None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "service task panicked");
                    }
                }
            }
        }

        info!(in_flight = tasks.len(), "stopping; waiting for in-flight work");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "service task panicked");
            }
        }
    }

    fn spawn_run(&self, tasks: &mut JoinSet<()>, trigger: Trigger) {
        let service = self.clone();
        tasks.spawn(async move {
            service.trigger(trigger).await;
        });
    }

    /// Credentials, opening the settings UI once if none are configured.
    async fn resolve_credentials(&self) -> Result<Credentials, SyncError> {
        match self.credentials.credentials().await {
            Err(SyncError::NotConfigured { reason }) => {
                info!(reason = %reason, "account not configured; opening settings");
                self.show_settings().await;
                self.credentials.credentials().await
            }
            other => other,
        }
    }

    /// Notifies or alerts about a finished run. Returns true when the
    /// account needs fixing in the settings UI.
    fn report(&self, result: &SyncResult) -> bool {
        if result.is_success() {
            self.notifier.notify(SYNC_SUCCEEDED_MESSAGE);
            return false;
        }

        for message in alert_messages(&result.errors) {
            self.notifier.alert(&message);
        }

        result
            .errors
            .iter()
            .any(|e| e.kind() == ErrorKind::LoginRejected)
    }
}
