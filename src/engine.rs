//! One complete sync run.
//!
//! Control flow: load ledger, authenticate, discover sites, list every site's
//! resources, diff against the ledger, fetch what changed, and commit exactly
//! the confirmed writes. Authentication, discovery, and catalog failures abort
//! the run; fetch failures are collected. Every stage shares one deadline.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::download::constants::{DEFAULT_MAX_CONCURRENCY, RUN_TIMEOUT_SECS};
use crate::download::{DestinationResolver, FetchCoordinator, RetryPolicy};
use crate::error::{Secret, SyncError};
use crate::ledger::DownloadLedger;
use crate::portal::{
    HttpSettings, PortalEndpoints, RejectPolicy, ResourceCatalog, SessionAuthenticator,
    SiteDiscovery,
};

/// Account used for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Portal account id.
    pub id: String,
    /// Account password.
    pub secret: Secret,
    /// Resource categories to skip.
    pub reject: RejectPolicy,
}

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Per-request timeouts.
    pub http: HttpSettings,
    /// In-flight catalog or fetch requests.
    pub max_concurrency: usize,
    /// Deadline for the whole run.
    pub run_timeout: Duration,
    /// Acceptance rounds for gated resources.
    pub acceptance: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            run_timeout: Duration::from_secs(RUN_TIMEOUT_SECS),
            acceptance: RetryPolicy::default(),
        }
    }
}

/// What a run did.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Every error the run reported; an aborted run carries exactly one.
    pub errors: Vec<SyncError>,
    /// Resources the run tried to fetch.
    pub attempted: usize,
    /// Resources written and recorded.
    pub succeeded: usize,
}

impl SyncResult {
    /// A run that stopped before fetching.
    #[must_use]
    pub fn aborted(error: SyncError) -> Self {
        Self {
            errors: vec![error],
            ..Self::default()
        }
    }

    /// Returns true when no error was reported.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs syncs against one portal into one destination.
#[derive(Clone)]
pub struct SyncEngine {
    endpoints: Arc<PortalEndpoints>,
    options: SyncOptions,
    destination: Arc<dyn DestinationResolver>,
    ledger_path: PathBuf,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("endpoints", &self.endpoints)
            .field("options", &self.options)
            .field("ledger_path", &self.ledger_path)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        endpoints: PortalEndpoints,
        options: SyncOptions,
        destination: Arc<dyn DestinationResolver>,
        ledger_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            options,
            destination,
            ledger_path: ledger_path.into(),
        }
    }

    /// Performs one run. Never fails; errors are reported in the result.
    #[instrument(skip_all, fields(id = %credentials.id))]
    pub async fn run(&self, credentials: &Credentials) -> SyncResult {
        let deadline = Instant::now() + self.options.run_timeout;
        match self.run_until(credentials, deadline).await {
            Ok(result) => result,
            Err(error) => {
                warn!(error = %error, "sync aborted");
                SyncResult::aborted(error)
            }
        }
    }

    async fn run_until(
        &self,
        credentials: &Credentials,
        deadline: Instant,
    ) -> Result<SyncResult, SyncError> {
        let mut ledger = DownloadLedger::load(&self.ledger_path).await;

        let authenticator = SessionAuthenticator::new(Arc::clone(&self.endpoints), self.options.http);
        let session = within(
            deadline,
            "login",
            authenticator.authenticate(&credentials.id, &credentials.secret),
        )
        .await?;

        let sites = within(deadline, "site discovery", SiteDiscovery.list(&session)).await?;
        info!(sites = sites.len(), "discovered current-term sites");

        let catalog = ResourceCatalog::new(credentials.reject, self.options.max_concurrency);
        let resources = within(deadline, "catalog listing", catalog.list_all(&session, sites)).await?;

        let to_fetch = ledger.diff(&resources);
        info!(
            catalog = resources.len(),
            to_fetch = to_fetch.len(),
            "computed ledger diff"
        );

        let attempted = to_fetch.len();
        let coordinator = FetchCoordinator::new(
            Arc::clone(&self.destination),
            self.options.acceptance.clone(),
            self.options.max_concurrency,
        );
        let report = coordinator.fetch_all(&session, to_fetch, deadline).await;

        let mut errors = report.errors;
        let succeeded = report.succeeded.len();
        if let Err(e) = ledger
            .commit(report.succeeded.iter().map(|(resource, _)| resource))
            .await
        {
            errors.push(e);
        }

        info!(attempted, succeeded, failed = errors.len(), "sync run finished");
        Ok(SyncResult {
            errors,
            attempted,
            succeeded,
        })
    }
}

async fn within<T>(
    deadline: Instant,
    stage: &str,
    future: impl Future<Output = Result<T, SyncError>>,
) -> Result<T, SyncError> {
    tokio::time::timeout_at(deadline, future)
        .await
        .map_err(|_| SyncError::timed_out(stage))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_result_carries_single_error() {
        let result = SyncResult::aborted(SyncError::not_configured("no username"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.attempted, 0);
        assert!(!result.is_success());
    }

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.max_concurrency, 8);
        assert_eq!(options.run_timeout, Duration::from_secs(1800));
        assert_eq!(options.acceptance.max_attempts(), 1);
    }
}
