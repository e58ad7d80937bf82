//! Error taxonomy for sync runs.
//!
//! Every failure the engine can report is a [`SyncError`] carrying the context
//! needed to explain it (URL, status, file path). Callers that need to react
//! to a failure match on [`SyncError::kind`], which collapses the variants into
//! the small [`ErrorKind`] set used for user-facing reporting.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A credential value that must never end up in logs.
///
/// `Debug` and `Display` are redacted. The raw value is only reachable through
/// [`Secret::expose`].
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    /// Wraps a raw secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(********)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

/// Coarse failure category consumed by reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Transport failure: DNS, connect, TLS, timeout.
    Network,
    /// The portal answered, but not with the status we needed.
    ServiceUnavailable,
    /// The SSO endpoint explicitly rejected the credentials.
    LoginRejected,
    /// A page or payload did not have the structure we expect.
    UnexpectedResponse,
    /// A downloaded file did not have the advertised size.
    DataIntegrity,
    /// Local filesystem or ledger persistence failure.
    Local,
    /// No usable account is configured.
    NotConfigured,
}

/// Errors produced by a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error contacting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A stage did not finish before the run deadline.
    #[error("timed out during {stage}")]
    TimedOut {
        /// Human-readable stage name.
        stage: String,
    },

    /// The portal responded with an unexpected status code.
    #[error("portal unavailable: HTTP {status} from {url}")]
    ServiceUnavailable {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The SSO endpoint rejected the account.
    ///
    /// The secret is carried so callers can render it if they choose to;
    /// the `Display` impl never includes it.
    #[error("login rejected for account {id}: check the account id and password")]
    LoginRejected {
        /// Account id that was submitted.
        id: String,
        /// Secret that was submitted (redacted in Debug/Display).
        secret: Secret,
    },

    /// The portal returned a page or payload we could not interpret.
    #[error("unexpected response from {url}: {detail}")]
    UnexpectedResponse {
        /// The URL whose response did not match.
        url: String,
        /// What was wrong with it.
        detail: String,
    },

    /// Downloaded byte count differs from the catalog size.
    #[error("size mismatch for {title}: expected {expected} bytes, got {actual}")]
    DataIntegrity {
        /// Resource title.
        title: String,
        /// Destination path the bytes were written to (removed afterwards).
        path: PathBuf,
        /// Size advertised by the catalog.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// Writing a downloaded file failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Persisting the download ledger failed.
    #[error("failed to save download ledger {path}: {source}")]
    Ledger {
        /// Ledger file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No usable account is configured.
    #[error("account is not configured: {reason}")]
    NotConfigured {
        /// What is missing.
        reason: String,
    },
}

impl SyncError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a service-unavailable error.
    pub fn service_unavailable(url: impl Into<String>, status: u16) -> Self {
        Self::ServiceUnavailable {
            url: url.into(),
            status,
        }
    }

    /// Creates an unexpected-response error.
    pub fn unexpected(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a timeout error for a named stage.
    pub fn timed_out(stage: impl Into<String>) -> Self {
        Self::TimedOut {
            stage: stage.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a not-configured error.
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            reason: reason.into(),
        }
    }

    /// Returns the reporting category for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::TimedOut { .. } => ErrorKind::Network,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::LoginRejected { .. } => ErrorKind::LoginRejected,
            Self::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            Self::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            Self::Io { .. } | Self::Ledger { .. } => ErrorKind::Local,
            Self::NotConfigured { .. } => ErrorKind::NotConfigured,
        }
    }
}

// No `From<reqwest::Error>`: every variant needs the URL or path the source
// error does not carry, so the constructors above are the only entry points.
