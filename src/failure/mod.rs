//! User-facing descriptors for sync failures.
//!
//! A run may report many errors. Users get one alert per distinct
//! [`ErrorKind`], each built from a static descriptor plus the first error of
//! that kind as detail. A cooldown rejection is not a failure and has its own
//! throttle message.

use std::collections::BTreeMap;

use crate::error::{ErrorKind, SyncError};

/// Notification sent when a run starts.
pub const SYNC_STARTED_MESSAGE: &str = "NOW DOWNLOADING";

/// Notification sent when a run reports no errors.
pub const SYNC_SUCCEEDED_MESSAGE: &str = "Download succeeded!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub kind: ErrorKind,
    pub what: &'static str,
    pub why: &'static str,
    pub fix: &'static str,
}

impl ErrorKind {
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Network => "🌐",
            Self::ServiceUnavailable => "🚧",
            Self::LoginRejected | Self::NotConfigured => "🔐",
            Self::UnexpectedResponse => "❓",
            Self::DataIntegrity => "❌",
            Self::Local => "⚠️",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::ServiceUnavailable => "Portal",
            Self::LoginRejected => "Login",
            Self::UnexpectedResponse => "Portal changed",
            Self::DataIntegrity => "Integrity",
            Self::Local => "System",
            Self::NotConfigured => "Account",
        }
    }
}

/// Returns the descriptor for a failure category.
#[must_use]
pub fn describe(kind: ErrorKind) -> FailureDescriptor {
    match kind {
        ErrorKind::Network => FailureDescriptor {
            kind,
            what: "Network error",
            why: "Something went wrong connecting to the Internet.",
            fix: "Check connectivity/VPN settings; the next run retries automatically.",
        },
        ErrorKind::ServiceUnavailable => FailureDescriptor {
            kind,
            what: "Portal unavailable",
            why: "The portal answered with an unexpected status, often during maintenance.",
            fix: "Try again later.",
        },
        ErrorKind::LoginRejected => FailureDescriptor {
            kind,
            what: "Login rejected",
            why: "The single sign-on service did not accept the account id or password.",
            fix: "Correct the account in the settings.",
        },
        ErrorKind::UnexpectedResponse => FailureDescriptor {
            kind,
            what: "Unexpected portal response",
            why: "A login page or listing no longer has the structure this tool expects.",
            fix: "Check for an update of course-sync.",
        },
        ErrorKind::DataIntegrity => FailureDescriptor {
            kind,
            what: "Incomplete download",
            why: "A file's size did not match what the portal advertised.",
            fix: "Nothing to do; the file is fetched again on the next run.",
        },
        ErrorKind::Local => FailureDescriptor {
            kind,
            what: "System error",
            why: "A file or the download ledger could not be written.",
            fix: "Check free disk space and permissions of the download folder.",
        },
        ErrorKind::NotConfigured => FailureDescriptor {
            kind,
            what: "No account configured",
            why: "An account id and password are needed to log in.",
            fix: "Fill in the account in the settings.",
        },
    }
}

/// One alert text per distinct error kind, in a stable order.
///
/// Format: `{icon} [{label}] {what}: {first error}{ (+n more)}. {why} {fix}`.
#[must_use]
pub fn alert_messages(errors: &[SyncError]) -> Vec<String> {
    let mut by_kind: BTreeMap<ErrorKind, (&SyncError, usize)> = BTreeMap::new();
    for error in errors {
        by_kind
            .entry(error.kind())
            .and_modify(|(_, count)| *count += 1)
            .or_insert((error, 1));
    }

    by_kind
        .into_iter()
        .map(|(kind, (first, count))| {
            let descriptor = describe(kind);
            let more = if count > 1 {
                format!(" (+{} more)", count - 1)
            } else {
                String::new()
            };
            format!(
                "{} [{}] {}: {first}{more}. {} {}",
                kind.icon(),
                kind.label(),
                descriptor.what,
                descriptor.why,
                descriptor.fix
            )
        })
        .collect()
}

/// Message shown when a manual run is refused by the cooldown.
#[must_use]
pub fn throttle_message(remaining_minutes: u64) -> String {
    format!("Syncing needs a cool-down. Please try again in {remaining_minutes} minute(s).")
}
