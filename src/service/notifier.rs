//! User-facing reporting sinks.

use tracing::{error, info};

/// Fire-and-forget reporting to the user.
pub trait Notifier: Send + Sync {
    /// Informational message (run started, run succeeded, throttled).
    fn notify(&self, message: &str);
    /// Error the user should act on.
    fn alert(&self, message: &str);
}

/// Reports through the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "course_sync::notify", "{message}");
    }

    fn alert(&self, message: &str) {
        error!(target: "course_sync::alert", "{message}");
    }
}
