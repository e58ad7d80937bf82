//! Bounded retry with exponential backoff for the acceptance flow.
//!
//! A gated resource answers `302` until its terms have been accepted. The
//! fetcher then calls the acceptance endpoint and asks again, up to
//! [`RetryPolicy::max_attempts`] times. The first re-request goes out
//! immediately; later ones wait with exponential backoff plus jitter.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Default number of accept-then-retry rounds.
pub const DEFAULT_ACCEPTANCE_ATTEMPTS: u32 = 1;

/// Default base delay before the second round (500 ms).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default maximum delay cap (8 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Maximum jitter added to delays (250ms).
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Configuration for acceptance retries.
///
/// # Delay Calculation
///
/// ```text
/// attempt 1: no delay
/// attempt n: min(base_delay * multiplier^(n-2), max_delay) + jitter
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Accept-then-retry rounds (at least 1).
    max_attempts: u32,

    /// Delay before the second round.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt.
    backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ACCEPTANCE_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` rounds and the given base delay.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Returns the number of accept-then-retry rounds.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns how long to wait before round `attempt` (1-indexed), or `None`
    /// once the rounds are exhausted.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            debug!(attempt, "acceptance attempts exhausted");
            return None;
        }
        if attempt == 1 {
            return Some(Duration::ZERO);
        }
        Some(self.calculate_delay(attempt) + calculate_jitter())
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_secs_f64() * 1000.0;
        let exponent = f64::from(attempt.saturating_sub(2));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_secs_f64() * 1000.0);
        Duration::from_secs_f64(capped_ms.max(0.0) / 1000.0)
    }
}

/// Random jitter between 0 and [`MAX_JITTER`].
fn calculate_jitter() -> Duration {
    let max_ms = u64::try_from(MAX_JITTER.as_millis()).unwrap_or(u64::MAX);
    let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
    Duration::from_millis(jitter_ms)
}
