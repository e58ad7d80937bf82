//! Single-flight guards for sync runs and the settings UI.
//!
//! [`SyncGuard`] lets at most one run proceed and throttles manual triggers
//! that arrive too soon after the previous run finished. [`SingleInstance`]
//! keeps a second settings window from opening while one is showing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Default minimum gap between a completed run and the next manual run.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// What asked for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User-initiated; subject to the cooldown.
    Manual,
    /// Timer-initiated; bypasses the cooldown.
    Scheduled,
}

/// Outcome of [`SyncGuard::try_acquire`].
#[derive(Debug)]
pub enum Acquire {
    /// The run may proceed; the permit releases the guard on drop.
    Granted(RunPermit),
    /// Another run holds the guard. Not an error; the caller does nothing.
    AlreadyRunning,
    /// A manual trigger inside the cooldown window.
    CoolingDown {
        /// Minutes left before a manual run is allowed, rounded up.
        remaining_minutes: u64,
    },
}

#[derive(Debug, Default)]
struct GuardState {
    running: bool,
    last_completed: Option<Instant>,
}

/// Single-flight run guard with a manual-trigger cooldown.
#[derive(Debug, Clone)]
pub struct SyncGuard {
    state: Arc<Mutex<GuardState>>,
    cooldown: Duration,
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl SyncGuard {
    /// Creates a guard with the given cooldown.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(GuardState::default())),
            cooldown,
        }
    }

    /// Tries to start a run now.
    #[must_use]
    pub fn try_acquire(&self, trigger: Trigger) -> Acquire {
        self.try_acquire_at(trigger, Instant::now())
    }

    /// Tries to start a run as if the current time were `now`.
    #[must_use]
    pub fn try_acquire_at(&self, trigger: Trigger, now: Instant) -> Acquire {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.running {
            debug!(?trigger, "run already in progress");
            return Acquire::AlreadyRunning;
        }

        if trigger == Trigger::Manual
            && let Some(completed) = state.last_completed
        {
            let elapsed = now.saturating_duration_since(completed);
            if elapsed < self.cooldown {
                let remaining_minutes = (self.cooldown - elapsed).as_secs().div_ceil(60);
                debug!(remaining_minutes, "manual run throttled");
                return Acquire::CoolingDown { remaining_minutes };
            }
        }

        state.running = true;
        Acquire::Granted(RunPermit {
            state: Arc::clone(&self.state),
            released: false,
        })
    }

    /// Returns true while a run holds the guard.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }
}

/// Proof that the holder owns the current run.
///
/// Releasing (explicitly or by drop) clears the running flag and records the
/// completion time that the cooldown is measured from.
#[derive(Debug)]
pub struct RunPermit {
    state: Arc<Mutex<GuardState>>,
    released: bool,
}

impl RunPermit {
    /// Marks the run completed now.
    pub fn release(self) {
        self.release_at(Instant::now());
    }

    /// Marks the run completed at `completed`.
    pub fn release_at(mut self, completed: Instant) {
        self.finish(completed);
    }

    fn finish(&mut self, completed: Instant) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        state.last_completed = Some(completed);
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.finish(Instant::now());
    }
}

/// Guard allowing one instance of something (the settings UI) at a time.
#[derive(Debug, Clone, Default)]
pub struct SingleInstance {
    showing: Arc<AtomicBool>,
}

impl SingleInstance {
    /// Creates a guard in the "not showing" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the instance; `None` if it is already showing.
    #[must_use]
    pub fn try_show(&self) -> Option<ShowPermit> {
        self.showing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ShowPermit {
                showing: Arc::clone(&self.showing),
            })
    }

    /// Returns true while an instance is showing.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.showing.load(Ordering::Acquire)
    }
}

/// Held while the instance is showing; dropping it frees the slot.
#[derive(Debug)]
pub struct ShowPermit {
    showing: Arc<AtomicBool>,
}

impl Drop for ShowPermit {
    fn drop(&mut self) {
        self.showing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn test_concurrent_acquire_grants_exactly_one() {
        for _ in 0..50 {
            let guard = SyncGuard::default();
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let guard = guard.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        // Keep the permit alive until both threads have tried.
                        match guard.try_acquire(Trigger::Scheduled) {
                            Acquire::Granted(permit) => Some(permit),
                            _ => None,
                        }
                    })
                })
                .collect();

            let permits: Vec<Option<RunPermit>> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(permits.iter().filter(|p| p.is_some()).count(), 1);
        }
    }

    #[test]
    fn test_release_allows_next_run() {
        let guard = SyncGuard::default();
        let Acquire::Granted(permit) = guard.try_acquire(Trigger::Scheduled) else {
            panic!("first acquire should succeed");
        };
        assert!(guard.is_running());
        assert!(matches!(
            guard.try_acquire(Trigger::Scheduled),
            Acquire::AlreadyRunning
        ));
        permit.release();
        assert!(!guard.is_running());
        assert!(matches!(
            guard.try_acquire(Trigger::Scheduled),
            Acquire::Granted(_)
        ));
    }

    #[test]
    fn test_manual_trigger_inside_cooldown_reports_remaining_minutes() {
        let guard = SyncGuard::new(Duration::from_secs(600));
        let completed = Instant::now();
        let Acquire::Granted(permit) = guard.try_acquire_at(Trigger::Manual, completed) else {
            panic!("first acquire should succeed");
        };
        permit.release_at(completed);

        let three_minutes_later = completed + Duration::from_secs(180);
        match guard.try_acquire_at(Trigger::Manual, three_minutes_later) {
            Acquire::CoolingDown { remaining_minutes } => assert_eq!(remaining_minutes, 7),
            other => panic!("expected cooldown, got {other:?}"),
        }

        assert!(matches!(
            guard.try_acquire_at(Trigger::Scheduled, three_minutes_later),
            Acquire::Granted(_)
        ));
    }

    #[test]
    fn test_remaining_minutes_round_up() {
        let guard = SyncGuard::new(Duration::from_secs(600));
        let completed = Instant::now();
        if let Acquire::Granted(permit) = guard.try_acquire_at(Trigger::Manual, completed) {
            permit.release_at(completed);
        }
        match guard.try_acquire_at(Trigger::Manual, completed + Duration::from_secs(61)) {
            Acquire::CoolingDown { remaining_minutes } => assert_eq!(remaining_minutes, 9),
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert!(matches!(
            guard.try_acquire_at(Trigger::Manual, completed + Duration::from_secs(600)),
            Acquire::Granted(_)
        ));
    }

    #[test]
    fn test_first_manual_run_is_not_throttled() {
        let guard = SyncGuard::default();
        assert!(matches!(
            guard.try_acquire(Trigger::Manual),
            Acquire::Granted(_)
        ));
    }

    #[test]
    fn test_dropped_permit_releases() {
        let guard = SyncGuard::default();
        {
            let _permit = guard.try_acquire(Trigger::Scheduled);
            assert!(guard.is_running());
        }
        assert!(!guard.is_running());
    }

    #[test]
    fn test_single_instance() {
        let ui = SingleInstance::new();
        let first = ui.try_show();
        assert!(first.is_some());
        assert!(ui.try_show().is_none());
        drop(first);
        assert!(!ui.is_showing());
        assert!(ui.try_show().is_some());
    }
}
