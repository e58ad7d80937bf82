//! Streaming resources from the portal to disk.
//!
//! # Features
//!
//! - One task per resource, bounded by a semaphore
//! - Acceptance flow for copyright-gated resources (`302` then accept then retry)
//! - Size verification against the catalog; partial files are removed
//! - Pluggable destination naming ([`DestinationResolver`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use course_sync::download::{FetchCoordinator, FolderDestination, RetryPolicy};
//!
//! let coordinator = FetchCoordinator::new(
//!     Arc::new(FolderDestination::new("./CourseSync")),
//!     RetryPolicy::new(2, Duration::from_millis(500)),
//!     8,
//! );
//! # let _ = coordinator;
//! ```

pub mod constants;
mod coordinator;
mod destination;
mod retry;

pub use coordinator::{FetchCoordinator, FetchReport};
pub use destination::{Destination, DestinationResolver, FolderDestination};
pub use retry::{DEFAULT_ACCEPTANCE_ATTEMPTS, DEFAULT_BASE_DELAY, RetryPolicy};

// Note: no module-local Result aliases.
// Use `Result<T, SyncError>` explicitly in function signatures.
