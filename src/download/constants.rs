//! Constants for the download module (timeouts, naming).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default whole-request timeout (5 minutes for large lecture videos).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default deadline for one complete sync run (30 minutes).
pub const RUN_TIMEOUT_SECS: u64 = 1800;

/// Default number of in-flight catalog or fetch requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Numbered collision suffixes tried before falling back to a random prefix.
pub const MAX_NUMBERED_COLLISIONS: u32 = 9;

/// Write buffer for streamed downloads.
pub const WRITE_BUFFER_BYTES: usize = 64 * 1024;
