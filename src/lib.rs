//! Course portal sync library
//!
//! Keeps a local folder in step with the course materials published on a
//! university course portal: log in through the campus SSO, find this term's
//! course sites, list their resources, and download whatever is new or changed
//! since the last run.
//!
//! # Architecture
//!
//! - [`portal`] - SSO login, site discovery, resource listing, reject policy
//! - [`download`] - parallel fetching, acceptance flow, destination naming
//! - [`ledger`] - persisted record of synced resources and the diff against it
//! - [`engine`] - one complete run from login to ledger commit
//! - [`guard`] - single-flight run guard with cooldown, settings UI guard
//! - [`service`] - triggers, credentials, notifications, watch loop
//! - [`config`] - TOML configuration file
//! - [`failure`] - user-facing descriptions of failures

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod failure;
mod fan_out;
pub mod guard;
pub mod ledger;
pub mod portal;
pub mod service;
mod user_agent;

// Re-export commonly used types
pub use config::{AppConfig, ConfigError, default_config_path};
pub use download::{DestinationResolver, FetchCoordinator, FolderDestination, RetryPolicy};
pub use engine::{Credentials, SyncEngine, SyncOptions, SyncResult};
pub use error::{ErrorKind, Secret, SyncError};
pub use guard::{Acquire, RunPermit, SingleInstance, SyncGuard, Trigger};
pub use ledger::DownloadLedger;
pub use portal::{
    PortalEndpoints, RejectPolicy, Resource, ResourceCatalog, Session, SessionAuthenticator,
    Site, SiteDiscovery,
};
pub use service::{Command, RunOutcome, SyncService};
