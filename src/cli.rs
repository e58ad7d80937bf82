//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keep a local folder in sync with your course portal.
///
/// Logs in through the campus SSO, lists this term's course sites and
/// downloads every resource that is new or changed since the last run.
#[derive(Parser, Debug)]
#[command(name = "course-sync")]
#[command(author, version, about)]
#[command(after_help = "Exit codes:\n  0 = sync finished without errors\n  1 = sync reported errors\n  2 = invalid arguments or configuration")]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/course-sync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Run one manual sync and exit
    Sync,

    /// Stay running: sync on a timer and read `sync`, `settings`, `quit` from stdin
    Watch {
        /// Run a sync immediately at startup
        #[arg(long)]
        now: bool,
    },

    /// Open the settings editor
    Settings,

    /// Print the config file path
    ConfigPath,
}
