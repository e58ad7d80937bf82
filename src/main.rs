//! CLI entry point for course-sync.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use course_sync::service::{CommandSettingsUi, ConfigCredentials, LogNotifier, SettingsUi};
use course_sync::{
    AppConfig, Command, DownloadLedger, FolderDestination, RunOutcome, SyncEngine, SyncGuard,
    SyncService, Trigger, default_config_path,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod cli;

use cli::{Args, CliCommand};

const EXIT_RUN_ERRORS: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config_path = args
        .config
        .or_else(default_config_path)
        .context("could not determine the config directory; pass --config")?;

    if args.command == CliCommand::ConfigPath {
        println!("{}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let settings_ui = settings_ui(&config, &config_path)?;

    if args.command == CliCommand::Settings {
        settings_ui.show().await?;
        return Ok(ExitCode::SUCCESS);
    }

    let service = build_service(&config, &config_path, settings_ui)?;
    match args.command {
        CliCommand::Watch { now } => {
            watch(&service, &config, now).await;
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(sync_once(&service).await),
    }
}

fn settings_ui(config: &AppConfig, config_path: &Path) -> Result<Arc<dyn SettingsUi>> {
    let ui = match &config.settings_ui.command {
        Some(command) => CommandSettingsUi::new(command, config_path)?,
        None => CommandSettingsUi::editor(config_path),
    };
    let ui: Arc<dyn SettingsUi> = Arc::new(ui);
    Ok(ui)
}

fn build_service(
    config: &AppConfig,
    config_path: &Path,
    settings_ui: Arc<dyn SettingsUi>,
) -> Result<SyncService> {
    let endpoints = config.endpoints().with_context(|| {
        format!(
            "the portal is not configured; set [portal] base_url in {}",
            config_path.display()
        )
    })?;

    let download_dir: PathBuf = config.download_dir();
    info!(download_dir = %download_dir.display(), "syncing into");
    let engine = SyncEngine::new(
        endpoints,
        config.sync_options(),
        Arc::new(FolderDestination::new(&download_dir)),
        DownloadLedger::path_in(&download_dir),
    );

    Ok(SyncService::new(
        engine,
        SyncGuard::new(config.cooldown()),
        Arc::new(ConfigCredentials::new(config_path)),
        Arc::new(LogNotifier),
        settings_ui,
    ))
}

async fn sync_once(service: &SyncService) -> ExitCode {
    match service.trigger(Trigger::Manual).await {
        RunOutcome::Finished(result) => {
            info!(
                attempted = result.attempted,
                succeeded = result.succeeded,
                errors = result.errors.len(),
                "sync finished"
            );
            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_RUN_ERRORS)
            }
        }
        RunOutcome::Skipped | RunOutcome::Throttled { .. } => ExitCode::SUCCESS,
    }
}

async fn watch(service: &SyncService, config: &AppConfig, now: bool) {
    let (tx, rx) = mpsc::channel(16);

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(command) = parse_command(&line) else {
                        if !line.trim().is_empty() {
                            warn!(input = %line.trim(), "unknown command; expected sync, settings or quit");
                        }
                        continue;
                    };
                    if stdin_tx.send(command).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed; timer-only mode");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = tx.send(Command::Quit).await;
        }
    });

    service.serve(rx, config.interval(), now).await;
    info!("stopped");
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "sync" | "s" => Some(Command::Sync),
        "settings" => Some(Command::Settings),
        "quit" | "exit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(" sync\n"), Some(Command::Sync));
        assert_eq!(parse_command("SETTINGS"), Some(Command::Settings));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("download everything"), None);
    }
}
