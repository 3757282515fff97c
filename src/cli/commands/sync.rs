//! Sync command implementation.
//!
//! Runs one pass of the pipeline against the configured server. Ctrl-C
//! cancels the run cooperatively: in-flight transfers are dropped, their
//! partial files removed and no later stage starts.

use std::path::Path;

use colored::Colorize;
use tracing::warn;

use crate::cli::SyncArgs;
use crate::config::{load_config, resolve_options};
use crate::error::{Error, Result};
use crate::sync::{SyncCoordinator, SyncEvent, SyncOptions, SyncOutcome};

/// Execute the sync command.
///
/// # Errors
///
/// Returns an error if the settings are invalid, the HTTP client cannot be
/// built, or the run does not succeed.
pub fn execute(args: &SyncArgs, config_path: Option<&Path>, json: bool, quiet: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let options = resolve_options(&args.overrides(), &config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    rt.block_on(run(options, json, quiet))
}

async fn run(options: SyncOptions, json: bool, quiet: bool) -> Result<()> {
    let mut coordinator = SyncCoordinator::new(options)?;
    if !json && !quiet {
        coordinator.subscribe(print_event);
    }

    let token = coordinator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling sync");
            token.cancel();
        }
    });

    let outcome = coordinator.sync().await;
    interrupt.abort();

    if json {
        let output = serde_json::json!({
            "success": outcome.succeeded,
            "message": outcome.message,
            "url": coordinator.options().base_url,
            "root": coordinator.options().root.display().to_string(),
            "report": outcome.report,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if !quiet {
        print_summary(&outcome);
    }

    // A run cut short keeps its own error code; only per-file failures
    // under the strict policy surface as a generic sync failure.
    match outcome.error {
        Some(e) => Err(e.into()),
        None if outcome.succeeded => Ok(()),
        None => Err(Error::SyncFailed(outcome.message)),
    }
}

fn print_event(event: &SyncEvent<'_>) {
    match event {
        SyncEvent::PhaseChanged(_) => {}
        SyncEvent::LocalInventoryLoaded(local) => {
            println!("{} {} local files", "scan".cyan().bold(), local.len());
        }
        SyncEvent::RemoteInventoryLoaded(remote) => {
            println!("{} {} remote files", "manifest".cyan().bold(), remote.len());
        }
        SyncEvent::DiffComputed(entries) => {
            println!("{} {} to download", "diff".cyan().bold(), entries.len());
        }
        SyncEvent::FileCreated(path) => println!("  {} {path}", "+".green()),
        SyncEvent::FileFailed {
            relative_path,
            message,
        } => println!("  {} {relative_path} {}", "!".red().bold(), message.dimmed()),
        SyncEvent::FileDeleted(path) => println!("  {} {path}", "-".red()),
        SyncEvent::DirectoryDeleted(path) => println!("  {} {path}/", "-".red()),
    }
}

fn print_summary(outcome: &SyncOutcome) {
    let report = &outcome.report;

    if report.dry_run {
        for entry in &report.planned {
            println!("  {} {} {}", "~".yellow(), entry.relative_path, format!("({} bytes)", entry.expected_size_bytes).dimmed());
        }
    }

    println!();
    if outcome.succeeded {
        println!("{} {}", "Sync complete:".green().bold(), outcome.message);
    } else {
        println!("{} {}", "Sync failed:".red().bold(), outcome.message);
    }

    let failures = report.fetch.failed.iter().chain(&report.prune.failed);
    for failure in failures {
        println!("  {} {}: {}", "!".red(), failure.relative_path, failure.message.dimmed());
    }
}
