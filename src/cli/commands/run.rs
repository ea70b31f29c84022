//! Run command implementation.
//!
//! Resolves settings, checks the credential, then drives the archiver on a
//! current-thread runtime until it finishes or Ctrl+C is pressed.

use secrecy::SecretString;
use tracing::{info, warn};

use crate::archive::{ArchiveSettings, RunReport};
use crate::cli::{Cli, RunArgs};
use crate::config::{load_credential, RunMode};
use crate::error::{Result, SnatchError};

use super::load_config;

/// Run the archiver.
pub fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = load_config(cli)?;
    args.apply(&mut config.archive);
    config.archive.validate()?;

    // Fail before any connection attempt
    let token = load_credential()?;

    let settings = ArchiveSettings::from(&config.archive);
    info!(
        mode = %settings.mode,
        out = %settings.out_dir.display(),
        channels = ?config.archive.channels,
        history_limit = settings.history_limit,
        "Starting archiver"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SnatchError::io("Failed to start async runtime", e))?;
    let report = runtime.block_on(connect(token, settings))?;

    print_report(cli, &report)?;

    match (&report.export_error, report.mode) {
        (Some(message), RunMode::Active) => Err(SnatchError::export(message.clone())),
        _ => Ok(()),
    }
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(feature = "discord")]
async fn connect(token: SecretString, settings: ArchiveSettings) -> Result<RunReport> {
    crate::platform::discord::DiscordBackend::connect(&token)
        .await?
        .run(settings, shutdown_signal())
        .await
}

#[cfg(not(feature = "discord"))]
async fn connect(_token: SecretString, _settings: ArchiveSettings) -> Result<RunReport> {
    Err(SnatchError::Unsupported {
        feature: "Discord backend (built without the default `discord` feature)".to_string(),
    })
}

fn print_report(cli: &Cli, report: &RunReport) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!("Mode: {} (ended {:?})", report.mode, report.state);
    if let Some(export) = &report.export {
        println!(
            "Snapshot: {} records from {} channels -> {}",
            export.files.records,
            export.stats.channels_visited,
            export.files.json.display()
        );
        if let Some(csv) = &export.files.csv {
            println!("          {}", csv.display());
        }
        if !export.stats.channels_failed.is_empty() {
            println!("Failed channels: {}", export.stats.channels_failed.join(", "));
        }
    }
    if let Some(error) = &report.export_error {
        println!("Snapshot failed: {error}");
    }
    if report.mode.captures() {
        let capture = &report.capture;
        println!(
            "Captured: {} (ignored {} own, {} out of scope; {} failed)",
            capture.captured, capture.self_echo, capture.out_of_scope, capture.failed
        );
    }
    Ok(())
}
