//! Config command implementation.

use std::path::PathBuf;

use crate::cli::{Cli, ConfigAction, ConfigArgs};
use crate::config::{default_config_path, Config};
use crate::error::{Result, SnatchError};

use super::load_config;

/// Run the config command.
pub fn run(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_config_path(cli),
        ConfigAction::Init { force } => init_config(cli, *force),
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path(),
    }
}

/// Show the effective configuration.
fn show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let archive = &config.archive;
    println!("[archive]");
    println!("  mode = \"{}\"", archive.mode);
    println!("  output_dir = \"{}\"", archive.output_dir.display());
    if archive.channels.is_empty() {
        println!("  channels = [] # all channels");
    } else {
        println!("  channels = {:?}", archive.channels);
    }
    println!("  history_limit = {}", archive.history_limit);
    Ok(())
}

/// Print the configuration file path.
fn show_config_path(cli: &Cli) -> Result<()> {
    let path = config_path(cli)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "path": path, "exists": path.exists() })
        );
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

/// Write a default configuration file.
fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let path = config_path(cli)?;

    if path.exists() && !force {
        return Err(SnatchError::config(format!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save_to(&path)?;
    if !cli.quiet {
        println!("Created config file at {}", path.display());
    }
    Ok(())
}
