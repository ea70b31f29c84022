//! CLI command implementations.
//!
//! Each command is implemented in its own module with a `run` function
//! that handles the command logic.

pub mod config;
pub mod run;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;

/// Load the config named by `--config`, or the default one.
pub fn load_config(cli: &Cli) -> Result<Config> {
    Config::resolve(cli.config.as_deref())
}
