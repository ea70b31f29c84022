//! Configuration management for chat-snatch.
//!
//! Layering, lowest precedence first:
//! - built-in defaults
//! - `config.toml` (user config dir, or `--config`)
//! - environment variables (`.env` included)
//! - command-line flags
//!
//! The last two layers are applied by the CLI; this module owns the first two
//! and the platform credential.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnatchError};
use crate::util::{atomic_write, read_optional};

/// Environment variable holding the platform credential.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Environment variable that takes precedence over [`TOKEN_ENV`].
pub const TOKEN_OVERRIDE_ENV: &str = "SNATCH_TOKEN";

/// Application directory name under the user config dir.
pub const APP_DIR: &str = "chat-snatch";

/// Which halves of the pipeline run after connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Live capture only.
    Passive,
    /// One bulk export, then stop.
    Active,
    /// Bulk export, then live capture.
    #[default]
    Both,
}

impl RunMode {
    /// Whether a bulk export runs on connect.
    #[must_use]
    pub const fn exports(self) -> bool {
        matches!(self, Self::Active | Self::Both)
    }

    /// Whether live capture is armed after connect.
    #[must_use]
    pub const fn captures(self) -> bool {
        matches!(self, Self::Passive | Self::Both)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::Active => "active",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = SnatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passive" => Ok(Self::Passive),
            "active" => Ok(Self::Active),
            "both" => Ok(Self::Both),
            other => Err(SnatchError::config(format!(
                "Unknown mode '{other}' (expected passive, active or both)"
            ))),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Archiver settings.
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// `[archive]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Run mode.
    #[serde(default)]
    pub mode: RunMode,
    /// Output directory for snapshots and live logs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Channel ids or names to archive. Empty archives everything.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Messages fetched per channel during a bulk export.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            output_dir: default_output_dir(),
            channels: Vec::new(),
            history_limit: default_history_limit(),
        }
    }
}

impl ArchiveConfig {
    /// Reject settings no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(SnatchError::config("output_dir must not be empty"));
        }
        if self.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(SnatchError::config("channels must not contain empty entries"));
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

const fn default_history_limit() -> usize {
    500
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Ok(path) => Ok(Self::load_optional(&path)?.unwrap_or_default()),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load from an explicit path if given, else from the default location.
    ///
    /// An explicit path must exist.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_optional(path)?.ok_or_else(|| SnatchError::InvalidConfig {
            path: path.to_path_buf(),
            message: "file not found".to_string(),
        })
    }

    fn load_optional(path: &Path) -> Result<Option<Self>> {
        let Some(content) = read_optional(path)? else {
            return Ok(None);
        };
        let config: Self = toml::from_str(&content).map_err(|e| SnatchError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.archive.validate()?;
        Ok(Some(config))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = default_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific path atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SnatchError::config(format!("Failed to serialize config: {e}")))?;
        atomic_write(path, content.as_bytes())
    }
}

/// Get the default configuration path.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| SnatchError::Unsupported {
        feature: "config directory discovery".to_string(),
    })?;

    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

/// Load `.env` from the working directory into the process environment.
///
/// Existing variables are not overwritten. Returns the file loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Read the platform credential from the process environment.
pub fn load_credential() -> Result<SecretString> {
    credential_from(|key| std::env::var(key).ok())
}

/// Read the platform credential through `lookup`.
///
/// [`TOKEN_OVERRIDE_ENV`] wins over [`TOKEN_ENV`]; blank values count as unset.
pub fn credential_from<F>(lookup: F) -> Result<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    [TOKEN_OVERRIDE_ENV, TOKEN_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .map(SecretString::new)
        .ok_or_else(|| SnatchError::MissingCredential {
            variable: TOKEN_ENV.to_string(),
        })
}
