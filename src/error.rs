//! Error types for chat-snatch.
//!
//! Errors fall into four classes:
//! - configuration errors (missing credential, bad config file), which are
//!   fatal and stop the process before any connection attempt
//! - per-channel fetch errors during a bulk export, which skip one channel
//! - storage errors (directory creation, file write), which abandon one write
//! - malformed prior state (an unparseable live log), which is recovered inside
//!   the sink and never reaches a caller
//!
//! Only the first class is escalated to a non-zero process exit.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for chat-snatch operations.
#[derive(Error, Debug)]
pub enum SnatchError {
    /// The platform access credential was not supplied.
    #[error("No platform credential found (set {variable} in the environment or .env)")]
    MissingCredential {
        /// Environment variable that was expected to hold the credential.
        variable: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Human-readable error message.
        message: String,
    },

    /// Invalid configuration file contents.
    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig {
        /// Path of the offending file.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },

    /// Fetching history for one channel failed.
    #[error("Failed to fetch history for channel {channel}: {message}")]
    ChannelFetch {
        /// Channel name or id.
        channel: String,
        /// Human-readable error message.
        message: String,
    },

    /// The chat platform connection failed.
    #[error("Platform connection failed: {message}")]
    Platform {
        /// Human-readable error message.
        message: String,
    },

    /// Export error.
    #[error("Export failed: {message}")]
    ExportError {
        /// Human-readable error message.
        message: String,
        /// Underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O error.
    #[error("I/O error: {context}")]
    IoError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {context}")]
    SerializationError {
        /// Context describing the operation that failed.
        context: String,
        /// Underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },

    /// Interrupted operation.
    #[error("Operation interrupted")]
    Interrupted,

    /// Unsupported operation or feature.
    #[error("Unsupported: {feature}")]
    Unsupported {
        /// Name of the unsupported feature.
        feature: String,
    },
}

impl SnatchError {
    /// Create a new I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            context: context.into(),
            source,
        }
    }

    /// Create a new export error.
    #[must_use]
    pub fn export(message: impl Into<String>) -> Self {
        Self::ExportError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new per-channel fetch error.
    #[must_use]
    pub fn fetch(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelFetch {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingCredential { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfig { .. } => exit_codes::EXIT_CONFIG_ERROR,
            Self::ExportError { .. } => exit_codes::EXIT_EXPORT_ERROR,
            Self::Platform { .. } | Self::ChannelFetch { .. } => exit_codes::EXIT_UNAVAILABLE,
            Self::IoError { .. } => exit_codes::EXIT_IO_ERROR,
            Self::Interrupted => exit_codes::EXIT_INTERRUPTED,
            _ => exit_codes::EXIT_GENERAL_ERROR,
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors are logged at the call site and the process keeps
    /// running; everything else stops startup.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChannelFetch { .. }
                | Self::ExportError { .. }
                | Self::IoError { .. }
                | Self::SerializationError { .. }
        )
    }
}

/// Result type alias for chat-snatch operations.
pub type Result<T> = std::result::Result<T, SnatchError>;

impl From<std::io::Error> for SnatchError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            context: "I/O operation failed".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SnatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            context: "JSON operation failed".to_string(),
            source: err,
        }
    }
}

/// Exit codes for CLI operations.
pub mod exit_codes {
    /// Operation completed successfully.
    pub const EXIT_SUCCESS: i32 = 0;
    /// General/unspecified error.
    pub const EXIT_GENERAL_ERROR: i32 = 1;
    /// Invalid configuration or missing credential.
    pub const EXIT_CONFIG_ERROR: i32 = 5;
    /// Export operation failed.
    pub const EXIT_EXPORT_ERROR: i32 = 6;
    /// Service unavailable (BSD standard).
    pub const EXIT_UNAVAILABLE: i32 = 69;
    /// I/O error (BSD standard).
    pub const EXIT_IO_ERROR: i32 = 74;
    /// Terminated by Ctrl+C (128 + SIGINT).
    pub const EXIT_INTERRUPTED: i32 = 130;
}
