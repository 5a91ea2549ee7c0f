//! Error types for the command-line front end.

use elevd_dem::ScanError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a command with a failure exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`Config`](crate::Config).
    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// The data folder could not be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Reading a request or writing a response failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch request body is not valid JSON.
    #[error("invalid JSON request: {0}")]
    Json(#[from] serde_json::Error),
}
