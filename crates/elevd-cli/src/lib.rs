//! # elevd-cli
//!
//! Library half of the `elevd` binary: YAML configuration and the
//! `scan`, `lookup` and `batch` commands. Responses are JSON on stdout;
//! logs go to stderr.

pub mod commands;
mod config;
mod error;

pub use commands::{BatchRequest, LookupResponse, ScanSummary, TileSummary};
pub use config::Config;
pub use error::CliError;

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
