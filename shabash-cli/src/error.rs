//! Error types for the shabash command-line tools

use shabash_core::{ConfigLoadError, LocateError};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the command-line tools
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("Estimation failed: {0}")]
    Locate(#[from] LocateError),

    #[error("Bad row {row} in {file}: {reason}")]
    BadRow {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("Profile needs at least {required} graphs, found {found}")]
    MissingGraphs { required: usize, found: usize },

    #[error("Telemetry connection: {0}")]
    Connection(String),

    #[error("Signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
