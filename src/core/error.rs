//! Error types for the chunker

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Hierarchy error: {0}")]
    Hierarchy(String),

    #[error("Feature error: {0}")]
    Feature(String),
}
