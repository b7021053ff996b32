//! Error types for the CLI

use thiserror::Error;

/// Main CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] lepra_client::LepraError),

    /// The site refused the credentials
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}
