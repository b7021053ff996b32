//! Error types for the Leprosorium client

use thiserror::Error;

/// Errors that can occur when talking to the Leprosorium service
///
/// A rejected login is not an error: it is reported as
/// [`LoginResult::Rejected`](crate::LoginResult::Rejected).
#[derive(Error, Debug)]
pub enum LepraError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// An authenticated request was attempted before a successful login
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server answered with a non-success status
    #[error("Upstream returned status {status}")]
    UpstreamStatus {
        /// The status code that was received
        status: reqwest::StatusCode,
    },

    /// Failed to decode response as text
    #[error("Failed to decode response body")]
    Encoding,

    /// Expected markup was not found in an HTML page
    #[error("Failed to parse HTML response: missing {0}")]
    HtmlParse(&'static str),

    /// Failed to parse a JSON response
    #[error("Failed to parse JSON response: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Client initialization failed
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
}
