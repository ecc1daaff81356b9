//! Error types for the backend client and its config.

use std::time::Duration;
use thiserror::Error;

/// A failed call to the backend. `Display` is the user-facing message.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Non-2xx response. `message` is the server's `detail` when it sent one.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error(
        "Request timed out after {0:?}. The backend may be suspended or waking from a cold start; please try again in a moment."
    )]
    Timeout(Duration),

    /// The request could not be completed (DNS, connection refused, reset).
    #[error("{0}")]
    Network(String),

    /// 2xx response whose body is not the expected JSON.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl QueryError {
    /// Status code for HTTP errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout(_))
    }
}

/// Client construction failure.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    #[error("Keep-alive requires a Tokio runtime")]
    NoRuntime,

    #[error("Keep-alive interval must be greater than zero")]
    ZeroKeepAliveInterval,
}

/// Config load/save error.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
