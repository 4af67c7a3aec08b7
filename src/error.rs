//! Error types for the segment server

use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServeError>;

/// Error types that can occur while fetching and serving segments
///
/// The enum is `Clone` because a single fetch result is fanned out to every
/// waiter of a coalesced fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Read throughput below minimum, aborting attempt")]
    TooSlow,

    #[error("Request cancelled by caller")]
    Cancelled,

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ServeError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ServeError::NotFound
        } else {
            ServeError::Io(err.to_string())
        }
    }
}

impl ServeError {
    /// Convert error to HTTP status code
    ///
    /// `TooSlow` never escapes the fetch orchestrator and `Cancelled` means
    /// the client is gone; both map to 500 here only as a backstop.
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServeError::NotFound => 404,
            ServeError::InvalidRange(_) => 416,
            ServeError::Config(_) => 500,
            ServeError::Io(_) => 500,
            ServeError::TooSlow => 500,
            ServeError::Cancelled => 500,
            ServeError::Internal(_) => 500,
        }
    }
}
