//! Common error types for endloc

use thiserror::Error;

/// Common result type for endloc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across endloc components
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure (timeout, DNS, connection refused)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Authentication against the upstream inventory API failed
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
