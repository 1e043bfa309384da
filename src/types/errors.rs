//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The store
//! "no mutation" outcome is deliberately NOT an error; see `store`.

use std::sync::PoisonError;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the access-control server.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed key, request body or scanned code.
    #[error("validation error: {0}")]
    Validation(String),

    /// A store lock could not be acquired (a previous holder panicked).
    #[error("lock failure: {0}")]
    Lock(String),

    /// Peripheral rejected or truncated a command.
    #[error("device error: {0}")]
    Device(String),

    /// Configuration file could not be interpreted.
    #[error("config error: {0}")]
    Config(String),

    /// Operation interrupted by shutdown.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Connection read/write exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the device loop should back off and retry after this error.
    ///
    /// Only I/O failures are transient; a bad scan is discarded immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Device(_) | Error::Timeout(_))
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn lock(msg: impl Into<String>) -> Self {
        Self::Lock(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
