//! Unified error type for PersonaTalk core operations.

use personatalk_types::{HistoryError, RegistryError, ServiceError};
use serde::Serialize;
use thiserror::Error;

/// Main error type returned by the conversation layer and the server.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// A model service call failed (transport, stream, unsupported operation).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Service lookup or construction failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// History store operation failed.
    #[error(transparent)]
    History(#[from] HistoryError),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status the API layer reports for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Service(e) => e.http_status_code(),
            Self::Registry(e) => e.http_status_code(),
            Self::History(e) => e.http_status_code(),
            Self::Config(_) => 400,
            Self::Io(_) => 500,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for PersonaTalk operations.
pub type AppResult<T> = Result<T, AppError>;
