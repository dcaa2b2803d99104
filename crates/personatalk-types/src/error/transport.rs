//! Transport and stream decoding errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single HTTP attempt against a provider.
///
/// Every variant is retryable; the transport decides when to give up.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum TransportError {
    /// Provider answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The attempt did not complete within the configured timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Connection could not be established or broke mid-request.
    #[error("connection failed to {url}: {message}")]
    Connection { url: String, message: String },

    /// 2xx response whose body is not the expected JSON.
    #[error("invalid response body: {message}")]
    InvalidBody { message: String },
}

impl TransportError {
    /// HTTP status carried by this failure, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A stream frame that could not be turned into a chunk.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(String),

    #[error("frame is not valid JSON: {0}")]
    Json(String),
}
