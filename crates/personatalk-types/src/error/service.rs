//! Model service errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TransportError;

/// Errors surfaced by model service operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ServiceError {
    /// All transport attempts failed; carries the last failure.
    #[error("upstream request failed after {attempts} attempt(s): {source}")]
    Transport { attempts: u32, source: TransportError },

    /// The stream broke after it was opened.
    #[error("stream interrupted: {message}")]
    Stream { message: String },

    /// The service variant does not offer this operation (e.g. chat on a TTS backend).
    #[error("{service} does not support {operation}")]
    NotImplemented { service: String, operation: String },

    /// The chat request failed validation before anything was sent.
    #[error("invalid chat request: {message}")]
    InvalidRequest { message: String },

    /// The provider answered successfully but with an unusable payload.
    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },
}

impl ServiceError {
    /// Whether the provider was involved in the failure (as opposed to local validation).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Stream { .. } | Self::InvalidResponse { .. }
        )
    }

    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Transport { .. } | Self::Stream { .. } | Self::InvalidResponse { .. } => 502,
            Self::NotImplemented { .. } => 501,
            Self::InvalidRequest { .. } => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            ServiceError::InvalidRequest { message: "empty".to_string() }.http_status_code(),
            400
        );
        assert_eq!(
            ServiceError::NotImplemented {
                service: "tts".to_string(),
                operation: "chat_completion".to_string()
            }
            .http_status_code(),
            501
        );
        assert_eq!(
            ServiceError::Transport {
                attempts: 1,
                source: TransportError::Timeout { timeout_secs: 5 }
            }
            .http_status_code(),
            502
        );
    }

    #[test]
    fn test_transport_display_names_no_operation() {
        let err = ServiceError::Transport {
            attempts: 2,
            source: TransportError::Status { status: 503, body: "busy".to_string() },
        };
        assert_eq!(err.to_string(), "upstream request failed after 2 attempt(s): HTTP 503: busy");
    }

    #[test]
    fn test_is_upstream() {
        assert!(ServiceError::Stream { message: "reset".to_string() }.is_upstream());
        assert!(!ServiceError::InvalidRequest { message: "x".to_string() }.is_upstream());
    }
}
