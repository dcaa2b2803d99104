//! Typed error definitions for PersonaTalk.
//!
//! Errors are grouped by the layer that raises them:
//!
//! - [`TransportError`] - a single HTTP attempt failed (retried by the transport)
//! - [`DecodeError`] - one stream frame could not be decoded (skipped, never raised)
//! - [`ServiceError`] - a model service operation failed
//! - [`RegistryError`] - the service registry could not resolve or build a service
//! - [`HistoryError`] - the history store failed
//!
//! All of them are serializable so they can be embedded in API responses.

mod history;
mod registry;
mod service;
mod transport;

pub use history::HistoryError;
pub use registry::RegistryError;
pub use service::ServiceError;
pub use transport::{DecodeError, TransportError};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_serialization_roundtrip() {
        let err = ServiceError::Transport {
            attempts: 3,
            source: TransportError::Status { status: 503, body: "overloaded".to_string() },
        };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Transport"));
        assert!(json.contains("overloaded"));

        let deserialized: ServiceError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = RegistryError::UnsupportedKind {
            kind: "anthropic".to_string(),
            supported: vec!["openai".to_string(), "qiniu".to_string()],
        };

        let msg = format!("{}", err);
        assert!(msg.contains("anthropic"));
        assert!(msg.contains("openai, qiniu"));
    }
}
