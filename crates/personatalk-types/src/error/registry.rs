//! Service registry errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum RegistryError {
    /// No constructor is registered for this backend kind.
    #[error("unsupported service kind '{kind}' (supported: {})", supported.join(", "))]
    UnsupportedKind { kind: String, supported: Vec<String> },

    /// Named service (or the default, when `name` is `None`) does not exist.
    #[error("model service not found: {}", name.as_deref().unwrap_or("<default>"))]
    NotFound { name: Option<String> },

    /// Registration failed validation.
    #[error("invalid service registration: {message}")]
    InvalidRegistration { message: String },
}

impl RegistryError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::UnsupportedKind { .. } | Self::InvalidRegistration { .. } => 400,
        }
    }
}
