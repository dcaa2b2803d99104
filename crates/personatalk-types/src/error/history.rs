//! History store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum HistoryError {
    #[error("history session not found: {id}")]
    SessionNotFound { id: String },

    #[error("history database error: {message}")]
    Database { message: String },

    #[error("invalid history query: {message}")]
    InvalidQuery { message: String },
}

impl HistoryError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound { .. } => 404,
            Self::InvalidQuery { .. } => 400,
            Self::Database { .. } => 500,
        }
    }
}
