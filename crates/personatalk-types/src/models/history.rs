//! Conversation history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::ChatRole;

/// A conversation. Deleting only flags it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistorySession {
    pub id: String,
    pub username: String,
    pub session_name: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stored turn of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: String,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSession {
    #[serde(default = "default_username")]
    pub username: String,
    pub session_name: String,
}

fn default_username() -> String {
    "admin".to_string()
}

impl NewSession {
    pub fn new(session_name: impl Into<String>) -> Self {
        Self { username: default_username(), session_name: session_name.into() }
    }
}
