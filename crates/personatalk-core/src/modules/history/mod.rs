//! Conversation history storage abstraction.

mod sqlite;


use async_trait::async_trait;
use personatalk_types::{ChatRole, HistoryError, HistoryMessage, HistorySession, NewSession};

pub use sqlite::SqliteHistoryStore;

pub const MAX_USERNAME_CHARS: usize = 100;
pub const MAX_SESSION_NAME_CHARS: usize = 200;
/// Stored message content is cut to this many bytes.
pub const MAX_CONTENT_BYTES: usize = 65_535;
pub const MAX_PAGE_SIZE: u32 = 1000;

pub type HistoryResult<T> = Result<T, HistoryError>;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> HistoryResult<HistorySession>;

    /// Live (not deleted) session by id.
    async fn get_session(&self, id: &str) -> HistoryResult<Option<HistorySession>>;

    /// Live sessions, newest first. `page` is 0-based.
    async fn list_sessions(
        &self,
        username: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> HistoryResult<Vec<HistorySession>>;

    /// Live sessions whose name contains `keyword`, newest first.
    async fn search_sessions(
        &self,
        keyword: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> HistoryResult<Vec<HistorySession>>;

    async fn rename_session(&self, id: &str, session_name: &str) -> HistoryResult<bool>;

    /// Flag a session deleted. `false` when no live session has this id.
    async fn soft_delete_session(&self, id: &str) -> HistoryResult<bool>;

    async fn count_sessions(&self, username: Option<&str>) -> HistoryResult<u64>;

    async fn append_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> HistoryResult<HistoryMessage>;

    /// Messages oldest first, optionally only the first `limit`.
    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> HistoryResult<Vec<HistoryMessage>>;

    async fn count_messages(&self, session_id: &str) -> HistoryResult<u64>;

    async fn delete_messages(&self, session_id: &str) -> HistoryResult<u64>;

    async fn ping(&self) -> bool;
}

/// Cut `text` to at most `max` chars.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Cut `text` to at most `max` bytes without splitting a character.
pub fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub(crate) fn check_page(page_size: u32) -> HistoryResult<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(HistoryError::InvalidQuery {
            message: format!("page_size must be between 1 and {}", MAX_PAGE_SIZE),
        });
    }
    Ok(())
}
