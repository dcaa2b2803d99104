//! SQLite-backed history store.
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::as_conversions,
    reason = "page arithmetic and row counts fit comfortably in i64"
)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use personatalk_types::{ChatRole, HistoryError, HistoryMessage, HistorySession, NewSession};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{
    check_page, truncate_bytes, truncate_chars, HistoryResult, HistoryStore, MAX_CONTENT_BYTES,
    MAX_SESSION_NAME_CHARS, MAX_USERNAME_CHARS,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS history_session (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    session_name TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_session_username ON history_session (username);
CREATE INDEX IF NOT EXISTS idx_history_session_created ON history_session (created_at DESC);
CREATE TABLE IF NOT EXISTS history_chat (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_chat_session ON history_chat (session_id, created_at);
";

const SESSION_COLUMNS: &str = "id, username, session_name, is_deleted, created_at, updated_at";
const CHAT_COLUMNS: &str = "id, session_id, role, content, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn open(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(db_error)?;
        tracing::info!("History database opened at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> HistoryResult<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(db_error)?)
    }

    fn from_connection(conn: Connection) -> HistoryResult<Self> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_error)?;
        conn.execute_batch(SCHEMA).map_err(db_error)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run a statement on the blocking pool.
    async fn run<T, F>(&self, f: F) -> HistoryResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| HistoryError::Database { message: format!("history task failed: {}", e) })?
        .map_err(db_error)
    }
}

fn db_error(err: rusqlite::Error) -> HistoryError {
    tracing::error!("History database error: {}", err);
    HistoryError::Database { message: err.to_string() }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Current time at the precision the tables store.
fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<HistorySession> {
    Ok(HistorySession {
        id: row.get(0)?,
        username: row.get(1)?,
        session_name: row.get(2)?,
        is_deleted: row.get::<_, i64>(3)? != 0,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryMessage> {
    let role: String = row.get(2)?;
    let role = role
        .parse::<ChatRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    Ok(HistoryMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn create_session(&self, new: NewSession) -> HistoryResult<HistorySession> {
        let now = now_millis();
        let session = HistorySession {
            id: Uuid::new_v4().to_string(),
            username: truncate_chars(&new.username, MAX_USERNAME_CHARS),
            session_name: truncate_chars(&new.session_name, MAX_SESSION_NAME_CHARS),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let row = session.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO history_session (id, username, session_name, is_deleted, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![row.id, row.username, row.session_name, now.timestamp_millis()],
            )
        })
        .await?;

        tracing::debug!("History session {} created for {}", session.id, session.username);
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> HistoryResult<Option<HistorySession>> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM history_session WHERE id = ?1 AND is_deleted = 0", SESSION_COLUMNS),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
    }

    async fn list_sessions(
        &self,
        username: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> HistoryResult<Vec<HistorySession>> {
        check_page(page_size)?;
        let username = non_empty(username);
        let offset = i64::from(page) * i64::from(page_size);
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM history_session
                 WHERE is_deleted = 0 AND (?1 IS NULL OR username = ?1)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                SESSION_COLUMNS
            ))?;
            let rows = stmt.query_map(params![username, page_size, offset], session_from_row)?;
            rows.collect()
        })
        .await
    }

    async fn search_sessions(
        &self,
        keyword: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> HistoryResult<Vec<HistorySession>> {
        check_page(page_size)?;
        let keyword = non_empty(keyword);
        let offset = i64::from(page) * i64::from(page_size);
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM history_session
                 WHERE is_deleted = 0 AND (?1 IS NULL OR instr(session_name, ?1) > 0)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                SESSION_COLUMNS
            ))?;
            let rows = stmt.query_map(params![keyword, page_size, offset], session_from_row)?;
            rows.collect()
        })
        .await
    }

    async fn rename_session(&self, id: &str, session_name: &str) -> HistoryResult<bool> {
        let id = id.to_string();
        let session_name = truncate_chars(session_name, MAX_SESSION_NAME_CHARS);
        let changed = self
            .run(move |conn| {
                conn.execute(
                    "UPDATE history_session SET session_name = ?2, updated_at = ?3
                     WHERE id = ?1 AND is_deleted = 0",
                    params![id, session_name, Utc::now().timestamp_millis()],
                )
            })
            .await?;
        Ok(changed > 0)
    }

    async fn soft_delete_session(&self, id: &str) -> HistoryResult<bool> {
        let id = id.to_string();
        let changed = self
            .run(move |conn| {
                conn.execute(
                    "UPDATE history_session SET is_deleted = 1, updated_at = ?2
                     WHERE id = ?1 AND is_deleted = 0",
                    params![id, Utc::now().timestamp_millis()],
                )
            })
            .await?;
        Ok(changed > 0)
    }

    async fn count_sessions(&self, username: Option<&str>) -> HistoryResult<u64> {
        let username = non_empty(username);
        let count: i64 = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM history_session
                     WHERE is_deleted = 0 AND (?1 IS NULL OR username = ?1)",
                    params![username],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count as u64)
    }

    async fn append_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> HistoryResult<HistoryMessage> {
        let now = now_millis();
        let stored = truncate_bytes(content, MAX_CONTENT_BYTES);
        if stored.len() < content.len() {
            tracing::warn!(
                "Message for session {} truncated from {} to {} bytes",
                session_id,
                content.len(),
                stored.len()
            );
        }
        let message = HistoryMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: stored.to_string(),
            created_at: now,
            updated_at: now,
        };

        let row = message.clone();
        self.run(move |conn| {
            let millis = now.timestamp_millis();
            conn.execute(
                "INSERT INTO history_chat (id, session_id, role, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![row.id, row.session_id, row.role.as_str(), row.content, millis],
            )?;
            conn.execute(
                "UPDATE history_session SET updated_at = ?2 WHERE id = ?1",
                params![row.session_id, millis],
            )
        })
        .await?;

        Ok(message)
    }

    async fn get_messages(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> HistoryResult<Vec<HistoryMessage>> {
        let session_id = session_id.to_string();
        // SQLite reads a negative LIMIT as unbounded
        let limit = limit.map_or(-1, i64::from);
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM history_chat WHERE session_id = ?1
                 ORDER BY created_at ASC, rowid ASC LIMIT ?2",
                CHAT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![session_id, limit], message_from_row)?;
            rows.collect()
        })
        .await
    }

    async fn count_messages(&self, session_id: &str) -> HistoryResult<u64> {
        let session_id = session_id.to_string();
        let count: i64 = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM history_chat WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count as u64)
    }

    async fn delete_messages(&self, session_id: &str) -> HistoryResult<u64> {
        let session_id = session_id.to_string();
        let deleted = self
            .run(move |conn| {
                conn.execute("DELETE FROM history_chat WHERE session_id = ?1", params![session_id])
            })
            .await?;
        Ok(deleted as u64)
    }

    async fn ping(&self) -> bool {
        self.run(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .is_ok()
    }
}
