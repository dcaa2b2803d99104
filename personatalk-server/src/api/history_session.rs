//! History session handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use personatalk_types::{HistoryError, HistoryMessage, HistorySession, NewSession};

use super::{ok, ApiResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;

fn default_username() -> Option<String> {
    Some("admin".to_string())
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_username")]
    pub username: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u32>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(new): Json<NewSession>,
) -> ApiResult<HistorySession> {
    ok(state.history().create_session(new).await?)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<HistorySession>> {
    let sessions = state
        .history()
        .list_sessions(query.username.as_deref(), query.page, query.page_size)
        .await?;
    ok(sessions)
}

pub async fn search_sessions(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<HistorySession>> {
    let sessions = state
        .history()
        .search_sessions(query.keyword.as_deref(), query.page, query.page_size)
        .await?;
    ok(sessions)
}

/// Soft delete; returns the session as it is after deletion.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HistorySession> {
    let history = state.history();
    let Some(mut session) = history.get_session(&id).await? else {
        return Err(HistoryError::SessionNotFound { id }.into());
    };
    if !history.soft_delete_session(&id).await? {
        return Err(HistoryError::SessionNotFound { id }.into());
    }
    session.is_deleted = true;
    ok(session)
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Vec<HistoryMessage>> {
    let history = state.history();
    if history.get_session(&id).await?.is_none() {
        return Err(HistoryError::SessionNotFound { id }.into());
    }
    ok(history.get_messages(&id, query.limit).await?)
}
