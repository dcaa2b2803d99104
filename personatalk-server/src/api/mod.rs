//! API Routes
//!
//! JSON endpoints under `/api/v1`. Every body is wrapped in the
//! `{code, message, data}` envelope.

pub(crate) mod chat;
pub(crate) mod history_session;
pub(crate) mod services;
pub(crate) mod tts;

#[cfg(test)]
mod chat_tests;
#[cfg(test)]
mod tts_tests;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;

use personatalk_core::AppError;
use personatalk_types::{HistoryError, RegistryError, ServiceError};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Chat
        .route("/text_chat", post(chat::text_chat))
        .route("/text_chat_stream", post(chat::text_chat_stream))
        .route("/models", get(chat::list_models))
        .route("/health", get(chat::model_health))
        // Model service registry
        .route("/services", get(services::list_services).post(services::add_service))
        .route("/services/:name", delete(services::remove_service))
        .route("/services/:name/default", post(services::set_default_service))
        // Speech
        .route("/voices", get(tts::list_voices))
        .route("/tts", post(tts::text_to_speech))
        // History
        .route("/history_session/", post(history_session::create_session))
        .route("/history_session/history_session", get(history_session::list_sessions))
        .route("/history_session/search", get(history_session::search_sessions))
        .route("/history_session/:id", delete(history_session::delete_session))
        .route("/history_session/:id/messages", get(history_session::list_messages))
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    ApiError::new(404, "Not found")
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message("success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { code: 200, message: message.into(), data: Some(data) }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// An error envelope; `code` doubles as the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn envelope(&self) -> ApiResponse<()> {
        ApiResponse { code: self.code, message: self.message.clone(), data: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope())).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self::new(error.http_status_code(), error.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self::new(error.http_status_code(), error.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(error: RegistryError) -> Self {
        Self::new(error.http_status_code(), error.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(error: HistoryError) -> Self {
        Self::new(error.http_status_code(), error.to_string())
    }
}
