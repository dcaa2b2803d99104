//! Chat handlers: plain and streamed turns, model listing and health.

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use personatalk_core::conversation::ChatReply;
use personatalk_core::{ChatTurn, ConversationEvent};

use super::{ok, ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

pub const STREAM_DONE: &str = "[DONE]";
pub const STREAM_COMPLETE_MESSAGE: &str = "chat complete";

#[derive(Debug, Clone, Deserialize)]
pub struct TextChatBody {
    #[serde(flatten)]
    pub turn: ChatTurn,
    /// Registry name; the default service when absent.
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceQuery {
    pub service: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDelta {
    pub session_id: String,
    pub content: String,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelHealth {
    pub status: String,
    pub model: String,
}

fn check_message(body: &TextChatBody) -> Result<(), ApiError> {
    if body.turn.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    Ok(())
}

pub async fn text_chat(
    State(state): State<AppState>,
    Json(body): Json<TextChatBody>,
) -> ApiResult<ChatReply> {
    check_message(&body)?;
    let service = state.service(body.service.as_deref()).await?;
    let reply = state.conversation().complete(service.as_ref(), &body.turn).await?;
    ok(reply)
}

pub async fn text_chat_stream(
    State(state): State<AppState>,
    Json(body): Json<TextChatBody>,
) -> Result<Response, ApiError> {
    check_message(&body)?;
    let service = state.service(body.service.as_deref()).await?;

    let events = state
        .conversation()
        .complete_stream(service, body.turn)
        .flat_map(|event| stream::iter(sse_payloads(event)))
        .map(|payload| Ok::<_, Infallible>(Event::default().data(payload)));

    Ok(Sse::new(events).into_response())
}

/// `data:` payloads for one conversation event; terminal events are followed
/// by the `[DONE]` sentinel.
pub(crate) fn sse_payloads(event: ConversationEvent) -> Vec<String> {
    match event {
        ConversationEvent::Delta { session_id, content, message_id } => {
            vec![encode(&ApiResponse::success(StreamDelta { session_id, content, message_id }))]
        },
        ConversationEvent::Completed { session_id, message_id } => vec![
            encode(&ApiResponse::with_message(
                STREAM_COMPLETE_MESSAGE,
                StreamDelta { session_id, content: String::new(), message_id },
            )),
            STREAM_DONE.to_string(),
        ],
        ConversationEvent::Failed { error } => {
            tracing::error!("Chat stream failed: {}", error);
            vec![encode(&ApiError::new(502, error).envelope()), STREAM_DONE.to_string()]
        },
    }
}

fn encode<T: Serialize>(envelope: &ApiResponse<T>) -> String {
    serde_json::to_string(envelope)
        .unwrap_or_else(|e| format!(r#"{{"code":500,"message":"{}","data":null}}"#, e))
}

pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> ApiResult<Vec<ModelCard>> {
    let service = state.service(query.service.as_deref()).await?;
    let info = service.get_model_info();
    ok(vec![ModelCard {
        id: info.model,
        object: "model".to_string(),
        created: 0,
        owned_by: "personatalk".to_string(),
    }])
}

pub async fn model_health(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> ApiResult<ModelHealth> {
    let service = state.service(query.service.as_deref()).await?;
    let healthy = service.health_check().await;
    ok(ModelHealth {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        model: service.get_model_info().model,
    })
}
