//! Session-aware chat on top of a model service and a history store.
//!
//! One turn: find or create the session, replay its stored messages after
//! the optional system prompt, store the user message, call the model, then
//! store the assistant reply.


use futures::{Stream, StreamExt};
use personatalk_types::{
    ChatMessage, ChatRequest, ChatRole, HistorySession, NewSession, ServiceError,
};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AppResult;
use crate::model_service::ModelService;
use crate::modules::history::{truncate_chars, HistoryStore, MAX_SESSION_NAME_CHARS};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const NEW_SESSION_NAME: &str = "New conversation...";
pub const CHAT_TEMPERATURE: f64 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 4096;

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// One user turn. An unknown or missing `session_id` starts a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    /// Empty means no system message.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl ChatTurn {
    pub fn new(message: impl Into<String>) -> Self {
        Self { session_id: None, message: message.into(), system_prompt: default_system_prompt() }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
}

/// Items of a streamed turn. A stream ends with exactly one `Completed` or
/// `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversationEvent {
    Delta { session_id: String, content: String, message_id: String },
    Completed { session_id: String, message_id: String },
    Failed { error: String },
}

pub type ConversationStream = Pin<Box<dyn Stream<Item = ConversationEvent> + Send>>;

/// A turn with its session resolved and the user message already stored.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub session_id: String,
    pub request: ChatRequest,
}

#[derive(Clone)]
pub struct ConversationService {
    history: Arc<dyn HistoryStore>,
}

impl ConversationService {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Live session `session_id`, or a new one named after `message`.
    pub async fn resolve_session(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> AppResult<HistorySession> {
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            if let Some(session) = self.history.get_session(id).await? {
                return Ok(session);
            }
            tracing::debug!("Session {} not found, starting a new one", id);
        }

        let name = if message.is_empty() {
            NEW_SESSION_NAME.to_string()
        } else {
            truncate_chars(message, MAX_SESSION_NAME_CHARS)
        };
        Ok(self.history.create_session(NewSession::new(name)).await?)
    }

    /// System prompt, then stored history, then the new user message.
    pub async fn build_messages(
        &self,
        session_id: &str,
        system_prompt: &str,
        message: &str,
    ) -> AppResult<Vec<ChatMessage>> {
        let stored = self.history.get_messages(session_id, None).await?;
        let mut messages = Vec::with_capacity(stored.len() + 2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        messages.extend(stored.into_iter().map(|m| ChatMessage::new(m.role, m.content)));
        messages.push(ChatMessage::user(message));
        Ok(messages)
    }

    pub async fn prepare(&self, turn: &ChatTurn, stream: bool) -> AppResult<PreparedTurn> {
        let session = self.resolve_session(turn.session_id.as_deref(), &turn.message).await?;
        let messages = self.build_messages(&session.id, &turn.system_prompt, &turn.message).await?;
        self.history.append_message(&session.id, ChatRole::User, &turn.message).await?;

        let request = ChatRequest::new(messages)
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_tokens(CHAT_MAX_TOKENS)
            .streaming(stream);
        Ok(PreparedTurn { session_id: session.id, request })
    }

    pub async fn complete(&self, service: &dyn ModelService, turn: &ChatTurn) -> AppResult<ChatReply> {
        let prepared = self.prepare(turn, false).await?;
        let response = service.chat_completion(&prepared.request).await?;

        let Some(choice) = response.choices.first() else {
            return Err(ServiceError::InvalidResponse {
                message: "provider returned no choices".to_string(),
            }
            .into());
        };
        let content = choice.content().unwrap_or_default().to_string();

        self.history.append_message(&prepared.session_id, ChatRole::Assistant, &content).await?;
        tracing::info!(
            "Chat turn completed | session: {} | reply: {} chars",
            prepared.session_id,
            content.chars().count()
        );
        Ok(ChatReply { session_id: prepared.session_id, response: content })
    }

    /// Streamed turn. The assistant text is stored once: at the first chunk
    /// carrying a `finish_reason`, or when the stream ends with text but no
    /// finish reason. Dropping the returned stream abandons the upstream call.
    pub fn complete_stream(&self, service: Arc<dyn ModelService>, turn: ChatTurn) -> ConversationStream {
        let this = self.clone();

        let stream = async_stream::stream! {
            let prepared = match this.prepare(&turn, true).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    yield ConversationEvent::Failed { error: e.to_string() };
                    return;
                },
            };
            let session_id = prepared.session_id;

            let mut chunks = match service.chat_completion_stream(&prepared.request).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    yield ConversationEvent::Failed { error: e.to_string() };
                    return;
                },
            };

            let mut assembled = String::new();
            let mut message_id: Option<String> = None;
            let mut finished = false;

            while let Some(item) = chunks.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield ConversationEvent::Failed { error: e.to_string() };
                        return;
                    },
                };
                let Some(choice) = chunk.choices.first() else { continue };

                if message_id.is_none() {
                    message_id = Some(chunk.id.clone());
                }
                if !choice.delta.is_empty() {
                    let content = choice.content().unwrap_or_default().to_string();
                    assembled.push_str(&content);
                    yield ConversationEvent::Delta {
                        session_id: session_id.clone(),
                        content,
                        message_id: chunk.id.clone(),
                    };
                }
                if choice.finish_reason.is_some() {
                    finished = true;
                    break;
                }
            }
            drop(chunks);

            if finished || !assembled.is_empty() {
                if let Err(e) = this
                    .history
                    .append_message(&session_id, ChatRole::Assistant, &assembled)
                    .await
                {
                    yield ConversationEvent::Failed { error: e.to_string() };
                    return;
                }
            }

            tracing::info!(
                "Streamed chat turn completed | session: {} | reply: {} chars",
                session_id,
                assembled.chars().count()
            );
            yield ConversationEvent::Completed {
                session_id,
                message_id: message_id.unwrap_or_default(),
            };
        };

        Box::pin(stream)
    }
}
