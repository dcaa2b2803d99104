//! Completion responses and stream chunks.
//!
//! Providers that claim OpenAI compatibility differ in which fields they
//! actually send, so both types are built from raw JSON with defaults rather
//! than strict deserialization: a missing `id` gets a fresh UUID, a missing
//! `created` gets the current time, a missing `model` gets the service model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One completion alternative. `message` is kept as the provider sent it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: Map<String, Value>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// Text content of the message, if any.
    pub fn content(&self) -> Option<&str> {
        self.message.get("content").and_then(Value::as_str)
    }
}

/// Non-streaming chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Map<String, Value>>,
}

impl ChatResponse {
    pub const OBJECT: &'static str = "chat.completion";

    /// Map a provider's raw JSON body, filling in missing envelope fields.
    pub fn from_provider(raw: &Value, fallback_model: &str) -> Self {
        let choices = raw
            .get("choices")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .enumerate()
                    .map(|(position, choice)| Choice {
                        index: index_or(choice, position),
                        message: choice
                            .get("message")
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default(),
                        finish_reason: finish_reason(choice),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: id_or_generated(raw),
            object: Self::OBJECT.to_string(),
            created: created_or_now(raw),
            model: model_or(raw, fallback_model),
            choices,
            usage: raw.get("usage").and_then(Value::as_object).cloned(),
        }
    }

    /// Content of the first choice; the usual answer text.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().and_then(Choice::content)
    }
}

/// One alternative inside a stream chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    pub index: u32,
    /// Partial message; often only `{"content": "..."}`.
    pub delta: Map<String, Value>,
    pub finish_reason: Option<String>,
}

impl StreamChoice {
    pub fn content(&self) -> Option<&str> {
        self.delta.get("content").and_then(Value::as_str)
    }
}

/// One decoded `data:` frame of a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    pub const OBJECT: &'static str = "chat.completion.chunk";

    /// Map a decoded frame, preserving `index`, the raw `delta` and `finish_reason`.
    pub fn from_provider(raw: &Value, fallback_model: &str) -> Self {
        let choices = raw
            .get("choices")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .map(|choice| StreamChoice {
                        index: index_or(choice, 0),
                        delta: choice
                            .get("delta")
                            .and_then(Value::as_object)
                            .cloned()
                            .unwrap_or_default(),
                        finish_reason: finish_reason(choice),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: id_or_generated(raw),
            object: Self::OBJECT.to_string(),
            created: created_or_now(raw),
            model: model_or(raw, fallback_model),
            choices,
        }
    }

    /// Content fragment of the first choice.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().and_then(StreamChoice::content)
    }

    /// First non-null finish reason across choices.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.iter().find_map(|c| c.finish_reason.as_deref())
    }
}

fn id_or_generated(raw: &Value) -> String {
    raw.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn created_or_now(raw: &Value) -> i64 {
    raw.get("created").and_then(Value::as_i64).unwrap_or_else(|| Utc::now().timestamp())
}

fn model_or(raw: &Value, fallback: &str) -> String {
    raw.get("model").and_then(Value::as_str).unwrap_or(fallback).to_string()
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions, reason = "choice indices are small")]
fn index_or(choice: &Value, fallback: usize) -> u32 {
    choice
        .get("index")
        .and_then(Value::as_u64)
        .map_or(fallback as u32, |i| i as u32)
}

fn finish_reason(choice: &Value) -> Option<String> {
    choice.get("finish_reason").and_then(Value::as_str).map(str::to_string)
}
