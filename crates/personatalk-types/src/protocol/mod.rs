//! Wire protocol types.
//!
//! - [`chat`] - chat requests and the outbound OpenAI-compatible payload
//! - [`response`] - completion responses and stream chunks
//! - [`tts`] - text-to-speech request/response types

pub mod chat;
pub mod response;
pub mod tts;

pub use chat::{ChatCompletionPayload, ChatMessage, ChatRequest, ChatRole};
pub use response::{ChatResponse, Choice, StreamChoice, StreamChunk};
pub use tts::{AudioConfig, TtsRequest, TtsResponse, TtsText, VoiceInfo};
