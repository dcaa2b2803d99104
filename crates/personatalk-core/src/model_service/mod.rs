//! Model services: one trait, several backends.
//!
//! Every backend is held as `Arc<dyn ModelService>`; its configuration is
//! fixed at construction, so instances are shared across tasks freely.

pub mod common;
mod openai;
mod tts;
pub mod upstream;

use async_trait::async_trait;
use futures::Stream;
use personatalk_types::{ChatRequest, ChatResponse, ModelInfo, ServiceError, StreamChunk};
use std::pin::Pin;

pub use openai::OpenAiCompatibleService;
pub use tts::TtsService;

/// Lazily decoded stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ServiceError>> + Send>>;

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Backend kind tag this instance was built for.
    fn kind(&self) -> &str;

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError>;

    async fn chat_completion_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<ChunkStream, ServiceError>;

    /// Liveness probe. Never fails, only reports.
    async fn health_check(&self) -> bool;

    fn get_model_info(&self) -> ModelInfo;

    /// Speech capability, for backends that have it.
    fn as_tts(&self) -> Option<&TtsService> {
        None
    }
}

pub(crate) fn validate_request(request: &ChatRequest) -> Result<(), ServiceError> {
    use validator::Validate;
    request.validate().map_err(|e| ServiceError::InvalidRequest { message: e.to_string() })
}
