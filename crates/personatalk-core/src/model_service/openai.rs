//! OpenAI-compatible chat backend (`openai`, `deepseek`, `qiniu`).

use async_trait::async_trait;
use personatalk_types::{
    ChatCompletionPayload, ChatMessage, ChatRequest, ChatResponse, ModelInfo, ServiceConfig,
    ServiceError,
};
use reqwest::header::HeaderMap;

use super::common::sse_parser::{decode_chunk_stream, DecodeStats};
use super::upstream::{build_headers, chat_completions_url, UpstreamClient};
use super::{validate_request, ChunkStream, ModelService};

pub struct OpenAiCompatibleService {
    kind: String,
    config: ServiceConfig,
    upstream: UpstreamClient,
    headers: HeaderMap,
    endpoint: String,
    stats: DecodeStats,
}

impl OpenAiCompatibleService {
    pub fn new(kind: impl Into<String>, config: ServiceConfig) -> Result<Self, String> {
        let upstream = UpstreamClient::new(&config)?;
        let headers = build_headers(&config.api_key)?;
        let endpoint = chat_completions_url(&config.base_url);
        Ok(Self { kind: kind.into(), config, upstream, headers, endpoint, stats: DecodeStats::default() })
    }

    /// Frame counters across every stream this service has opened.
    pub fn decode_stats(&self) -> &DecodeStats {
        &self.stats
    }
}

#[async_trait]
impl ModelService for OpenAiCompatibleService {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        validate_request(request)?;
        let payload = ChatCompletionPayload::from_request(request, &self.config.model, false);
        tracing::debug!(
            "[{}] chat_completion | model: {} | messages: {}",
            self.kind,
            payload.model,
            request.messages.len()
        );

        let raw = self.upstream.post_json(&self.endpoint, &self.headers, &payload).await?;
        Ok(ChatResponse::from_provider(&raw, &self.config.model))
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<ChunkStream, ServiceError> {
        validate_request(request)?;
        let payload = ChatCompletionPayload::from_request(request, &self.config.model, true);
        tracing::debug!("[{}] chat_completion_stream | model: {}", self.kind, payload.model);

        let response = self.upstream.open_stream(&self.endpoint, &self.headers, &payload).await?;
        Ok(decode_chunk_stream(
            response.bytes_stream(),
            self.config.model.clone(),
            Some(self.upstream.timeout()),
            self.stats.clone(),
        ))
    }

    async fn health_check(&self) -> bool {
        let probe = ChatRequest::new(vec![ChatMessage::user("Hello")]).with_max_tokens(1);
        match self.chat_completion(&probe).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("[{}] health check failed: {}", self.kind, e);
                false
            },
        }
    }

    fn get_model_info(&self) -> ModelInfo {
        ModelInfo::from_config(&self.kind, &self.config)
    }
}
