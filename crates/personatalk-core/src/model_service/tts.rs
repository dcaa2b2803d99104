//! Text-to-speech backend (`tts`). Chat operations are not available.

use async_trait::async_trait;
use personatalk_types::protocol::{TtsRequest, TtsResponse, VoiceInfo};
use personatalk_types::{ChatRequest, ChatResponse, ModelInfo, ServiceConfig, ServiceError};
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::upstream::{build_headers, UpstreamClient};
use super::{ChunkStream, ModelService};

pub struct TtsService {
    kind: String,
    config: ServiceConfig,
    upstream: UpstreamClient,
    headers: HeaderMap,
}

impl TtsService {
    pub fn new(kind: impl Into<String>, config: ServiceConfig) -> Result<Self, String> {
        let upstream = UpstreamClient::new(&config)?;
        let headers = build_headers(&config.api_key)?;
        Ok(Self { kind: kind.into(), config, upstream, headers })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.config.trimmed_base_url(), route)
    }

    /// Available voices. A reply that is not a list reads as no voices.
    pub async fn voice_list(&self) -> Result<Vec<VoiceInfo>, ServiceError> {
        let raw = self.upstream.get_json(&self.url("voice/list"), &self.headers).await?;
        let Value::Array(items) = raw else {
            tracing::warn!("[{}] voice list reply is not an array", self.kind);
            return Ok(Vec::new());
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<VoiceInfo>(item) {
                Ok(voice) => Some(voice),
                Err(e) => {
                    tracing::warn!("[{}] skipping malformed voice entry: {}", self.kind, e);
                    None
                },
            })
            .collect())
    }

    pub async fn text_to_speech(&self, request: &TtsRequest) -> Result<TtsResponse, ServiceError> {
        if request.request.text.trim().is_empty() {
            return Err(ServiceError::InvalidRequest { message: "text must not be empty".to_string() });
        }
        tracing::debug!(
            "[{}] text_to_speech | voice: {} | chars: {}",
            self.kind,
            request.audio.voice_type,
            request.request.text.chars().count()
        );

        let raw = self.upstream.post_json(&self.url("voice/tts"), &self.headers, request).await?;
        serde_json::from_value(raw).map_err(|e| ServiceError::InvalidResponse { message: e.to_string() })
    }

    fn not_implemented(&self, operation: &str) -> ServiceError {
        ServiceError::NotImplemented { service: self.kind.clone(), operation: operation.to_string() }
    }
}

#[async_trait]
impl ModelService for TtsService {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn chat_completion(&self, _request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        Err(self.not_implemented("chat_completion"))
    }

    async fn chat_completion_stream(
        &self,
        _request: &ChatRequest,
    ) -> Result<ChunkStream, ServiceError> {
        Err(self.not_implemented("chat_completion_stream"))
    }

    async fn health_check(&self) -> bool {
        match self.voice_list().await {
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

    fn as_tts(&self) -> Option<&TtsService> {
        Some(self)
    }
}
