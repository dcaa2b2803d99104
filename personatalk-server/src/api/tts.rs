//! Speech passthrough to a registered `tts` service.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use personatalk_core::ModelService;
use personatalk_types::protocol::{TtsRequest, TtsResponse, VoiceInfo};

use super::chat::ServiceQuery;
use super::{ok, ApiError, ApiResult};
use crate::cli::TTS_SERVICE_NAME;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct TtsBody {
    pub text: String,
    pub voice_type: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_speed_ratio")]
    pub speed_ratio: f64,
    #[serde(default)]
    pub service: Option<String>,
}

fn default_encoding() -> String {
    "mp3".to_string()
}

fn default_speed_ratio() -> f64 {
    1.0
}

async fn speech_service(
    state: &AppState,
    name: Option<&str>,
) -> Result<Arc<dyn ModelService>, ApiError> {
    Ok(state.service(Some(name.unwrap_or(TTS_SERVICE_NAME))).await?)
}

fn not_speech(service: &dyn ModelService) -> ApiError {
    ApiError::bad_request(format!("'{}' services do not synthesize speech", service.kind()))
}

pub async fn list_voices(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> ApiResult<Vec<VoiceInfo>> {
    let service = speech_service(&state, query.service.as_deref()).await?;
    let Some(tts) = service.as_tts() else {
        return Err(not_speech(service.as_ref()));
    };
    ok(tts.voice_list().await?)
}

pub async fn text_to_speech(
    State(state): State<AppState>,
    Json(body): Json<TtsBody>,
) -> ApiResult<TtsResponse> {
    let service = speech_service(&state, body.service.as_deref()).await?;
    let Some(tts) = service.as_tts() else {
        return Err(not_speech(service.as_ref()));
    };
    let request = TtsRequest::create_simple(body.text, body.voice_type, body.encoding, body.speed_ratio);
    ok(tts.text_to_speech(&request).await?)
}
