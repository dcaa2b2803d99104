//! Text-to-speech wire types (`/voice/list`, `/voice/tts`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One selectable voice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct VoiceInfo {
    pub voice_name: String,
    pub voice_type: String,
    /// Sample audio URL.
    pub url: String,
    pub category: String,
    pub updatetime: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    pub voice_type: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_speed_ratio")]
    pub speed_ratio: Option<f64>,
}

fn default_encoding() -> String {
    "mp3".to_string()
}

#[allow(clippy::unnecessary_wraps, reason = "serde default for an Option field")]
fn default_speed_ratio() -> Option<f64> {
    Some(1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtsText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsRequest {
    pub audio: AudioConfig,
    pub request: TtsText,
}

impl TtsRequest {
    pub fn create_simple(
        text: impl Into<String>,
        voice_type: impl Into<String>,
        encoding: impl Into<String>,
        speed_ratio: f64,
    ) -> Self {
        Self {
            audio: AudioConfig {
                voice_type: voice_type.into(),
                encoding: encoding.into(),
                speed_ratio: Some(speed_ratio),
            },
            request: TtsText { text: text.into() },
        }
    }
}

/// Synthesis result; `data` is base64 audio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsResponse {
    #[serde(default)]
    pub reqid: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default = "default_sequence")]
    pub sequence: i64,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub addition: Option<Map<String, Value>>,
}

fn default_sequence() -> i64 {
    -1
}
