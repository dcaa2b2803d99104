use axum::extract::{Query, State};
use axum::response::Json;
use personatalk_types::{ServiceConfig, ServiceRegistration};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::chat::ServiceQuery;
use super::tts::{list_voices, text_to_speech, TtsBody};
use crate::state::AppState;
use crate::test_helpers::test_app_state;

async fn register_tts(state: &AppState, server: &MockServer) {
    let config = ServiceConfig::new("sk-tts", server.uri(), "tts").with_retries(1, 0.0);
    state
        .manager()
        .write()
        .await
        .add(ServiceRegistration::new("tts", "tts", config))
        .unwrap();
}

fn tts_body(text: &str) -> TtsBody {
    TtsBody {
        text: text.to_string(),
        voice_type: "qiniu_zh_female_tmjxxy".to_string(),
        encoding: "mp3".to_string(),
        speed_ratio: 1.0,
        service: None,
    }
}

#[tokio::test]
async fn test_list_voices() {
    let (state, _chat) = test_app_state().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voice/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"voice_name": "Tianmei", "voice_type": "qiniu_zh_female_tmjxxy"}
        ])))
        .mount(&server)
        .await;
    register_tts(&state, &server).await;

    let Json(response) = list_voices(State(state), Query(ServiceQuery::default())).await.unwrap();
    let voices = response.data.unwrap();
    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0].voice_name, "Tianmei");
}

#[tokio::test]
async fn test_text_to_speech() {
    let (state, _chat) = test_app_state().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice/tts"))
        .and(body_partial_json(json!({"request": {"text": "hello"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reqid": "r-1", "operation": "query", "sequence": -1, "data": "SUQz"
        })))
        .mount(&server)
        .await;
    register_tts(&state, &server).await;

    let Json(response) = text_to_speech(State(state), Json(tts_body("hello"))).await.unwrap();
    let audio = response.data.unwrap();
    assert_eq!(audio.reqid, "r-1");
    assert_eq!(audio.data, "SUQz");
}

#[tokio::test]
async fn test_tts_without_service_is_not_found() {
    let (state, _chat) = test_app_state().await;
    let error = text_to_speech(State(state), Json(tts_body("hello"))).await.unwrap_err();
    assert_eq!(error.code, 404);
}

#[tokio::test]
async fn test_chat_service_cannot_speak() {
    let (state, _chat) = test_app_state().await;
    let mut body = tts_body("hello");
    body.service = Some("default".to_string());

    let error = text_to_speech(State(state), Json(body)).await.unwrap_err();
    assert_eq!(error.code, 400);
}
