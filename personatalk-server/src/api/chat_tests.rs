use axum::extract::{Query, State};
use axum::response::Json;
use personatalk_core::ChatTurn;
use personatalk_types::ChatRole;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::chat::{
    list_models, model_health, sse_payloads, text_chat, text_chat_stream, ServiceQuery,
    TextChatBody,
};
use crate::test_helpers::test_app_state;
use personatalk_core::ConversationEvent;

fn body(message: &str) -> TextChatBody {
    TextChatBody { turn: ChatTurn::new(message), service: None }
}

async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"temperature": 0.7, "max_tokens": 4096})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_text_chat_creates_session_and_stores_turn() {
    let (state, server) = test_app_state().await;
    mount_reply(&server, "Hello back").await;

    let Json(response) = text_chat(State(state.clone()), Json(body("Hello"))).await.unwrap();
    assert_eq!(response.code, 200);
    let reply = response.data.unwrap();
    assert_eq!(reply.response, "Hello back");

    let session = state.history().get_session(&reply.session_id).await.unwrap().unwrap();
    assert_eq!(session.session_name, "Hello");
    let messages = state.history().get_messages(&reply.session_id, None).await.unwrap();
    let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
}

#[tokio::test]
async fn test_text_chat_rejects_empty_message() {
    let (state, _server) = test_app_state().await;
    let error = text_chat(State(state), Json(body("   "))).await.unwrap_err();
    assert_eq!(error.code, 400);
}

#[tokio::test]
async fn test_text_chat_unknown_service() {
    let (state, _server) = test_app_state().await;
    let mut request = body("Hello");
    request.service = Some("missing".to_string());

    let error = text_chat(State(state), Json(request)).await.unwrap_err();
    assert_eq!(error.code, 404);
    assert!(error.message.contains("missing"));
}

#[tokio::test]
async fn test_text_chat_provider_failure_is_bad_gateway() {
    let (state, server) = test_app_state().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let error = text_chat(State(state), Json(body("Hello"))).await.unwrap_err();
    assert_eq!(error.code, 502);
}

fn data_lines(raw: &str) -> Vec<String> {
    raw.lines().filter_map(|line| line.strip_prefix("data: ")).map(str::to_string).collect()
}

#[tokio::test]
async fn test_text_chat_stream_emits_envelopes_then_done() {
    let (state, server) = test_app_state().await;
    let sse = concat!(
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let response = text_chat_stream(State(state.clone()), Json(body("Hello"))).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let frames = data_lines(&String::from_utf8_lossy(&bytes));

    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));
    let envelopes: Vec<Value> =
        frames[..frames.len() - 1].iter().map(|f| serde_json::from_str(f).unwrap()).collect();
    let text: String =
        envelopes.iter().filter_map(|e| e["data"]["content"].as_str()).collect();
    assert_eq!(text, "Hi there");

    let done = envelopes.last().unwrap();
    assert_eq!(done["message"], "chat complete");
    assert_eq!(done["data"]["content"], "");

    let session_id = done["data"]["session_id"].as_str().unwrap();
    let messages = state.history().get_messages(session_id, None).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hi there");
}

#[test]
fn test_failed_event_becomes_bad_gateway_then_done() {
    let payloads = sse_payloads(ConversationEvent::Failed { error: "HTTP 503".to_string() });
    assert_eq!(payloads.len(), 2);
    let envelope: Value = serde_json::from_str(&payloads[0]).unwrap();
    assert_eq!(envelope["code"], 502);
    assert_eq!(envelope["message"], "HTTP 503");
    assert!(envelope["data"].is_null());
    assert_eq!(payloads[1], "[DONE]");
}

#[tokio::test]
async fn test_list_models_reports_default_model() {
    let (state, _server) = test_app_state().await;
    let Json(response) = list_models(State(state), Query(ServiceQuery::default())).await.unwrap();
    let models = response.data.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "stub-model");
    assert_eq!(models[0].object, "model");
    assert_eq!(models[0].owned_by, "personatalk");
}

#[tokio::test]
async fn test_model_health() {
    let (state, server) = test_app_state().await;

    let Json(response) =
        model_health(State(state.clone()), Query(ServiceQuery::default())).await.unwrap();
    assert_eq!(response.data.unwrap().status, "unhealthy");

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "H"}}]
        })))
        .mount(&server)
        .await;
    let Json(response) = model_health(State(state), Query(ServiceQuery::default())).await.unwrap();
    let health = response.data.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.model, "stub-model");
}
