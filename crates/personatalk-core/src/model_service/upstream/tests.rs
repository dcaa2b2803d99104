use super::*;
use personatalk_types::ServiceConfig;
use serde_json::json;
use std::time::Instant;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: u32, retry_delay_secs: f64) -> UpstreamClient {
    let config = ServiceConfig::new("sk-test", server.uri(), "m")
        .with_timeout_secs(1)
        .with_retries(max_retries, retry_delay_secs);
    UpstreamClient::new(&config).expect("client builds")
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[test]
fn test_chat_completions_url() {
    assert_eq!(chat_completions_url("https://api.x.com/"), "https://api.x.com/v1/chat/completions");
    assert_eq!(chat_completions_url("https://api.x.com"), "https://api.x.com/v1/chat/completions");
}

#[test]
fn test_delay_doubles_per_attempt() {
    let policy = RetryPolicy::new(3, Duration::from_millis(100));
    assert_eq!(policy.delay_after(0), Duration::from_millis(100));
    assert_eq!(policy.delay_after(1), Duration::from_millis(200));
    assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    // no overflow panic on absurd attempt numbers
    assert!(policy.delay_after(64) >= Duration::from_millis(100));
}

#[test]
fn test_zero_attempts_means_one() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    assert_eq!(RetryPolicy::new(3, Duration::ZERO).attempts(), 3);
}

#[tokio::test]
async fn test_post_json_sends_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"model": "m", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 0.01);
    let headers = build_headers("sk-test").unwrap();
    let value = client
        .post_json(
            &chat_completions_url(&server.uri()),
            &headers,
            &json!({"model": "m", "stream": false}),
        )
        .await
        .unwrap();

    assert_eq!(value, json!({"id": "ok"}));
}

#[tokio::test]
async fn test_retries_until_success_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "third"})))
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 0.05);
    let headers = build_headers("sk-test").unwrap();
    let started = Instant::now();
    let value = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap();

    assert_eq!(value["id"], "third");
    assert_eq!(request_count(&server).await, 3);
    // 50ms after the first failure, 100ms after the second
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_exhausted_retries_report_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server, 2, 0.01);
    let headers = build_headers("sk-test").unwrap();
    let err = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap_err();

    match err {
        ServiceError::Transport { attempts, source } => {
            assert_eq!(attempts, 2);
            assert_eq!(
                source,
                TransportError::Status { status: 503, body: "unavailable".to_string() }
            );
        },
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_client_errors_are_retried_too() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 0.0);
    let headers = build_headers("sk-test").unwrap();
    let err = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap_err();

    assert!(matches!(err, ServiceError::Transport { attempts: 3, .. }));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server, 0, 0.0);
    let headers = build_headers("sk-test").unwrap();
    let err = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap_err();

    assert!(matches!(err, ServiceError::Transport { attempts: 1, .. }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_non_json_success_body_is_invalid_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, 1, 0.0);
    let headers = build_headers("sk-test").unwrap();
    let err = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Transport { attempts: 1, source: TransportError::InvalidBody { .. } }
    ));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 1, 0.0);
    let headers = build_headers("sk-test").unwrap();
    let err = client.post_json(&server.uri(), &headers, &json!({})).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Transport { source: TransportError::Timeout { timeout_secs: 1 }, .. }
    ));
}

#[tokio::test]
async fn test_open_stream_reports_rejection_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = client_for(&server, 3, 0.0);
    let headers = build_headers("sk-test").unwrap();
    let err = client.open_stream(&server.uri(), &headers, &json!({})).await.unwrap_err();

    assert_eq!(
        err,
        ServiceError::Transport {
            attempts: 1,
            source: TransportError::Status { status: 429, body: "rate limited".to_string() }
        }
    );
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let config = ServiceConfig::new("k", "http://127.0.0.1:9", "m")
        .with_timeout_secs(1)
        .with_retries(1, 0.0);
    let client = UpstreamClient::new(&config).unwrap();
    let headers = build_headers("k").unwrap();
    let err = client.post_json("http://127.0.0.1:9/", &headers, &json!({})).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Transport { source: TransportError::Connection { .. } | TransportError::Timeout { .. }, .. }
    ));
}

/// Raw socket stub: answers with `head` and then keeps the connection open.
async fn stalling_server(head: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0_u8; 4096];
        let _ = socket.read(&mut buf).await;
        socket.write_all(head.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_open_stream_bounds_stalled_error_body() {
    let url = stalling_server(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\npartial",
    )
    .await;
    let config = ServiceConfig::new("k", &url, "m").with_timeout_secs(1).with_retries(3, 0.0);
    let client = UpstreamClient::new(&config).unwrap();
    let headers = build_headers("k").unwrap();

    let started = Instant::now();
    let result =
        tokio::time::timeout(Duration::from_secs(5), client.open_stream(&url, &headers, &json!({})))
            .await
            .expect("rejected stream must not hang");
    assert!(started.elapsed() < Duration::from_secs(4));

    match result.unwrap_err() {
        ServiceError::Transport { attempts: 1, source: TransportError::Status { status, body } } => {
            assert_eq!(status, 500);
            assert!(body.contains("not received"));
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_open_stream_bounds_missing_headers() {
    let url = stalling_server("").await;
    let config = ServiceConfig::new("k", &url, "m").with_timeout_secs(1).with_retries(1, 0.0);
    let client = UpstreamClient::new(&config).unwrap();
    let headers = build_headers("k").unwrap();

    let result =
        tokio::time::timeout(Duration::from_secs(5), client.open_stream(&url, &headers, &json!({})))
            .await
            .expect("silent provider must not hang");

    assert!(matches!(
        result.unwrap_err(),
        ServiceError::Transport { source: TransportError::Timeout { timeout_secs: 1 }, .. }
    ));
}
