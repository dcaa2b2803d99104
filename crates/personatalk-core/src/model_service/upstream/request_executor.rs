use bytes::Bytes;
use personatalk_types::{ServiceError, TransportError};
use reqwest::{header, Client, Method, Response};
use serde_json::Value;
use std::time::Duration;

use super::{classify_reqwest_error, RetryPolicy};

pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

/// JSON content type plus bearer authorization.
pub fn build_headers(api_key: &str) -> Result<header::HeaderMap, String> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| format!("Invalid API key header: {}", e))?,
    );
    Ok(headers)
}

pub(super) async fn execute_with_retry(
    client: &Client,
    method: Method,
    url: &str,
    headers: &header::HeaderMap,
    body: Option<Bytes>,
    policy: RetryPolicy,
    timeout: Duration,
) -> Result<Value, ServiceError> {
    let attempts = policy.attempts();
    let mut attempt: u32 = 0;

    loop {
        match send_once(client, method.clone(), url, headers, body.clone(), timeout).await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(
                        "Upstream request succeeded after retry | URL: {} | Attempt: {}/{}",
                        url,
                        attempt + 1,
                        attempts
                    );
                }
                return Ok(value);
            },
            Err(source) => {
                let made = attempt + 1;
                if made >= attempts {
                    tracing::error!(
                        "Upstream request failed | URL: {} | Attempts: {} | Error: {}",
                        url,
                        made,
                        source
                    );
                    return Err(ServiceError::Transport { attempts: made, source });
                }

                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "Upstream attempt {}/{} failed at {}: {} | retrying in {:?}",
                    made,
                    attempts,
                    url,
                    source,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt = made;
            },
        }
    }
}

async fn send_once(
    client: &Client,
    method: Method,
    url: &str,
    headers: &header::HeaderMap,
    body: Option<Bytes>,
    timeout: Duration,
) -> Result<Value, TransportError> {
    let mut request = client.request(method, url).headers(headers.clone());
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = request.send().await.map_err(|e| classify_reqwest_error(&e, url, timeout))?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| classify_reqwest_error(&e, url, timeout))?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidBody { message: e.to_string() })
}

pub(super) async fn open_once(
    client: &Client,
    url: &str,
    headers: &header::HeaderMap,
    body: Bytes,
    timeout: Duration,
) -> Result<Response, TransportError> {
    let send = client.post(url).headers(headers.clone()).body(body).send();
    let response = tokio::time::timeout(timeout, send)
        .await
        .map_err(|_| TransportError::Timeout { timeout_secs: timeout.as_secs() })?
        .map_err(|e| classify_reqwest_error(&e, url, timeout))?;

    let status = response.status();
    if status.is_success() {
        tracing::debug!("Upstream stream opened | URL: {} | Status: {}", url, status);
        return Ok(response);
    }

    // the stream client has no total timeout, so the error body read is bounded here
    let body = match tokio::time::timeout(timeout, response.text()).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => format!("<error body unreadable: {}>", e),
        Err(_) => format!("<error body not received within {}s>", timeout.as_secs()),
    };
    tracing::error!("Upstream stream rejected | URL: {} | Status: {}", url, status);
    Err(TransportError::Status { status: status.as_u16(), body })
}
