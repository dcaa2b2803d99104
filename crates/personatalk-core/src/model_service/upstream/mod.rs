//! Retrying HTTP transport shared by all model services.

mod request_executor;

#[cfg(test)]
mod tests;

use bytes::Bytes;
use personatalk_types::{ServiceConfig, ServiceError, TransportError};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::common::client_builder::build_http_client;

pub use request_executor::{build_headers, chat_completions_url};

/// Attempt budget and backoff for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, not additional retries. Zero behaves as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after failed attempt `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

pub struct UpstreamClient {
    http_client: Client,
    stream_client: Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build the request and streaming clients for a service config.
    pub fn new(config: &ServiceConfig) -> Result<Self, String> {
        let timeout = config.timeout();
        Ok(Self {
            http_client: build_http_client(Some(timeout), timeout)?,
            stream_client: build_http_client(None, timeout)?,
            policy: RetryPolicy::from_config(config),
            timeout,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Per-attempt timeout; also used as the idle limit between stream reads.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON payload and parse the JSON reply, retrying any failure.
    pub async fn post_json<P>(
        &self,
        url: &str,
        headers: &HeaderMap,
        payload: &P,
    ) -> Result<Value, ServiceError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode_body(payload)?;
        request_executor::execute_with_retry(
            &self.http_client,
            Method::POST,
            url,
            headers,
            Some(body),
            self.policy,
            self.timeout,
        )
        .await
    }

    /// GET a JSON document with the same retry behaviour as [`Self::post_json`].
    pub async fn get_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, ServiceError> {
        request_executor::execute_with_retry(
            &self.http_client,
            Method::GET,
            url,
            headers,
            None,
            self.policy,
            self.timeout,
        )
        .await
    }

    /// Open a streaming POST. A single attempt; non-2xx is reported with its body.
    pub async fn open_stream<P>(
        &self,
        url: &str,
        headers: &HeaderMap,
        payload: &P,
    ) -> Result<Response, ServiceError>
    where
        P: Serialize + ?Sized,
    {
        let body = encode_body(payload)?;
        request_executor::open_once(&self.stream_client, url, headers, body, self.timeout)
            .await
            .map_err(|source| ServiceError::Transport { attempts: 1, source })
    }
}

fn encode_body<P: Serialize + ?Sized>(payload: &P) -> Result<Bytes, ServiceError> {
    serde_json::to_vec(payload)
        .map(Bytes::from)
        .map_err(|e| ServiceError::InvalidRequest { message: e.to_string() })
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn classify_reqwest_error(
    err: &reqwest::Error,
    url: &str,
    timeout: Duration,
) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { timeout_secs: timeout.as_secs() }
    } else if err.is_decode() {
        TransportError::InvalidBody { message: err.to_string() }
    } else {
        TransportError::Connection { url: url.to_string(), message: err.to_string() }
    }
}
