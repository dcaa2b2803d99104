//! Model service configuration and registry views.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Connection and retry settings for one backend instance.
#[derive(Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ServiceConfig {
    #[serde(default)]
    pub api_key: String,
    /// Provider root; `/v1/chat/completions` is appended.
    #[validate(url(message = "base_url must be a valid URL"))]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
    /// Per-attempt timeout in seconds
    #[validate(range(min = 1_u64, max = 3600_u64))]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per call (not additional retries)
    #[validate(range(max = 20_u32))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `retry_delay_secs * 2^n`
    #[validate(range(min = 0.0, max = 300.0))]
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

impl ServiceConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay_secs: f64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_secs = retry_delay_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs.max(0.0))
    }

    /// Base URL without trailing slashes.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// api_key is never printed
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .finish()
    }
}

/// A named backend to put in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ServiceRegistration {
    #[validate(length(min = 1_u64, max = 100_u64))]
    pub name: String,
    /// Backend kind tag, e.g. `openai`, `deepseek`, `qiniu`, `tts`.
    #[validate(length(min = 1_u64))]
    pub kind: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub config: ServiceConfig,
}

impl ServiceRegistration {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, config: ServiceConfig) -> Self {
        Self { name: name.into(), kind: kind.into(), config }
    }
}

/// Non-secret settings reported by `get_model_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    pub kind: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub model: String,
    pub base_url: String,
    pub config: ServiceSettings,
}

impl ModelInfo {
    pub fn from_config(kind: &str, config: &ServiceConfig) -> Self {
        Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            config: ServiceSettings {
                kind: kind.to_string(),
                timeout_secs: config.timeout_secs,
                max_retries: config.max_retries,
                retry_delay_secs: config.retry_delay_secs,
            },
        }
    }
}

/// One row of the registry listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceListing {
    pub info: ModelInfo,
    pub is_default: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_defaults_from_json() {
        let registration: ServiceRegistration = serde_json::from_value(json!({
            "name": "qiniu",
            "kind": "qiniu",
            "api_key": "sk-test",
            "base_url": "https://openai.qiniu.com/",
            "model": "deepseek-r1"
        }))
        .unwrap();

        assert_eq!(registration.config.timeout_secs, 30);
        assert_eq!(registration.config.max_retries, 3);
        assert_eq!(registration.config.retry_delay(), Duration::from_secs(1));
        assert_eq!(registration.config.trimmed_base_url(), "https://openai.qiniu.com");
        assert!(registration.validate().is_ok());
    }

    #[test]
    fn test_registration_rejects_bad_url() {
        let registration =
            ServiceRegistration::new("x", "openai", ServiceConfig::new("", "not a url", "m"));
        assert!(registration.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServiceConfig::new("sk-secret", "http://localhost", "m");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("***"));
    }
}
