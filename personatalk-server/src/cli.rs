use clap::{Args, Parser};
use personatalk_types::{ServiceConfig, ServiceRegistration};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "personatalk-server",
    about = "PersonaTalk Server - conversational AI backend",
    version = env!("CARGO_PKG_VERSION"),
    author
)]
pub struct Cli {
    #[arg(long, env = "PERSONATALK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PERSONATALK_PORT", default_value = "8888")]
    pub port: u16,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "PERSONATALK_LOG_DIR", help = "Also write daily-rolling log files here")]
    pub log_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "personatalk.db",
        help = "SQLite path (a sqlite:// prefix is accepted)"
    )]
    pub database_url: String,

    #[arg(
        long,
        env = "PERSONATALK_SERVICES_FILE",
        help = "JSON array of extra model service registrations"
    )]
    pub services_file: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub tts: TtsArgs,
}

impl Cli {
    /// Database file path with any `sqlite:` URL prefix removed.
    pub fn database_path(&self) -> PathBuf {
        let raw = self.database_url.as_str();
        let path = raw
            .strip_prefix("sqlite:///")
            .or_else(|| raw.strip_prefix("sqlite://"))
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);
        PathBuf::from(path)
    }
}

/// The default chat service registered at startup.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    #[arg(long = "service-name", env = "MODEL_SERVICE_NAME", default_value = "default")]
    pub service_name: String,

    #[arg(long = "service-type", env = "MODEL_SERVICE_TYPE", default_value = "qiniu")]
    pub service_type: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://openai.qiniu.com")]
    pub base_url: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = "deepseek-v3")]
    pub model: String,

    #[arg(long, env = "MODEL_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    #[arg(long, env = "MODEL_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    #[arg(long, env = "MODEL_RETRY_DELAY", default_value = "1")]
    pub retry_delay: f64,
}

impl ModelArgs {
    pub fn registration(&self) -> ServiceRegistration {
        let config = ServiceConfig::new(&self.api_key, &self.base_url, &self.model)
            .with_timeout_secs(self.timeout)
            .with_retries(self.max_retries, self.retry_delay);
        ServiceRegistration::new(&self.service_name, &self.service_type, config)
    }
}

/// Optional text-to-speech service, registered as `tts` when a key is set.
#[derive(Args, Debug, Clone)]
pub struct TtsArgs {
    #[arg(id = "tts_api_key", long = "tts-api-key", env = "TTS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(id = "tts_base_url", long = "tts-base-url", env = "TTS_BASE_URL", default_value = "https://openai.qiniu.com/v1")]
    pub base_url: String,
}

pub const TTS_SERVICE_NAME: &str = "tts";

impl TtsArgs {
    pub fn registration(&self) -> Option<ServiceRegistration> {
        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some(ServiceRegistration::new(
            TTS_SERVICE_NAME,
            "tts",
            ServiceConfig::new(api_key, &self.base_url, "tts"),
        ))
    }
}
