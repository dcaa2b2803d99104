//! Global tracing subscriber setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, AppResult};

const LOG_FILE_PREFIX: &str = "personatalk.log";

/// `RUST_LOG` when set, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| AppError::Config(format!("invalid log filter '{}': {}", default_level, e)))
}

/// Install stdout logging, plus a daily-rolling file under `log_dir` when given.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// stops the file writer.
pub fn init_logger(default_level: &str, log_dir: Option<&Path>) -> AppResult<Option<WorkerGuard>> {
    let filter = env_filter(default_level)?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("logger already initialized: {}", e)))?;

    if let Some(dir) = log_dir {
        tracing::info!("Writing logs to {}", dir.display());
    }
    Ok(guard)
}
