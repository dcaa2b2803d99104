//! PersonaTalk Server
//!
//! HTTP daemon that:
//! - Proxies chat turns to named OpenAI-compatible model services on /api/v1/text_chat*
//! - Keeps conversation history in SQLite on /api/v1/history_session/*
//! - Manages the model service registry on /api/v1/services
//!
//! Access via: http://localhost:8888

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::float_cmp)
)]

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod cli;
mod router;
mod server_utils;
mod state;
#[cfg(test)]
mod test_helpers;

use personatalk_core::modules::{config, logger};
use personatalk_core::{ModelServiceManager, SqliteHistoryStore};

use cli::Cli;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let _log_guard = logger::init_logger(&cli.log_level, cli.log_dir.as_deref())?;

    info!("🚀 PersonaTalk Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let database_path = cli.database_path();
    let history = Arc::new(SqliteHistoryStore::open(&database_path)?);
    info!("🗄️ History database: {}", database_path.display());

    let manager = build_manager(&cli)?;
    info!(
        "📊 {} model service(s) registered, default: {}",
        manager.len(),
        manager.default_name().unwrap_or("<none>")
    );

    let state = AppState::new(manager, history);
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    info!("🌐 Server listening on http://{}", listener.local_addr()?);
    info!("🔌 API available at http://{}:{}/api/v1/", cli.host, cli.port);

    axum::serve(listener, app).with_graceful_shutdown(server_utils::shutdown_signal()).await?;

    info!("👋 Server stopped");
    Ok(())
}

/// Default service first, then the optional speech service and the services file.
fn build_manager(cli: &Cli) -> Result<ModelServiceManager> {
    let mut manager = ModelServiceManager::default();

    if cli.model.api_key.is_empty() {
        warn!("⚠️ OPENAI_API_KEY is not set, upstream calls will be rejected");
    }
    if manager.ensure(cli.model.registration())? {
        info!("✅ Registered '{}' ({})", cli.model.service_name, cli.model.service_type);
    }

    if let Some(registration) = cli.tts.registration() {
        if manager.ensure(registration)? {
            info!("🔊 Registered speech service '{}'", cli::TTS_SERVICE_NAME);
        }
    }

    if let Some(path) = &cli.services_file {
        let registrations = config::load_service_registrations(path)?;
        let added = config::apply_registrations(&mut manager, registrations)?;
        info!("📄 {} service(s) added from {}", added, path.display());
    }

    Ok(manager)
}
