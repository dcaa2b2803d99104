//! Test helpers for personatalk-server unit tests.

use std::sync::Arc;

use wiremock::MockServer;

use personatalk_core::{ModelServiceManager, SqliteHistoryStore};
use personatalk_types::{ServiceConfig, ServiceRegistration};

use crate::state::AppState;

/// Stub provider config: one attempt, no backoff.
pub fn stub_config(server: &MockServer) -> ServiceConfig {
    ServiceConfig::new("sk-test", server.uri(), "stub-model")
        .with_timeout_secs(5)
        .with_retries(1, 0.0)
}

/// Create a minimal `AppState` for testing.
///
/// The `default` service points at the returned `MockServer`; keep it alive
/// for the test duration and mount the responses the test needs.
pub async fn test_app_state() -> (AppState, MockServer) {
    let server = MockServer::start().await;
    let mut manager = ModelServiceManager::default();
    manager
        .add(ServiceRegistration::new("default", "openai", stub_config(&server)))
        .expect("failed to register stub service");
    let history = SqliteHistoryStore::open_in_memory().expect("failed to open in-memory store");

    (AppState::new(manager, Arc::new(history)), server)
}
