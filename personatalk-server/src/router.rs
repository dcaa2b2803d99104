use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/api/v1", api::router())
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/version", get(version_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

pub(crate) async fn banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "PersonaTalk API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.history().ping().await;
    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(serde_json::json!({
            "status": if database { "ok" } else { "degraded" },
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

async fn version_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "version": option_env!("GIT_VERSION").unwrap_or("dev"),
            "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
            "cargo_version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
