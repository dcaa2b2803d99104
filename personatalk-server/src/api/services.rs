//! Model service registry handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

use personatalk_types::{RegistryError, ServiceListing, ServiceRegistration};

use super::{ok, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicesResponse {
    pub default: Option<String>,
    pub supported_kinds: Vec<String>,
    pub services: BTreeMap<String, ServiceListing>,
}

pub async fn list_services(State(state): State<AppState>) -> ApiResult<ServicesResponse> {
    let manager = state.manager().read().await;
    ok(ServicesResponse {
        default: manager.default_name().map(str::to_string),
        supported_kinds: manager.supported_kinds(),
        services: manager.list(),
    })
}

/// Register (or replace) a named service.
pub async fn add_service(
    State(state): State<AppState>,
    Json(registration): Json<ServiceRegistration>,
) -> ApiResult<ServiceListing> {
    let name = registration.name.clone();
    let mut manager = state.manager().write().await;
    let service = manager.add(registration)?;
    tracing::info!("Registered model service '{}' ({})", name, service.kind());
    ok(ServiceListing {
        info: service.get_model_info(),
        is_default: manager.default_name() == Some(name.as_str()),
    })
}

pub async fn remove_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Option<String>> {
    let mut manager = state.manager().write().await;
    if !manager.remove(&name) {
        return Err(ApiError::from(RegistryError::NotFound { name: Some(name) }));
    }
    tracing::info!("Removed model service '{}'", name);
    // data is the default after removal
    ok(manager.default_name().map(str::to_string))
}

pub async fn set_default_service(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<String> {
    state.manager().write().await.set_default(&name)?;
    tracing::info!("Default model service is now '{}'", name);
    ok(name)
}
