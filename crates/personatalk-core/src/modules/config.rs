//! Service registrations from a JSON file.
//!
//! The file holds an array of registrations, each shaped like
//! `{"name": "...", "kind": "...", "api_key": "...", "base_url": "...", "model": "..."}`
//! with optional `timeout_secs`, `max_retries` and `retry_delay_secs`.

use personatalk_types::ServiceRegistration;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::registry::ModelServiceManager;

pub fn load_service_registrations(path: &Path) -> AppResult<Vec<ServiceRegistration>> {
    let content = fs::read_to_string(path)?;
    let registrations: Vec<ServiceRegistration> = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    let mut seen = HashSet::new();
    for registration in &registrations {
        registration
            .validate()
            .map_err(|e| AppError::Config(format!("service '{}': {}", registration.name, e)))?;
        if !seen.insert(registration.name.as_str()) {
            return Err(AppError::Config(format!(
                "service '{}' is defined more than once in {}",
                registration.name,
                path.display()
            )));
        }
    }

    tracing::info!("Loaded {} service registration(s) from {}", registrations.len(), path.display());
    Ok(registrations)
}

/// Register every entry whose name is still free. Returns how many were added.
pub fn apply_registrations(
    manager: &mut ModelServiceManager,
    registrations: Vec<ServiceRegistration>,
) -> AppResult<usize> {
    let mut added = 0;
    for registration in registrations {
        if manager.ensure(registration)? {
            added += 1;
        }
    }
    Ok(added)
}
