use personatalk_types::{RegistryError, ServiceListing, ServiceRegistration};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::factory::{ModelServiceFactory, ServiceConstructor};
use crate::model_service::ModelService;

/// Named service instances plus the current default.
///
/// Mutation takes `&mut self`; callers that share a manager across tasks
/// wrap it in a lock.
pub struct ModelServiceManager {
    factory: ModelServiceFactory,
    services: BTreeMap<String, Arc<dyn ModelService>>,
    default_service: Option<String>,
}

impl Default for ModelServiceManager {
    fn default() -> Self {
        Self::new(ModelServiceFactory::default())
    }
}

impl ModelServiceManager {
    pub fn new(factory: ModelServiceFactory) -> Self {
        Self { factory, services: BTreeMap::new(), default_service: None }
    }

    /// Build and store a service. An existing entry with the same name is
    /// replaced; the first entry ever stored becomes the default.
    pub fn add(
        &mut self,
        registration: ServiceRegistration,
    ) -> Result<Arc<dyn ModelService>, RegistryError> {
        let service = self.factory.create(&registration)?;
        self.insert(registration.name, Arc::clone(&service));
        Ok(service)
    }

    /// Store an already-built service under `name`.
    pub fn insert(&mut self, name: impl Into<String>, service: Arc<dyn ModelService>) {
        let name = name.into();
        if self.services.insert(name.clone(), service).is_some() {
            tracing::warn!("Model service '{}' replaced", name);
        } else {
            tracing::info!("Model service '{}' registered", name);
        }
        if self.default_service.is_none() {
            self.default_service = Some(name);
        }
    }

    /// Add only when `name` is not taken yet. Returns whether it added.
    pub fn ensure(&mut self, registration: ServiceRegistration) -> Result<bool, RegistryError> {
        if self.services.contains_key(&registration.name) {
            tracing::debug!("Model service '{}' already registered", registration.name);
            return Ok(false);
        }
        self.add(registration)?;
        Ok(true)
    }

    /// Named lookup, or the default when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn ModelService>, RegistryError> {
        let key = name.or(self.default_service.as_deref());
        key.and_then(|k| self.services.get(k))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { name: name.map(str::to_string) })
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.services.contains_key(name) {
            return Err(RegistryError::NotFound { name: Some(name.to_string()) });
        }
        tracing::info!("Default model service set to '{}'", name);
        self.default_service = Some(name.to_string());
        Ok(())
    }

    /// Remove `name`. Removing the default promotes another entry, if any.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.services.remove(name).is_none() {
            return false;
        }
        tracing::info!("Model service '{}' removed", name);

        if self.default_service.as_deref() == Some(name) {
            self.default_service = self.services.keys().next().cloned();
        }
        true
    }

    pub fn list(&self) -> BTreeMap<String, ServiceListing> {
        self.services
            .iter()
            .map(|(name, service)| {
                let listing = ServiceListing {
                    info: service.get_model_info(),
                    is_default: self.default_service.as_deref() == Some(name.as_str()),
                };
                (name.clone(), listing)
            })
            .collect()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_service.as_deref()
    }

    pub fn register_kind(&mut self, kind: impl Into<String>, constructor: ServiceConstructor) {
        self.factory.register(kind, constructor);
    }

    pub fn supported_kinds(&self) -> Vec<String> {
        self.factory.supported_kinds()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
