use personatalk_types::{RegistryError, ServiceConfig, ServiceRegistration};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::model_service::{ModelService, OpenAiCompatibleService, TtsService};

/// Builds a service for a kind tag. Receives the kind so one constructor can
/// serve several aliases.
pub type ServiceConstructor = Arc<
    dyn Fn(&str, ServiceConfig) -> Result<Arc<dyn ModelService>, RegistryError> + Send + Sync,
>;

/// Kind tag -> constructor table.
#[derive(Clone)]
pub struct ModelServiceFactory {
    constructors: BTreeMap<String, ServiceConstructor>,
}

fn openai_compatible(kind: &str, config: ServiceConfig) -> Result<Arc<dyn ModelService>, RegistryError> {
    OpenAiCompatibleService::new(kind, config)
        .map(|s| Arc::new(s) as Arc<dyn ModelService>)
        .map_err(|message| RegistryError::InvalidRegistration { message })
}

fn text_to_speech(kind: &str, config: ServiceConfig) -> Result<Arc<dyn ModelService>, RegistryError> {
    TtsService::new(kind, config)
        .map(|s| Arc::new(s) as Arc<dyn ModelService>)
        .map_err(|message| RegistryError::InvalidRegistration { message })
}

impl Default for ModelServiceFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        for kind in ["openai", "deepseek", "qiniu"] {
            factory.register(kind, Arc::new(openai_compatible));
        }
        factory.register("tts", Arc::new(text_to_speech));
        factory
    }
}

impl ModelServiceFactory {
    /// A factory with no kinds at all.
    pub fn empty() -> Self {
        Self { constructors: BTreeMap::new() }
    }

    /// Add or replace the constructor for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, constructor: ServiceConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Supported kinds, sorted.
    pub fn supported_kinds(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn create(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<Arc<dyn ModelService>, RegistryError> {
        let constructor = self.constructors.get(&registration.kind).ok_or_else(|| {
            RegistryError::UnsupportedKind {
                kind: registration.kind.clone(),
                supported: self.supported_kinds(),
            }
        })?;

        registration
            .validate()
            .map_err(|e| RegistryError::InvalidRegistration { message: e.to_string() })?;

        constructor(&registration.kind, registration.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(kind: &str) -> ServiceRegistration {
        ServiceRegistration::new("svc", kind, ServiceConfig::new("k", "http://localhost:1", "m"))
    }

    #[test]
    fn test_builtin_kinds() {
        let factory = ModelServiceFactory::default();
        assert_eq!(factory.supported_kinds(), vec!["deepseek", "openai", "qiniu", "tts"]);
        for kind in ["openai", "deepseek", "qiniu", "tts"] {
            let service = factory.create(&registration(kind)).ok().map(|s| s.kind().to_string());
            assert_eq!(service.as_deref(), Some(kind));
        }
    }

    #[test]
    fn test_unknown_kind_lists_supported() {
        let err = ModelServiceFactory::default().create(&registration("claude")).err().unwrap();
        match err {
            RegistryError::UnsupportedKind { kind, supported } => {
                assert_eq!(kind, "claude");
                assert!(supported.contains(&"qiniu".to_string()));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_registration_rejected() {
        let mut bad = registration("openai");
        bad.config.base_url = "nope".to_string();
        let err = ModelServiceFactory::default().create(&bad).err().unwrap();
        assert!(matches!(err, RegistryError::InvalidRegistration { .. }));
    }

    #[test]
    fn test_register_custom_kind() {
        let mut factory = ModelServiceFactory::empty();
        assert!(!factory.supports("local"));
        factory.register("local", Arc::new(openai_compatible));
        assert!(factory.supports("local"));
        let service = factory.create(&registration("local")).ok();
        assert_eq!(service.map(|s| s.kind().to_string()).as_deref(), Some("local"));
    }
}
