//! Application State
//!
//! Shared handles for the HTTP layer: the named model service registry, the
//! history store and the conversation flow built on top of it.

use std::sync::Arc;
use tokio::sync::RwLock;

use personatalk_core::{
    AppError, ConversationService, HistoryStore, ModelService, ModelServiceManager,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub manager: RwLock<ModelServiceManager>,
    pub history: Arc<dyn HistoryStore>,
    pub conversation: ConversationService,
}

impl AppState {
    pub fn new(manager: ModelServiceManager, history: Arc<dyn HistoryStore>) -> Self {
        let conversation = ConversationService::new(Arc::clone(&history));
        Self { inner: Arc::new(AppStateInner { manager: RwLock::new(manager), history, conversation }) }
    }

    /// Named service, or the default one when `name` is `None`.
    pub async fn service(&self, name: Option<&str>) -> Result<Arc<dyn ModelService>, AppError> {
        Ok(self.inner.manager.read().await.get(name)?)
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.inner.history
    }

    pub fn conversation(&self) -> &ConversationService {
        &self.inner.conversation
    }

    pub fn manager(&self) -> &RwLock<ModelServiceManager> {
        &self.inner.manager
    }
}
