use crate::{
    config::AppConfig,
    models::{SnippetStore, UserStore},
    sessions::SessionLocks,
};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Snippet persistence
    pub snippets: Arc<dyn SnippetStore>,
    /// User persistence and credential checks
    pub users: Arc<dyn UserStore>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Per-session request serialization
    pub session_locks: Arc<SessionLocks>,
}

impl AppState {
    pub fn new(
        snippets: Arc<dyn SnippetStore>,
        users: Arc<dyn UserStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            snippets,
            users,
            config: Arc::new(config),
            session_locks: Arc::new(SessionLocks::new()),
        }
    }

    pub fn snippets(&self) -> &dyn SnippetStore {
        self.snippets.as_ref()
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    /// Get a reference to the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session_locks(&self) -> &Arc<SessionLocks> {
        &self.session_locks
    }
}
