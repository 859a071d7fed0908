use std::sync::{Arc, RwLock};

use sqlx::SqlitePool;

use db::{CapabilityRepository, SessionRepository};
use events::EventBus;
use llm::{ModelClient, ResponsesClient};
use orchestrator::{CapabilityRegistry, CapabilityStore, PythonLoader, SessionDeps};

use crate::config::ServerConfig;
use crate::routes::sse::{EventBuffer, SharedEventBuffer, DEFAULT_EVENT_BUFFER_SIZE};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub model: Arc<dyn ModelClient>,
    pub event_bus: EventBus,
    pub event_buffer: SharedEventBuffer,
    pub sessions: Option<SessionRepository>,
    pub capabilities: Option<CapabilityRepository>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let model = Arc::new(ResponsesClient::new(
            config.api_key.clone(),
            config.api_base_url.clone(),
        ));

        Self {
            config: Arc::new(config),
            model,
            event_bus: EventBus::new(),
            event_buffer: Arc::new(RwLock::new(EventBuffer::new(DEFAULT_EVENT_BUFFER_SIZE))),
            sessions: None,
            capabilities: None,
        }
    }

    /// Attach the session store repositories. Runs work without them;
    /// store failures are never fatal.
    pub fn with_repositories(mut self, pool: SqlitePool) -> Self {
        self.sessions = Some(SessionRepository::new(pool.clone()));
        self.capabilities = Some(CapabilityRepository::new(pool));
        self
    }

    /// Substitute the model client (used by tests).
    pub fn with_model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = model;
        self
    }

    /// Collaborators for one session run. The registry is scoped to the
    /// run; the capability directory is shared across runs by design.
    pub fn session_deps(&self) -> SessionDeps {
        let store = CapabilityStore::new(self.config.capability_dir.clone());
        let loader = PythonLoader::new(store.clone(), self.config.interpreter.clone());

        SessionDeps {
            model: Arc::clone(&self.model),
            store,
            registry: Arc::new(CapabilityRegistry::new()),
            loader: Arc::new(loader),
            sessions: self.sessions.clone(),
            capabilities: self.capabilities.clone(),
            bus: Some(self.event_bus.clone()),
        }
    }
}
