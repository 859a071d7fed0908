use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Model call failed: {0}")]
    Model(#[from] llm::LlmError),

    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Capability {name} failed: {reason}")]
    Invocation { name: String, reason: String },

    #[error("Invalid capability: {0}")]
    Domain(#[from] toolbelt_core::CoreError),

    #[error("Capability store error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// Create an invocation-failure error for one capability call.
    pub fn invocation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invocation {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
