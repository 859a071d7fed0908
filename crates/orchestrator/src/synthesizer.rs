use std::sync::Arc;

use tracing::debug;

use llm::{ModelClient, ResponseRequest};
use toolbelt_core::{CapabilitySpec, ThreadItem};

use crate::error::Result;
use crate::prompts::SystemPrompts;
use crate::store::CapabilityStore;

/// Generates and persists one capability implementation per
/// specification.
///
/// Holds no mutable state, so a single instance can serve concurrent
/// syntheses; parallel writes go to distinct store locations.
#[derive(Clone)]
pub struct CapabilitySynthesizer {
    model: Arc<dyn ModelClient>,
    store: CapabilityStore,
    model_id: String,
}

impl CapabilitySynthesizer {
    pub fn new(model: Arc<dyn ModelClient>, store: CapabilityStore, model_id: String) -> Self {
        Self {
            model,
            store,
            model_id,
        }
    }

    /// Ask the model for an implementation of the specification and
    /// persist the entire output as the capability's source.
    pub async fn synthesize(&self, spec: &CapabilitySpec) -> Result<String> {
        let input = vec![ThreadItem::user(serde_json::to_string(spec)?)];
        let request = ResponseRequest::new(&self.model_id, input)
            .with_instructions(SystemPrompts::write_tool_source());

        let response = self.model.create_response(request).await?;
        let source = response.output_text();

        self.store.write(&spec.name, &source).await?;

        debug!(
            capability = %spec.name,
            bytes = source.len(),
            "Capability synthesized"
        );

        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm::{LlmError, LlmResult, ModelResponse};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedModel {
        outputs: Mutex<Vec<String>>,
    }

    impl FixedModel {
        fn new(outputs: Vec<&str>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for FixedModel {
        async fn create_response(&self, _request: ResponseRequest) -> LlmResult<ModelResponse> {
            let mut outputs = self.outputs.lock().unwrap();
            match outputs.pop() {
                Some(text) => Ok(ModelResponse::text(text)),
                None => Err(LlmError::Api {
                    message: "no scripted output".to_string(),
                    status_code: None,
                }),
            }
        }
    }

    fn spec() -> CapabilitySpec {
        CapabilitySpec::new("add_numbers", "adds two numbers", json!({"type": "object"}))
    }

    #[tokio::test]
    async fn test_synthesize_writes_source() {
        let dir = TempDir::new().unwrap();
        let store = CapabilityStore::new(dir.path());
        let model = Arc::new(FixedModel::new(vec![
            "def add_numbers(a, b):\n    return a + b\n",
        ]));

        let synthesizer = CapabilitySynthesizer::new(model, store, "gpt-5-nano".to_string());
        let source = synthesizer.synthesize(&spec()).await.unwrap();

        assert!(source.contains("return a + b"));
        let written = std::fs::read_to_string(dir.path().join("add_numbers.py")).unwrap();
        assert_eq!(written, source);
    }

    #[tokio::test]
    async fn test_resynthesis_overwrites_previous_source() {
        let dir = TempDir::new().unwrap();
        let store = CapabilityStore::new(dir.path());
        let model = Arc::new(FixedModel::new(vec!["first", "second"]));

        let synthesizer = CapabilitySynthesizer::new(model, store, "gpt-5-nano".to_string());
        synthesizer.synthesize(&spec()).await.unwrap();
        synthesizer.synthesize(&spec()).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("add_numbers.py")).unwrap();
        assert_eq!(written, "second");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let store = CapabilityStore::new(dir.path());
        let model = Arc::new(FixedModel::new(vec![]));

        let synthesizer = CapabilitySynthesizer::new(model, store, "gpt-5-nano".to_string());
        assert!(synthesizer.synthesize(&spec()).await.is_err());
    }
}
