use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::error::CoreError;

/// A schema-described unit of functionality planned for one session.
///
/// Produced by the planning phase, consumed by synthesis and invocation.
/// Immutable after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CapabilitySpec {
    /// Unique within a session; doubles as the module and function name
    /// of the synthesized implementation.
    pub name: String,
    pub description: String,
    /// JSON schema describing the capability's input object.
    #[schema(value_type = Object)]
    pub parameters: Value,
}

impl CapabilitySpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Capability names become file names and Python identifiers, so they
    /// are restricted to `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn validate_name(name: &str) -> Result<(), CoreError> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(())
        } else {
            Err(CoreError::InvalidCapabilityName(name.to_string()))
        }
    }

    /// The function-tool schema shape the model API expects.
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

/// A capability invocation requested by the model.
///
/// Consumed exactly once by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub name: String,
    pub call_id: String,
    /// Argument object, unpacked as named parameters at invocation time.
    pub arguments: Value,
}

/// The outcome of one call request.
///
/// Every `CallRequest` produces exactly one `CallResult`, whether or not
/// execution succeeded; failures are carried as data in `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub call_id: String,
    pub output: Value,
}

impl CallResult {
    pub fn ok(call_id: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            output,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}
