use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbelt_core::ThreadItem;

/// Request for the Responses API
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: Vec<ThreadItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl ResponseRequest {
    pub fn new(model: impl Into<String>, input: Vec<ThreadItem>) -> Self {
        Self {
            model: model.into(),
            input,
            instructions: None,
            tools: None,
            tool_choice: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }
}

/// Tool-choice policy constraining which functions the model may call
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    AllowedTools {
        mode: AllowedToolsMode,
        tools: Vec<ToolRef>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedToolsMode {
    Auto,
    Required,
}

/// Reference to one allowed function tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ToolRef {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            kind: "function".to_string(),
            name: name.into(),
        }
    }
}

impl ToolChoice {
    /// The model must call at least one of the named functions.
    pub fn required<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowedTools {
            mode: AllowedToolsMode::Required,
            tools: names.into_iter().map(ToolRef::function).collect(),
        }
    }

    /// The model may call any of the named functions, or none.
    pub fn auto<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AllowedTools {
            mode: AllowedToolsMode::Auto,
            tools: names.into_iter().map(ToolRef::function).collect(),
        }
    }
}

/// One part of a message item's content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// One item of a model response: a plain message or a function-call
/// request. Item types this client does not understand deserialize to
/// `Unknown` instead of failing the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItem {
    Message {
        role: String,
        content: Vec<OutputContent>,
    },
    FunctionCall {
        name: String,
        /// JSON text of the argument object
        arguments: String,
        call_id: String,
    },
    #[serde(other)]
    Unknown,
}

impl ResponseItem {
    pub fn message(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Message {
            role: role.into(),
            content: vec![OutputContent {
                kind: "output_text".to_string(),
                text: text.into(),
            }],
        }
    }

    pub fn function_call(
        name: impl Into<String>,
        arguments: impl Into<String>,
        call_id: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
            call_id: call_id.into(),
        }
    }

    /// Convert to a thread item for appending raw model output to a
    /// session thread. Unknown items carry nothing and map to `None`.
    pub fn as_thread_item(&self) -> Option<ThreadItem> {
        match self {
            Self::Message { role, content } => {
                let text: String = content.iter().map(|c| c.text.as_str()).collect();
                Some(ThreadItem::Message {
                    role: match role.as_str() {
                        "system" => toolbelt_core::Role::System,
                        "user" => toolbelt_core::Role::User,
                        _ => toolbelt_core::Role::Assistant,
                    },
                    content: text,
                })
            }
            Self::FunctionCall {
                name,
                arguments,
                call_id,
            } => Some(ThreadItem::function_call(name, call_id, arguments)),
            Self::Unknown => None,
        }
    }
}

/// Response from the Responses API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub output: Vec<ResponseItem>,
}

impl ModelResponse {
    pub fn from_items(output: Vec<ResponseItem>) -> Self {
        Self {
            id: None,
            model: None,
            output,
        }
    }

    /// Convenience response containing a single assistant message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_items(vec![ResponseItem::message("assistant", text)])
    }

    /// Concatenated text of all message items.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                ResponseItem::Message { content, .. } => {
                    Some(content.iter().map(|c| c.text.as_str()).collect::<String>())
                }
                _ => None,
            })
            .collect()
    }
}

/// Error body returned by the model API
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_skips_empty_fields() {
        let request = ResponseRequest::new("gpt-5-nano", vec![ThreadItem::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("instructions").is_none());
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_choice_serialization() {
        let choice = ToolChoice::required(["add_numbers", "geocode"]);
        let json = serde_json::to_value(&choice).unwrap();

        assert_eq!(json["type"], "allowed_tools");
        assert_eq!(json["mode"], "required");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][1]["name"], "geocode");
    }

    #[test]
    fn test_response_deserialization() {
        let body = json!({
            "id": "resp_123",
            "model": "gpt-5-nano",
            "output": [
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "hello"}]
                },
                {
                    "type": "function_call",
                    "name": "add_numbers",
                    "arguments": "{\"a\":2,\"b\":3}",
                    "call_id": "call-1"
                }
            ]
        });

        let response: ModelResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.output.len(), 2);
        assert_eq!(response.output_text(), "hello");

        match &response.output[1] {
            ResponseItem::FunctionCall { name, call_id, .. } => {
                assert_eq!(name, "add_numbers");
                assert_eq!(call_id, "call-1");
            }
            _ => panic!("expected function call"),
        }
    }

    #[test]
    fn test_unknown_items_are_tolerated() {
        let body = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "ok"}]
                }
            ]
        });

        let response: ModelResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.output_text(), "ok");
        assert!(matches!(response.output[0], ResponseItem::Unknown));
    }

    #[test]
    fn test_as_thread_item() {
        let item = ResponseItem::function_call("add_numbers", "{}", "call-1");
        match item.as_thread_item() {
            Some(ThreadItem::FunctionCall { name, call_id, .. }) => {
                assert_eq!(name, "add_numbers");
                assert_eq!(call_id, "call-1");
            }
            _ => panic!("expected function call thread item"),
        }

        assert!(ResponseItem::Unknown.as_thread_item().is_none());
    }
}
