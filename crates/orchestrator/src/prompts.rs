use serde_json::{json, Value};

const TOOL_CREATION: &str = r#"You are the planning stage of a system that answers user requests by creating small single-purpose tools and then running them.

Read the user's request and decide the complete set of tools needed to compute the answer. For every tool, call the `create_tool` function with a JSON-schema tool definition.

Rules for tool definitions:
1. Each tool does exactly one thing and is named in snake_case (the name must be a valid identifier).
2. The definition must contain "name", "description" and "parameters" (a JSON schema object describing the inputs).
3. Prefer several small tools over one large one.
4. Only define tools that can be implemented as pure computation.

If you cannot call the `create_tool` function, emit each definition as a JSON object between <<<TOOL_SPEC>>> and <<<END_TOOL_SPEC>>> markers instead, one pair of markers per tool."#;

const WRITE_TOOL_SOURCE: &str = r#"You are given a JSON-schema tool definition. Write a complete Python implementation of it.

Rules:
1. Your entire output is written to a file verbatim, so respond with Python source only. No markdown fences, no commentary.
2. Define exactly one top-level function whose name matches the tool's "name" and whose keyword parameters match the schema's properties.
3. Use only the Python standard library.
4. The function must return a JSON-serializable value.
5. Do not print anything and do not perform any I/O unless the tool's description requires it."#;

const USE_TOOL: &str = r#"You are given a user request and a set of tools that were created specifically to answer it.

Call the tools needed to compute the answer, with concrete argument values taken from the request. You must call at least one tool. Do not answer the request directly."#;

const TOOL_SUMMARY: &str = r#"You are given a conversation containing a user request, tool calls and their results. Some results may contain an "error" field.

Write the final answer to the user's request in plain language, based on the tool results. If every tool failed, say what went wrong. Do not mention the tools' internal names unless it helps the user."#;

/// Phase instructions, addressed by name.
pub struct SystemPrompts;

impl SystemPrompts {
    /// Look up a phase instruction by its configured name.
    pub fn get(name: &str) -> Option<&'static str> {
        match name {
            "tool_creation" => Some(TOOL_CREATION),
            "write_tool_source" => Some(WRITE_TOOL_SOURCE),
            "use_tool" => Some(USE_TOOL),
            "tool_summary" => Some(TOOL_SUMMARY),
            _ => None,
        }
    }

    pub fn tool_creation() -> &'static str {
        TOOL_CREATION
    }

    pub fn write_tool_source() -> &'static str {
        WRITE_TOOL_SOURCE
    }

    pub fn use_tool() -> &'static str {
        USE_TOOL
    }

    pub fn tool_summary() -> &'static str {
        TOOL_SUMMARY
    }

    /// The `create_tool` function schema handed to the planner.
    pub fn create_tool_schema() -> Value {
        json!({
            "type": "function",
            "name": "create_tool",
            "description": "Outputs a json schema tool definition that satisfies the functionality desired",
            "parameters": {
                "type": "object",
                "properties": {
                    "tool_json_schema": {
                        "type": "string",
                        "description": "A properly formatted json-schema tool definition, e.g. {\"name\": \"get_horoscope\", \"description\": \"Get today's horoscope for an astrological sign.\", \"parameters\": {\"type\": \"object\", \"properties\": {\"sign\": {\"type\": \"string\"}}, \"required\": [\"sign\"]}}"
                    }
                },
                "required": ["tool_json_schema"]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_resolve_by_name() {
        assert!(SystemPrompts::get("tool_creation").is_some());
        assert!(SystemPrompts::get("write_tool_source").is_some());
        assert!(SystemPrompts::get("use_tool").is_some());
        assert!(SystemPrompts::get("tool_summary").is_some());
        assert!(SystemPrompts::get("nonexistent").is_none());
    }

    #[test]
    fn test_tool_creation_mentions_markers() {
        let prompt = SystemPrompts::tool_creation();
        assert!(prompt.contains("<<<TOOL_SPEC>>>"));
        assert!(prompt.contains("<<<END_TOOL_SPEC>>>"));
        assert!(prompt.contains("create_tool"));
    }

    #[test]
    fn test_create_tool_schema_shape() {
        let schema = SystemPrompts::create_tool_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["name"], "create_tool");
        assert_eq!(
            schema["parameters"]["required"][0],
            "tool_json_schema"
        );
    }
}
