use serde::{Deserialize, Serialize};

/// Role of a plain message in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in a session's planning or execution thread.
///
/// Threads are append-only logs; items are never mutated in place. The
/// serialized form matches the model API's input item shape, so a thread
/// can be sent as a request's `input` verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItem {
    Message {
        role: Role,
        content: String,
    },
    FunctionCall {
        name: String,
        call_id: String,
        /// JSON text, exactly as the model produced it.
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        /// JSON text of the call's output payload.
        output: String,
    },
}

impl ThreadItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn function_call(
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            name: name.into(),
            call_id: call_id.into(),
            arguments: arguments.into(),
        }
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let item = ThreadItem::user("How far is the moon?");
        let json = serde_json::to_string(&item).unwrap();

        assert!(json.contains(r#""type":"message""#));
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn test_function_call_round_trip() {
        let item = ThreadItem::function_call("add_numbers", "call-1", r#"{"a":2,"b":3}"#);
        let json = serde_json::to_string(&item).unwrap();
        let back: ThreadItem = serde_json::from_str(&json).unwrap();

        assert_eq!(item, back);
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::System.as_str(), "system");
    }
}
