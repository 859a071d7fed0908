//! Progress event types for toolbelt session runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Envelope wrapping a progress event with metadata for the global
/// observation stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to
    pub session_id: String,
    /// The actual event
    pub event: SessionEvent,
}

impl EventEnvelope {
    /// Create a new envelope with auto-generated ID and timestamp
    pub fn new(session_id: impl Into<String>, event: SessionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            event,
        }
    }
}

/// All progress events a session run can emit, in the order phases
/// produce them. The `Display` impl renders the human-readable progress
/// line streamed to the caller; the serialized form feeds the
/// observation stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Planning phase started
    #[serde(rename = "planning.started")]
    PlanningStarted,

    /// One capability the planner decided to create
    #[serde(rename = "capability.planned")]
    CapabilityPlanned { name: String, description: String },

    /// The planner produced zero capability specifications
    #[serde(rename = "planning.empty")]
    NoCapabilitiesPlanned,

    /// Parallel synthesis started
    #[serde(rename = "synthesis.started")]
    SynthesisStarted { count: usize },

    /// All capabilities synthesized
    #[serde(rename = "synthesis.completed")]
    SynthesisCompleted { count: usize },

    /// Recording synthesized capabilities to the session store failed
    #[serde(rename = "persistence.failed")]
    PersistenceFailed { message: String },

    /// No capabilities exist; the run cannot reach invocation
    #[serde(rename = "run.cannot_proceed")]
    CannotProceed,

    /// Invocation planning started
    #[serde(rename = "invocation.started")]
    InvocationStarted,

    /// The model requested this many capability calls
    #[serde(rename = "calls.requested")]
    CallsRequested { count: usize },

    /// The model requested no capability calls
    #[serde(rename = "calls.none")]
    NoCallsRequested,

    /// Resolving a capability before execution
    #[serde(rename = "capability.loading")]
    LoadingCapability { name: String },

    /// Capability resolved and ready to execute
    #[serde(rename = "capability.loaded")]
    CapabilityLoaded { name: String },

    /// Executing one call request
    #[serde(rename = "call.executing")]
    ExecutingCall {
        name: String,
        index: usize,
        total: usize,
    },

    /// One call completed successfully
    #[serde(rename = "call.completed")]
    CallCompleted { name: String },

    /// One call failed; the error is recorded as the call's result
    #[serde(rename = "call.failed")]
    CallFailed { name: String, message: String },

    /// Summarization started
    #[serde(rename = "summary.started")]
    Summarizing,

    /// The final answer; always the last meaningful event of a
    /// successful run
    #[serde(rename = "summary.final")]
    FinalAnswer { text: String },

    /// A phase-level failure that terminates the run
    #[serde(rename = "run.failed")]
    Fatal { phase: String, message: String },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanningStarted => write!(f, "Determining necessary tool definitions..."),
            Self::CapabilityPlanned { name, description } => {
                write!(f, "{}: {}", name, description)
            }
            Self::NoCapabilitiesPlanned => {
                write!(f, "Warning: no tools were created for this request")
            }
            Self::SynthesisStarted { count } => {
                write!(f, "Writing source code for {} tool(s)...", count)
            }
            Self::SynthesisCompleted { count } => {
                write!(f, "Finished writing code for {} tool(s)", count)
            }
            Self::PersistenceFailed { message } => {
                write!(f, "Warning: failed to record tools: {}", message)
            }
            Self::CannotProceed => {
                write!(f, "No tools were created, cannot proceed with execution.")
            }
            Self::InvocationStarted => {
                write!(
                    f,
                    "Analyzing your request and determining which tools to use..."
                )
            }
            Self::CallsRequested { count } => {
                write!(
                    f,
                    "I need to execute {} tool(s) to answer your question...",
                    count
                )
            }
            Self::NoCallsRequested => {
                write!(f, "No tools need to be executed for this request.")
            }
            Self::LoadingCapability { name } => write!(f, "Loading tool: {}...", name),
            Self::CapabilityLoaded { name } => write!(f, "Successfully loaded tool: {}", name),
            Self::ExecutingCall { name, index, total } => {
                write!(f, "Executing tool {}/{}: {}...", index, total, name)
            }
            Self::CallCompleted { name } => write!(f, "Tool {} completed successfully", name),
            Self::CallFailed { name, message } => {
                write!(f, "Error executing tool {}: {}", name, message)
            }
            Self::Summarizing => {
                write!(f, "Processing the results and generating final response...")
            }
            Self::FinalAnswer { text } => write!(f, "Final response: {}", text),
            Self::Fatal { phase, message } => {
                write!(f, "Error during {}: {}", phase, message)
            }
        }
    }
}

impl SessionEvent {
    /// Whether this event terminates the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FinalAnswer { .. } | Self::Fatal { .. } | Self::CannotProceed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_creation() {
        let envelope = EventEnvelope::new("sess-1", SessionEvent::PlanningStarted);

        assert!(!envelope.id.is_nil());
        assert_eq!(envelope.session_id, "sess-1");
        assert!(envelope.timestamp <= Utc::now());
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::CapabilityPlanned {
            name: "add_numbers".to_string(),
            description: "adds two numbers".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("capability.planned"));
        assert!(json.contains("add_numbers"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"call.failed","name":"geocode","message":"timeout"}"#;
        let event: SessionEvent = serde_json::from_str(json).unwrap();

        match event {
            SessionEvent::CallFailed { name, message } => {
                assert_eq!(name, "geocode");
                assert_eq!(message, "timeout");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_display_renders_progress_lines() {
        let event = SessionEvent::ExecutingCall {
            name: "add_numbers".to_string(),
            index: 1,
            total: 2,
        };
        assert_eq!(event.to_string(), "Executing tool 1/2: add_numbers...");

        let event = SessionEvent::FinalAnswer {
            text: "The answer is 5".to_string(),
        };
        assert_eq!(event.to_string(), "Final response: The answer is 5");
    }

    #[test]
    fn test_terminal_events() {
        assert!(SessionEvent::CannotProceed.is_terminal());
        assert!(SessionEvent::Fatal {
            phase: "planning".to_string(),
            message: "x".to_string()
        }
        .is_terminal());
        assert!(!SessionEvent::PlanningStarted.is_terminal());
    }
}
