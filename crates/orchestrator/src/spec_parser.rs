//! Extraction of capability specifications and call requests from model
//! responses.
//!
//! Kept separate from the model-call wrapper so the parsing rules can be
//! tested directly. Malformed candidates are skipped with a warning; one
//! bad entry never aborts the others.

use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use llm::ResponseItem;
use toolbelt_core::{CallRequest, CapabilitySpec};

/// Marker pair delimiting a JSON tool definition in free-form text.
pub const SPEC_OPEN: &str = "<<<TOOL_SPEC>>>";
pub const SPEC_CLOSE: &str = "<<<END_TOOL_SPEC>>>";

/// Name of the structured definition function offered to the planner.
pub const CREATE_TOOL_FN: &str = "create_tool";

/// Extract capability specifications from a planning response.
///
/// Recognizes both `create_tool` function calls and marker-delimited JSON
/// in message text. Duplicates are resolved by name: the last definition
/// wins, keeping the position of the first occurrence.
pub fn extract_specs(items: &[ResponseItem]) -> Vec<CapabilitySpec> {
    let mut specs = Vec::new();

    for item in items {
        match item {
            ResponseItem::FunctionCall {
                name, arguments, ..
            } if name == CREATE_TOOL_FN => match spec_from_call_arguments(arguments) {
                Some(spec) => specs.push(spec),
                None => warn!("Skipping malformed create_tool definition"),
            },
            ResponseItem::Message { content, .. } => {
                let text: String = content.iter().map(|c| c.text.as_str()).collect();
                specs.extend(extract_marker_specs(&text));
            }
            _ => {}
        }
    }

    dedup_specs(specs)
}

/// Extract specifications delimited by the marker pair in free text.
/// Each match is parsed independently; invalid JSON is skipped.
pub fn extract_marker_specs(text: &str) -> Vec<CapabilitySpec> {
    let pattern = Regex::new(r"(?s)<<<TOOL_SPEC>>>(.*?)<<<END_TOOL_SPEC>>>")
        .expect("Invalid tool spec regex pattern");

    let mut specs = Vec::new();

    for caps in pattern.captures_iter(text) {
        let body = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");

        match serde_json::from_str::<Value>(body) {
            Ok(value) => match spec_from_value(&value) {
                Some(spec) => specs.push(spec),
                None => warn!("Tool spec block is missing required fields; skipping"),
            },
            Err(e) => warn!(error = %e, "Invalid JSON in tool spec block; skipping"),
        }
    }

    specs
}

/// Extract call requests from an invocation response. Calls whose
/// arguments are not a valid JSON object are skipped with a warning.
pub fn extract_calls(items: &[ResponseItem]) -> Vec<CallRequest> {
    let mut calls = Vec::new();

    for item in items {
        if let ResponseItem::FunctionCall {
            name,
            arguments,
            call_id,
        } = item
        {
            match serde_json::from_str::<Value>(arguments) {
                Ok(args) => calls.push(CallRequest {
                    name: name.clone(),
                    call_id: call_id.clone(),
                    arguments: args,
                }),
                Err(e) => {
                    warn!(tool = %name, error = %e, "Skipping call with undecodable arguments")
                }
            }
        }
    }

    calls
}

/// Last definition per name wins; the survivor keeps the position of the
/// first occurrence so downstream reporting order stays stable.
pub fn dedup_specs(specs: Vec<CapabilitySpec>) -> Vec<CapabilitySpec> {
    let mut out: Vec<CapabilitySpec> = Vec::new();

    for spec in specs {
        if let Some(existing) = out.iter_mut().find(|s| s.name == spec.name) {
            *existing = spec;
        } else {
            out.push(spec);
        }
    }

    out
}

fn spec_from_call_arguments(arguments: &str) -> Option<CapabilitySpec> {
    let args: Value = serde_json::from_str(arguments).ok()?;
    let schema_text = args.get("tool_json_schema")?.as_str()?;
    let schema: Value = serde_json::from_str(schema_text).ok()?;
    spec_from_value(&schema)
}

fn spec_from_value(value: &Value) -> Option<CapabilitySpec> {
    let name = value.get("name")?.as_str()?.to_string();

    if CapabilitySpec::validate_name(&name).is_err() {
        warn!(name = %name, "Tool definition has an invalid name; skipping");
        return None;
    }

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let parameters = value
        .get("parameters")
        .cloned()
        .unwrap_or_else(|| json!({"type": "object", "properties": {}}));

    Some(CapabilitySpec {
        name,
        description,
        parameters,
    })
}
