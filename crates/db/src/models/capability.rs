use chrono::{DateTime, Utc};
use toolbelt_core::CapabilitySpec;
use uuid::Uuid;

use super::session::timestamp_to_datetime;

/// A synthesized capability ready to be recorded in the session store.
#[derive(Debug, Clone)]
pub struct CapabilityRecord {
    pub id: Uuid,
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    /// JSON text of the capability's input schema.
    pub schema: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CapabilityRecord {
    pub fn from_spec(
        spec: &CapabilitySpec,
        source: impl Into<String>,
        session_id: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            source: source.into(),
            schema: spec.parameters.to_string(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}

/// Row of the `capabilities` table. Timestamps are stored as unix
/// seconds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CapabilityRow {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    pub schema: String,
    pub created_by: String,
    pub created_at: i64,
}

impl CapabilityRow {
    pub fn created_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_spec() {
        let spec = CapabilitySpec::new(
            "add_numbers",
            "adds two numbers",
            json!({"type": "object"}),
        );

        let record =
            CapabilityRecord::from_spec(&spec, "def add_numbers(): ...", "sess-1", "user-1");

        assert_eq!(record.name, "add_numbers");
        assert_eq!(record.session_id, "sess-1");
        assert_eq!(record.schema, r#"{"type":"object"}"#);
        assert!(!record.id.is_nil());
    }
}
