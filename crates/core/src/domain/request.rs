use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request payload that starts a toolbelt session run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRequest {
    /// The natural-language request to answer.
    pub user_query: String,
    /// Externally supplied session identifier.
    pub session_id: String,
    /// Identifier of the originating user.
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_request() {
        let json = r#"{
            "user_query": "How long would it take to walk from NYC to LA?",
            "session_id": "sess-1",
            "user_id": "user-1"
        }"#;

        let request: SessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.session_id, "sess-1");
        assert!(request.user_query.contains("NYC"));
    }
}
