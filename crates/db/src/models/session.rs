use chrono::{DateTime, TimeZone, Utc};

/// Row of the `sessions` table.
///
/// `log` holds the run's progress-event sequence as a JSON array of
/// strings; `current_query` is the request the session last worked on.
/// Timestamps are stored as unix seconds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub current_query: Option<String>,
    pub log: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SessionRow {
    /// Deserialize the stored event log, if any.
    pub fn events(&self) -> Vec<String> {
        self.log
            .as_deref()
            .and_then(|log| serde_json::from_str(log).ok())
            .unwrap_or_default()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.created_at)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        timestamp_to_datetime(self.updated_at)
    }
}

pub(crate) fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).unwrap()
}

pub(crate) fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(log: Option<&str>) -> SessionRow {
        SessionRow {
            id: "sess-1".to_string(),
            user_id: "user-1".to_string(),
            current_query: None,
            log: log.map(String::from),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_events_parses_log() {
        let row = row(Some(r#"["a","b"]"#));
        assert_eq!(row.events(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_events_empty_when_missing_or_invalid() {
        assert!(row(None).events().is_empty());
        assert!(row(Some("not json")).events().is_empty());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let ts = datetime_to_timestamp(now);
        assert_eq!(timestamp_to_datetime(ts).timestamp(), now.timestamp());
    }
}
