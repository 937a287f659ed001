use crate::config::validate_table_name;
use crate::dsl::QueryParams;
use crate::error::Result;
use crate::executor::Executor;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: String,
    pub actor: String,
    pub data: serde_json::Value,
    /// Left unset, the table default (`now()` on the server) applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,
}

impl Event {
    pub fn page_view(path: &str, host: usize) -> Self {
        Self {
            kind: "PageView".to_string(),
            actor: "anonymous".to_string(),
            data: serde_json::json!({ "path": path, "host": host }),
            event_time: None,
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.event_time = Some(time);
        self
    }
}

/// Page-view and action events, written to a ClickHouse table.
pub struct EventTracker {
    executor: Arc<dyn Executor>,
    table: String,
}

impl EventTracker {
    pub fn new(executor: Arc<dyn Executor>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { executor, table })
    }

    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS {table}
(
    kind LowCardinality(String),
    actor LowCardinality(String),
    data String,
    event_time DateTime DEFAULT now(),
    event_date Date DEFAULT toDate(event_time)
)
ENGINE = MergeTree
PARTITION BY toYYYYMM(event_date)
ORDER BY (event_date, kind, event_time)
TTL event_date + INTERVAL 30 DAY"#,
            table = self.table
        );
        self.executor.execute(&sql, &QueryParams::new()).await?;
        Ok(())
    }

    pub async fn try_record(&self, event: &Event) -> Result<()> {
        let mut params = QueryParams::from([
            ("kind".to_string(), event.kind.clone()),
            ("actor".to_string(), event.actor.clone()),
            ("data".to_string(), serde_json::to_string(&event.data)?),
        ]);
        let sql = match event.event_time {
            Some(time) => {
                params.insert(
                    "event_time".to_string(),
                    time.format("%Y-%m-%d %H:%M:%S").to_string(),
                );
                format!(
                    "INSERT INTO {} (kind, actor, data, event_time) \
                     SELECT {{kind:String}}, {{actor:String}}, {{data:String}}, \
                     {{event_time:DateTime('UTC')}}",
                    self.table
                )
            }
            None => format!(
                "INSERT INTO {} (kind, actor, data) \
                 SELECT {{kind:String}}, {{actor:String}}, {{data:String}}",
                self.table
            ),
        };
        self.executor.execute(&sql, &params).await?;
        debug!(table = %self.table, kind = %event.kind, "Recorded event");
        Ok(())
    }

    /// Records an event; failures are logged and otherwise ignored.
    pub async fn record(&self, event: &Event) {
        if let Err(e) = self.try_record(event).await {
            warn!(table = %self.table, kind = %event.kind, "Failed to record event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FetchError, MockExecutor};
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_record_binds_event() {
        let mock = Arc::new(MockExecutor::new());
        let tracker = EventTracker::new(mock.clone(), "system.monitoring_events").unwrap();

        tracker.record(&Event::page_view("/merges", 1)).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].params.get("kind").map(String::as_str), Some("PageView"));
        assert!(calls[0].params["data"].contains("/merges"));
    }

    #[tokio::test]
    async fn test_record_binds_explicit_event_time() {
        let mock = Arc::new(MockExecutor::new());
        let tracker = EventTracker::new(mock.clone(), "system.monitoring_events").unwrap();
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        tracker.record(&Event::page_view("/merges", 0).at(time)).await;
        tracker.record(&Event::page_view("/merges", 0)).await;

        let calls = mock.calls();
        assert_eq!(
            calls[0].params.get("event_time").map(String::as_str),
            Some("2024-03-09 14:05:07")
        );
        assert!(calls[0].sql.contains("{event_time:DateTime('UTC')}"));
        assert!(!calls[1].params.contains_key("event_time"));
        assert!(!calls[1].sql.contains("event_time"));
    }

    #[test]
    fn test_event_time_omitted_when_unset() {
        let json = serde_json::to_value(Event::page_view("/", 0)).unwrap();
        assert!(json.get("event_time").is_none());
    }

    #[tokio::test]
    async fn test_record_swallows_failures() {
        let mock = Arc::new(MockExecutor::new().failing_with(FetchError::network("refused")));
        let tracker = EventTracker::new(mock, "system.monitoring_events").unwrap();

        tracker.record(&Event::page_view("/", 0)).await;
        assert!(tracker.try_record(&Event::page_view("/", 0)).await.is_err());
    }
}
