use super::backend::{Executor, ExecutorMode};
use super::fetch::FetchError;
use super::result::{QueryResult, Row};
use crate::dsl::QueryParams;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum MockResponse {
    Rows(Vec<Row>),
    Error(FetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub params: QueryParams,
}

/// In-memory executor. Responses are matched by the first registered SQL
/// fragment the statement contains; unmatched statements return no rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<Vec<(String, MockResponse)>>,
    fallback: Mutex<Option<FetchError>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, sql_fragment: &str, rows: Vec<Row>) -> Self {
        self.push(sql_fragment, MockResponse::Rows(rows));
        self
    }

    pub fn with_json_rows(self, sql_fragment: &str, json: &str) -> Self {
        let rows: Vec<Row> = serde_json::from_str(json).unwrap_or_default();
        self.with_rows(sql_fragment, rows)
    }

    pub fn with_error(self, sql_fragment: &str, error: FetchError) -> Self {
        self.push(sql_fragment, MockResponse::Error(error));
        self
    }

    /// Every unmatched statement fails with `error`, e.g. a network error to
    /// simulate an unreachable server.
    pub fn failing_with(self, error: FetchError) -> Self {
        if let Ok(mut fallback) = self.fallback.lock() {
            *fallback = Some(error);
        }
        self
    }

    fn push(&self, sql_fragment: &str, response: MockResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push((sql_fragment.to_string(), response));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn respond(&self, sql: &str, params: &QueryParams) -> Result<Vec<Row>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                sql: sql.to_string(),
                params: params.clone(),
            });
        }

        let matched = self.responses.lock().ok().and_then(|responses| {
            responses
                .iter()
                .find(|(fragment, _)| sql.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
        });

        match matched {
            Some(MockResponse::Rows(rows)) => Ok(rows),
            Some(MockResponse::Error(error)) => Err(error),
            None => match self.fallback.lock().ok().and_then(|f| f.clone()) {
                Some(error) => Err(error),
                None => Ok(Vec::new()),
            },
        }
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Mock
    }

    async fn query(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, FetchError> {
        let rows = self.respond(sql, params)?;
        let mut result = QueryResult::from_rows(rows);
        result.query_id = "mock".to_string();
        Ok(result)
    }

    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<(), FetchError> {
        self.respond(sql, params).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::fetch::FetchErrorKind;

    #[test]
    fn test_matches_first_fragment() {
        let executor = MockExecutor::new()
            .with_json_rows("system.disks", r#"[{"name": "default"}]"#)
            .with_error(
                "system.backup_log",
                FetchError::new(FetchErrorKind::TableMissing, "missing"),
            );

        let result = tokio_test::block_on(
            executor.query("SELECT name FROM system.disks", &QueryParams::new()),
        )
        .unwrap();
        assert_eq!(result.rows[0]["name"], "default");

        let err = tokio_test::block_on(
            executor.query("SELECT * FROM system.backup_log", &QueryParams::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::TableMissing);
        assert_eq!(executor.calls().len(), 2);
    }

    #[test]
    fn test_fallback_error() {
        let executor = MockExecutor::new().failing_with(FetchError::network("refused"));
        let err = tokio_test::block_on(executor.execute("SELECT 1", &QueryParams::new()))
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Network);
    }
}
