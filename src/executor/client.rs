use super::backend::{Executor, ExecutorMode};
use super::fetch::{FetchError, FetchErrorKind};
use super::result::{JsonResponse, QueryResult};
use crate::config::HostConfig;
use crate::dsl::QueryParams;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Server-side `max_execution_time`, in seconds.
    pub max_execution_time: u64,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_execution_time: 60,
            request_timeout: Duration::from_secs(90),
        }
    }
}

/// ClickHouse over its HTTP interface. Every request carries a fresh
/// `query_id` so failures can be matched with `system.query_log`.
pub struct ClickHouseClient {
    http: reqwest::Client,
    url: String,
    user: String,
    password: Option<String>,
    database: Option<String>,
    max_execution_time: u64,
}

impl ClickHouseClient {
    pub fn new(host: &HostConfig, settings: &ClientSettings) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: host.url.clone(),
            user: host.user.clone(),
            password: host.password.clone(),
            database: host.database.clone(),
            max_execution_time: settings.max_execution_time,
        })
    }

    fn url_params(&self, query_id: &str, params: &QueryParams) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("query_id".to_string(), query_id.to_string()),
            ("default_format".to_string(), "JSON".to_string()),
            (
                "max_execution_time".to_string(),
                self.max_execution_time.to_string(),
            ),
            (
                "output_format_json_quote_64bit_integers".to_string(),
                "0".to_string(),
            ),
            ("date_time_output_format".to_string(), "iso".to_string()),
        ];
        if let Some(database) = &self.database {
            pairs.push(("database".to_string(), database.clone()));
        }
        for (name, value) in params {
            pairs.push((format!("param_{}", name), value.clone()));
        }
        pairs
    }

    async fn send(
        &self,
        sql: &str,
        params: &QueryParams,
        query_id: &str,
    ) -> Result<reqwest::Response, FetchError> {
        debug!(query_id, url = %self.url, params = params.len(), "Sending query");

        let response = self
            .http
            .post(&self.url)
            .query(&self.url_params(query_id, params))
            .basic_auth(&self.user, self.password.as_deref())
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| transport_error(e).with_query_id(query_id))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(FetchError::from_server(status.as_u16(), &body).with_query_id(query_id))
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    let kind = if e.is_timeout() {
        FetchErrorKind::Timeout
    } else {
        FetchErrorKind::Network
    };
    FetchError::new(kind, e.to_string())
}

#[async_trait]
impl Executor for ClickHouseClient {
    fn mode(&self) -> ExecutorMode {
        ExecutorMode::ClickHouse
    }

    async fn query(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, FetchError> {
        let query_id = Uuid::new_v4().to_string();
        let response = self.send(sql, params, &query_id).await?;

        let body: JsonResponse = response.json().await.map_err(|e| {
            FetchError::new(
                FetchErrorKind::Query,
                format!("Unexpected response body: {}", e),
            )
            .with_query_id(query_id.as_str())
        })?;

        Ok(QueryResult {
            query_id,
            columns: body.meta,
            rows: body.data,
            statistics: body.statistics,
        })
    }

    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<(), FetchError> {
        let query_id = Uuid::new_v4().to_string();
        self.send(sql, params, &query_id).await?;
        Ok(())
    }
}
