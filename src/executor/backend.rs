use super::client::{ClickHouseClient, ClientSettings};
use super::fetch::FetchError;
use super::mock::MockExecutor;
use super::result::QueryResult;
use crate::config::HostConfig;
use crate::dsl::QueryParams;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorMode {
    Mock,
    ClickHouse,
}

/// Runs SQL against one host. Parameters are always bound by the server,
/// never spliced into the SQL text.
#[async_trait]
pub trait Executor: Send + Sync {
    fn mode(&self) -> ExecutorMode;

    async fn query(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, FetchError>;

    /// Statements without a result set (DDL, INSERT ... SELECT).
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<(), FetchError>;
}

pub fn create_clickhouse_executor(
    host: &HostConfig,
    settings: &ClientSettings,
) -> Result<Arc<dyn Executor>, FetchError> {
    Ok(Arc::new(ClickHouseClient::new(host, settings)?))
}

pub fn create_mock_executor() -> Arc<MockExecutor> {
    Arc::new(MockExecutor::new())
}
