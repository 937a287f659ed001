use crate::config::validate_table_name;
use crate::dsl::QueryParams;
use crate::error::{DashboardError, Result};
use crate::executor::{fetch_data, Executor, FetchRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// A saved chart on the custom dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardChart {
    pub title: String,
    pub sql: String,
    #[serde(default)]
    pub ordering: u32,
}

/// Custom dashboard charts, kept in a ClickHouse table of the host they are
/// shown on.
pub struct DashboardStore {
    executor: Arc<dyn Executor>,
    table: String,
}

impl DashboardStore {
    pub fn new(executor: Arc<dyn Executor>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { executor, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS {table}
(
    title String,
    sql String,
    ordering UInt32,
    updated_at DateTime DEFAULT now()
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY title"#,
            table = self.table
        );
        self.executor.execute(&sql, &QueryParams::new()).await?;
        info!(table = %self.table, "Dashboard table ready");
        Ok(())
    }

    pub async fn list_charts(&self) -> Result<Vec<DashboardChart>> {
        let sql = format!(
            "SELECT title, sql, ordering FROM {} FINAL ORDER BY ordering, title",
            self.table
        );
        let params = QueryParams::new();
        let result = fetch_data(self.executor.as_ref(), FetchRequest::new(&sql, &params)).await?;

        result
            .rows
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(DashboardError::from))
            .collect()
    }

    /// Saves a chart; a chart with the same title is replaced.
    pub async fn add_chart(&self, chart: &DashboardChart) -> Result<()> {
        if chart.title.trim().is_empty() {
            return Err(DashboardError::InvalidParam("title must not be empty".to_string()));
        }
        if chart.sql.trim().is_empty() {
            return Err(DashboardError::InvalidParam("sql must not be empty".to_string()));
        }

        let sql = format!(
            "INSERT INTO {} (title, sql, ordering) \
             SELECT {{title:String}}, {{sql:String}}, {{ordering:UInt32}}",
            self.table
        );
        let params = QueryParams::from([
            ("title".to_string(), chart.title.clone()),
            ("sql".to_string(), chart.sql.clone()),
            ("ordering".to_string(), chart.ordering.to_string()),
        ]);
        self.executor.execute(&sql, &params).await?;
        info!(table = %self.table, title = %chart.title, "Saved dashboard chart");
        Ok(())
    }

    pub async fn remove_chart(&self, title: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE title = {{title:String}}", self.table);
        let params = QueryParams::from([("title".to_string(), title.to_string())]);
        self.executor.execute(&sql, &params).await?;
        info!(table = %self.table, title, "Removed dashboard chart");
        Ok(())
    }
}
