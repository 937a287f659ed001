use super::backend::Executor;
use super::fetch::{fetch_data, FetchError, FetchErrorKind, FetchRequest};
use super::result::QueryResult;
use super::sql_builder::{build_report_sql, ReportOptions};
use crate::dsl::{ParamResolver, QueryConfig, QueryParams, QueryRegistry};
use crate::error::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_PAGE_SIZE: u64 = 100;

fn default_parallelism() -> usize {
    std::env::var("CHMONITOR_PARALLELISM")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5)
}

pub type FetchOutcome = std::result::Result<QueryResult, FetchError>;

#[derive(Debug, Clone)]
pub struct ReportData {
    pub name: String,
    pub params: QueryParams,
    pub sql: String,
    pub outcome: FetchOutcome,
    pub page: u64,
    pub page_size: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct ChartData {
    pub name: String,
    pub title: String,
    pub outcome: FetchOutcome,
}

pub struct Runner {
    executor: Arc<dyn Executor>,
    resolver: ParamResolver,
    parallelism: usize,
}

impl Runner {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            resolver: ParamResolver::new(),
            parallelism: default_parallelism(),
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Runs one report page. Parameter and page-state problems are errors;
    /// anything the server reports lands in `ReportData::outcome`.
    pub async fn run_report(
        &self,
        config: &QueryConfig,
        request: &HashMap<String, String>,
        options: &ReportOptions,
    ) -> Result<ReportData> {
        let mut params = self.resolver.resolve(config, request)?;
        let mut options = options.clone();
        if options.page_size == 0 && !config.is_chart() {
            options.page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        }
        let sql = build_report_sql(config, &options, &mut params)?;

        info!(query = %config.name, page = options.page.max(1), "Running report");
        let outcome = fetch_data(self.executor.as_ref(), FetchRequest::new(&sql, &params)).await;
        let mut outcome = Self::soften_missing_table(config, outcome);

        let mut has_more = false;
        if let Ok(result) = &mut outcome {
            if options.page_size > 0 && result.rows.len() as u64 > options.page_size {
                result.rows.truncate(options.page_size as usize);
                has_more = true;
            }
        }

        Ok(ReportData {
            name: config.name.clone(),
            params,
            sql,
            outcome,
            page: options.page.max(1),
            page_size: options.page_size,
            has_more,
        })
    }

    /// Runs a report page together with its related charts.
    pub async fn run_report_with_charts(
        &self,
        registry: &QueryRegistry,
        config: &QueryConfig,
        request: &HashMap<String, String>,
        options: &ReportOptions,
    ) -> Result<(ReportData, Vec<ChartData>)> {
        let (report, charts) = futures::join!(
            self.run_report(config, request, options),
            self.run_charts(registry, &config.related_charts, request)
        );
        Ok((report?, charts))
    }

    /// Runs a chart query; charts with no rows report `no_data`.
    pub async fn run_chart(
        &self,
        config: &QueryConfig,
        request: &HashMap<String, String>,
    ) -> Result<ChartData> {
        let params = self.resolver.resolve(config, request)?;
        let request = FetchRequest::new(&config.sql, &params).require_rows();
        let outcome = fetch_data(self.executor.as_ref(), request).await;

        Ok(ChartData {
            name: config.name.clone(),
            title: config.title.clone(),
            outcome: Self::soften_missing_table(config, outcome),
        })
    }

    /// Runs the named charts concurrently and returns them in the given
    /// order. Unknown names and parameter errors become failed charts.
    pub async fn run_charts(
        &self,
        registry: &QueryRegistry,
        names: &[String],
        request: &HashMap<String, String>,
    ) -> Vec<ChartData> {
        let jobs: Vec<(usize, String)> = names.iter().cloned().enumerate().collect();
        let mut results: Vec<(usize, ChartData)> = stream::iter(jobs)
            .map(|(idx, name)| async move {
                let chart = match registry.get(&name) {
                    Ok(config) => self.run_chart(config, request).await,
                    Err(e) => Err(e),
                };
                let chart = chart.unwrap_or_else(|e| ChartData {
                    title: name.clone(),
                    name,
                    outcome: Err(FetchError::new(FetchErrorKind::Query, e.to_string())),
                });
                (idx, chart)
            })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, chart)| chart).collect()
    }

    /// Optional reports read tables that only exist with some server
    /// configurations; their absence is reported as `no_data`.
    fn soften_missing_table(config: &QueryConfig, outcome: FetchOutcome) -> FetchOutcome {
        match outcome {
            Err(e) if config.optional && e.kind == FetchErrorKind::TableMissing => {
                let tables: Vec<&str> = config.dependencies.iter().map(String::as_str).collect();
                let mut softened = FetchError::no_data(format!(
                    "{} is not available on this server",
                    tables.join(", ")
                ));
                softened.code = e.code;
                softened.query_id = e.query_id;
                Err(softened)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;

    fn runner(mock: MockExecutor) -> (Runner, Arc<MockExecutor>) {
        let mock = Arc::new(mock);
        (Runner::new(mock.clone()).with_parallelism(2), mock)
    }

    fn rows(n: usize) -> String {
        let items: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"name": "d{}", "free_space": {}}}"#, i, i))
            .collect();
        format!("[{}]", items.join(","))
    }

    #[tokio::test]
    async fn test_run_report_paginates() {
        let registry = QueryRegistry::builtin().unwrap();
        let (runner, _) = runner(MockExecutor::new().with_json_rows("system.disks", &rows(3)));
        let options = ReportOptions {
            page_size: 2,
            ..Default::default()
        };

        let data = runner
            .run_report(registry.get("disks").unwrap(), &HashMap::new(), &options)
            .await
            .unwrap();

        assert!(data.has_more);
        assert_eq!(data.outcome.unwrap().rows.len(), 2);
        assert_eq!(data.params.get("page_limit").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_run_report_binds_request_params() {
        let registry = QueryRegistry::builtin().unwrap();
        let (runner, mock) = runner(MockExecutor::new());
        let request = HashMap::from([("last_hours".to_string(), "6".to_string())]);

        runner
            .run_report(
                registry.get("history-queries").unwrap(),
                &request,
                &ReportOptions::default(),
            )
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].params.get("last_hours").map(String::as_str), Some("6"));
        assert!(!calls[0].sql.contains("'6'"));
    }

    #[tokio::test]
    async fn test_optional_missing_table_is_no_data() {
        let registry = QueryRegistry::builtin().unwrap();
        let (runner, _) = runner(MockExecutor::new().with_error(
            "system.backup_log",
            FetchError::from_server(404, "Code: 60. DB::Exception: Table doesn't exist"),
        ));

        let data = runner
            .run_report(
                registry.get("backups").unwrap(),
                &HashMap::new(),
                &ReportOptions::default(),
            )
            .await
            .unwrap();

        let err = data.outcome.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NoData);
        assert!(err.message.contains("system.backup_log"));
    }

    #[tokio::test]
    async fn test_run_charts_keeps_order_and_reports_empty() {
        let registry = QueryRegistry::builtin().unwrap();
        let (runner, _) = runner(MockExecutor::new().with_json_rows(
            "max(memory_usage) AS max_memory",
            r#"[{"event_time": "2024-01-01 00:00:00", "max_memory": 10}]"#,
        ));
        let names = vec![
            "query-count".to_string(),
            "query-memory".to_string(),
            "missing-chart".to_string(),
        ];

        let charts = runner.run_charts(&registry, &names, &HashMap::new()).await;

        assert_eq!(charts.len(), 3);
        assert_eq!(charts[0].name, "query-count");
        assert_eq!(
            charts[0].outcome.as_ref().unwrap_err().kind,
            FetchErrorKind::NoData
        );
        assert!(charts[1].outcome.is_ok());
        assert!(charts[2].outcome.is_err());
    }
}
