mod backend;
mod client;
mod fetch;
mod mock;
mod result;
mod runner;
mod sql_builder;

pub use backend::{create_clickhouse_executor, create_mock_executor, Executor, ExecutorMode};
pub use client::{ClickHouseClient, ClientSettings};
pub use fetch::{fetch_data, FetchError, FetchErrorKind, FetchRequest};
pub use mock::{MockExecutor, RecordedCall};
pub use result::{ColumnInfo, QueryResult, QueryStatistics, Row};
pub use runner::{ChartData, FetchOutcome, ReportData, Runner, DEFAULT_PAGE_SIZE};
pub use sql_builder::{build_report_sql, ReportOptions, SortSpec, LIMIT_PARAM, OFFSET_PARAM};
