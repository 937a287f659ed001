pub mod config;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod files;
pub mod menu;
pub mod render;
pub mod server;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigOverrides, FileConfig, HostConfig};
pub use dsl::{
    ChartDef, ChartType, ColumnFormat, FilterPreset, QueryConfig, QueryKind, QueryLoader,
    QueryRegistry, QueryValidator, SqlDependencies, ValidationResult,
};
pub use error::{DashboardError, Result};
pub use executor::{
    create_clickhouse_executor, create_mock_executor, ClickHouseClient, Executor, ExecutorMode,
    FetchError, FetchErrorKind, MockExecutor, QueryResult, ReportOptions, Runner,
};
pub use menu::{Menu, MenuItem};
pub use server::{router, serve, AppState, SharedState};
pub use store::{DashboardChart, DashboardStore, Event, EventTracker};
