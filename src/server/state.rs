use crate::config::{AppConfig, HostConfig};
use crate::dsl::QueryRegistry;
use crate::error::{DashboardError, Result};
use crate::executor::{create_clickhouse_executor, ClientSettings, Executor, Runner};
use crate::menu::Menu;
use crate::store::{DashboardStore, EventTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything scoped to one configured ClickHouse server.
pub struct HostHandle {
    pub config: HostConfig,
    pub executor: Arc<dyn Executor>,
    pub dashboard: DashboardStore,
    pub events: EventTracker,
}

/// Shared, read-only state behind every request.
pub struct AppState {
    pub registry: QueryRegistry,
    pub menu: Menu,
    pub config: AppConfig,
    hosts: Vec<HostHandle>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// One HTTP client (and connection pool) per configured host.
    pub fn new(config: AppConfig, registry: QueryRegistry) -> Result<Self> {
        let settings = ClientSettings {
            max_execution_time: config.max_execution_time,
            request_timeout: config.request_timeout,
        };
        let executors = config
            .hosts
            .iter()
            .map(|host| create_clickhouse_executor(host, &settings))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::with_executors(config, registry, executors)
    }

    /// `executors[i]` serves `config.hosts[i]`.
    pub fn with_executors(
        config: AppConfig,
        registry: QueryRegistry,
        executors: Vec<Arc<dyn Executor>>,
    ) -> Result<Self> {
        if executors.len() != config.hosts.len() {
            return Err(DashboardError::Config(format!(
                "{} executors for {} hosts",
                executors.len(),
                config.hosts.len()
            )));
        }

        let hosts = config
            .hosts
            .iter()
            .cloned()
            .zip(executors)
            .map(|(host, executor)| -> Result<HostHandle> {
                Ok(HostHandle {
                    dashboard: DashboardStore::new(executor.clone(), &config.dashboard_table)?,
                    events: EventTracker::new(executor.clone(), &config.events_table)?,
                    config: host,
                    executor,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            registry,
            menu: Menu::builtin()?,
            config,
            hosts,
        })
    }

    pub fn host(&self, id: usize) -> Result<&HostHandle> {
        self.hosts
            .get(id)
            .ok_or_else(|| DashboardError::HostNotFound(id.to_string()))
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn runner(&self, id: usize) -> Result<Runner> {
        let host = self.host(id)?;
        Ok(Runner::new(host.executor.clone()).with_parallelism(self.config.parallelism))
    }

    /// Creates the dashboard and events tables on every host. A host that
    /// is down at startup only loses these features until the next start.
    pub async fn prepare_stores(&self) {
        for host in &self.hosts {
            for (table, outcome) in [
                (host.dashboard.table(), host.dashboard.ensure_table().await),
                (self.config.events_table.as_str(), host.events.ensure_table().await),
            ] {
                match outcome {
                    Ok(()) => info!(host = %host.config.name, table, "Table ready"),
                    Err(e) => warn!(host = %host.config.name, table, "Cannot create table: {}", e),
                }
            }
        }
    }
}
