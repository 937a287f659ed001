use crate::error::{DashboardError, Result};
use crate::files::FileLoader;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
pub const DEFAULT_CLICKHOUSE_URL: &str = "http://localhost:8123";
pub const DEFAULT_EVENTS_TABLE: &str = "system.monitoring_events";
pub const DEFAULT_DASHBOARD_TABLE: &str = "system.monitoring_dashboard";
const DEFAULT_MAX_EXECUTION_TIME: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
const DEFAULT_PARALLELISM: usize = 5;

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("table name regex is valid")
});

/// Accepts `table` or `database.table` made of plain identifiers only, so the
/// name can be written into DDL without quoting concerns.
pub fn validate_table_name(name: &str) -> Result<()> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(DashboardError::Config(format!("Invalid table name '{}'", name)))
    }
}

/// One ClickHouse connection. `id` is the position in the configured list
/// and is what `?host=` refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default, skip_deserializing)]
    pub id: usize,
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

fn default_user() -> String {
    "default".to_string()
}

impl HostConfig {
    pub fn new(id: usize, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id,
            name: display_name(&url),
            url,
            user: default_user(),
            password: None,
            database: None,
            timezone: None,
        }
    }
}

/// `https://user@ch-1.internal:8443/` → `ch-1.internal`.
fn display_name(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    host_port
        .split(':')
        .next()
        .filter(|h| !h.is_empty())
        .unwrap_or(url)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub github: bool,
    pub google: bool,
}

impl AuthConfig {
    pub fn providers(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if self.github {
            providers.push("github");
        }
        if self.google {
            providers.push("google");
        }
        providers
    }

    pub fn is_enabled(&self) -> bool {
        self.github || self.google
    }
}

/// Shape of the optional YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub listen: Option<String>,
    pub hosts: Vec<HostConfig>,
    pub queries_dir: Option<PathBuf>,
    pub events_table: Option<String>,
    pub dashboard_table: Option<String>,
    pub max_execution_time: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub parallelism: Option<usize>,
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            FileLoader::load_file(path).map_err(|e| DashboardError::Config(e.to_string()))?;
        let config = serde_yaml::from_str(&file.content)
            .map_err(|e| DashboardError::Config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// `~/.config/chmonitor/config.yaml` when it exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("chmonitor").join("config.yaml"))
            .filter(|path| path.exists())
    }
}

/// Values given on the command line or through their env fallbacks. They
/// win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub queries_dir: Option<PathBuf>,
    pub events_table: Option<String>,
    pub dashboard_table: Option<String>,
    pub max_execution_time: Option<u64>,
    pub parallelism: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub hosts: Vec<HostConfig>,
    pub queries_dir: Option<PathBuf>,
    pub events_table: String,
    pub dashboard_table: String,
    pub max_execution_time: u64,
    pub request_timeout: Duration,
    pub parallelism: usize,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Precedence: overrides (CLI/env) > config file > defaults. Hosts come
    /// from `CLICKHOUSE_*` variables when `CLICKHOUSE_HOST` is set, otherwise
    /// from the file, otherwise a single local server.
    pub fn resolve(
        file: FileConfig,
        overrides: ConfigOverrides,
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let listen_raw = overrides
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_raw.parse().map_err(|_| {
            DashboardError::Config(format!("Invalid listen address '{}'", listen_raw))
        })?;

        let mut hosts = match hosts_from_env(env) {
            Some(hosts) => hosts,
            None if !file.hosts.is_empty() => file.hosts,
            None => vec![HostConfig::new(0, DEFAULT_CLICKHOUSE_URL)],
        };
        for (id, host) in hosts.iter_mut().enumerate() {
            host.id = id;
            if host.name.is_empty() {
                host.name = display_name(&host.url);
            }
        }

        let events_table = overrides
            .events_table
            .or(file.events_table)
            .unwrap_or_else(|| DEFAULT_EVENTS_TABLE.to_string());
        validate_table_name(&events_table)?;

        let dashboard_table = overrides
            .dashboard_table
            .or(file.dashboard_table)
            .unwrap_or_else(|| DEFAULT_DASHBOARD_TABLE.to_string());
        validate_table_name(&dashboard_table)?;

        let auth = AuthConfig {
            github: env.get("AUTH_GITHUB_ID").is_some_and(|v| !v.is_empty()),
            google: env.get("AUTH_GOOGLE_ID").is_some_and(|v| !v.is_empty()),
        };

        Ok(Self {
            listen,
            hosts,
            queries_dir: overrides.queries_dir.or(file.queries_dir),
            events_table,
            dashboard_table,
            max_execution_time: overrides
                .max_execution_time
                .or(file.max_execution_time)
                .unwrap_or(DEFAULT_MAX_EXECUTION_TIME),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            parallelism: overrides
                .parallelism
                .or(file.parallelism)
                .unwrap_or(DEFAULT_PARALLELISM)
                .max(1),
            auth,
        })
    }

    pub fn host(&self, id: usize) -> Result<&HostConfig> {
        self.hosts
            .get(id)
            .ok_or_else(|| DashboardError::HostNotFound(id.to_string()))
    }
}

fn split_list(env: &HashMap<String, String>, key: &str) -> Vec<String> {
    env.get(key)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Pick the i-th entry of a comma list, falling back to the first one so a
/// single user or password can serve every host.
fn pick(list: &[String], i: usize) -> Option<String> {
    list.get(i)
        .or_else(|| list.first())
        .filter(|v| !v.is_empty())
        .cloned()
}

/// Hosts from `CLICKHOUSE_HOST` (comma list of URLs) and the parallel lists
/// `CLICKHOUSE_USER`, `CLICKHOUSE_PASSWORD`, `CLICKHOUSE_NAME`.
pub fn hosts_from_env(env: &HashMap<String, String>) -> Option<Vec<HostConfig>> {
    let urls: Vec<String> = split_list(env, "CLICKHOUSE_HOST")
        .into_iter()
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return None;
    }

    let users = split_list(env, "CLICKHOUSE_USER");
    let passwords = split_list(env, "CLICKHOUSE_PASSWORD");
    let names = split_list(env, "CLICKHOUSE_NAME");
    let database = env.get("CLICKHOUSE_DATABASE").filter(|v| !v.is_empty()).cloned();
    let timezone = env.get("CLICKHOUSE_TZ").filter(|v| !v.is_empty()).cloned();

    let hosts = urls
        .into_iter()
        .enumerate()
        .map(|(i, url)| HostConfig {
            id: i,
            name: names
                .get(i)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| display_name(&url)),
            user: pick(&users, i).unwrap_or_else(default_user),
            password: pick(&passwords, i),
            database: database.clone(),
            timezone: timezone.clone(),
            url,
        })
        .collect();

    Some(hosts)
}
