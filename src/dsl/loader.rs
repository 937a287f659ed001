use super::builtin::BUILTIN_QUERIES;
use super::dependencies::SqlDependencies;
use super::parser::{title_from_name, QueryConfig, RawQueryConfig};
use super::resolver::ParamResolver;
use crate::error::{DashboardError, Result};
use crate::files::FileLoader;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

pub struct QueryLoader {
    resolver: ParamResolver,
}

impl QueryLoader {
    pub fn new() -> Self {
        Self {
            resolver: ParamResolver::new(),
        }
    }

    /// Loads the report definitions compiled into the binary.
    pub fn load_builtin(&self) -> Result<Vec<QueryConfig>> {
        let configs = BUILTIN_QUERIES
            .iter()
            .map(|(origin, content)| self.load_str(content, origin))
            .collect::<Result<Vec<_>>>()?;
        Self::ensure_unique(&configs, "built-in queries")?;
        Ok(configs)
    }

    pub fn load_dir(&self, path: impl AsRef<Path>) -> Result<Vec<QueryConfig>> {
        let path = path.as_ref();
        let yaml_files = FileLoader::load_dir(path, "yaml")
            .map_err(|e| DashboardError::DslParse(e.to_string()))?;

        let configs = yaml_files
            .iter()
            .map(|file| self.load_str(&file.content, &file.path.display().to_string()))
            .collect::<Result<Vec<_>>>()?;

        debug!(dir = %path.display(), count = configs.len(), "Loaded query configs");
        Self::ensure_unique(&configs, &path.display().to_string())?;
        Ok(configs)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<QueryConfig> {
        let path = path.as_ref();
        let file =
            FileLoader::load_file(path).map_err(|e| DashboardError::DslParse(e.to_string()))?;
        self.load_str(&file.content, &path.display().to_string())
    }

    pub fn load_str(&self, content: &str, origin: &str) -> Result<QueryConfig> {
        let raw: RawQueryConfig = serde_yaml::from_str(content)
            .map_err(|e| DashboardError::DslParse(format!("{}: {}", origin, e)))?;
        self.resolve_config(raw)
    }

    fn resolve_config(&self, raw: RawQueryConfig) -> Result<QueryConfig> {
        if raw.name.trim().is_empty() {
            return Err(DashboardError::DslParse(
                "Query config name must not be empty".to_string(),
            ));
        }

        let default_params = raw
            .default_params
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.resolver.yaml_to_param(key, value)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let placeholders = self.resolver.placeholders(&raw.sql);
        let dependencies = SqlDependencies::extract(&raw.sql).tables;
        let title = raw
            .title
            .clone()
            .unwrap_or_else(|| title_from_name(&raw.name));

        Ok(QueryConfig {
            name: raw.name,
            title,
            description: raw.description,
            kind: raw.kind,
            sql: raw.sql.trim_end().to_string(),
            columns: raw.columns,
            column_formats: raw.column_formats,
            default_params,
            required_params: raw.required_params,
            related_charts: raw.related_charts,
            filters: raw.filters,
            sortable: raw.sortable,
            optional: raw.optional,
            chart: raw.chart,
            refresh_interval: raw.refresh_interval,
            page_size: raw.page_size,
            docs: raw.docs,
            placeholders,
            dependencies,
        })
    }

    fn ensure_unique(configs: &[QueryConfig], source: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for config in configs {
            if !seen.insert(config.name.as_str()) {
                return Err(DashboardError::DslParse(format!(
                    "Duplicate query name '{}' in {}",
                    config.name, source
                )));
            }
        }
        Ok(())
    }
}

impl Default for QueryLoader {
    fn default() -> Self {
        Self::new()
    }
}
