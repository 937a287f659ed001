use super::loader::QueryLoader;
use super::parser::QueryConfig;
use super::validator::{QueryValidator, ValidationResult};
use crate::error::{DashboardError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Immutable catalog of report definitions, indexed by name.
#[derive(Debug, Clone)]
pub struct QueryRegistry {
    configs: Vec<QueryConfig>,
    index: HashMap<String, usize>,
}

impl QueryRegistry {
    pub fn new(configs: Vec<QueryConfig>) -> Result<Self> {
        let mut index = HashMap::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            if index.insert(config.name.clone(), i).is_some() {
                return Err(DashboardError::Validation(format!(
                    "Duplicate query name '{}'",
                    config.name
                )));
            }
        }
        Ok(Self { configs, index })
    }

    /// Built-in reports, replaced or extended by the YAML files under
    /// `overrides_dir` when given. The merged catalog must validate.
    pub fn load(overrides_dir: Option<&Path>) -> Result<Self> {
        let loader = QueryLoader::new();
        let mut configs = loader.load_builtin()?;

        if let Some(dir) = overrides_dir {
            for custom in loader.load_dir(dir)? {
                match configs.iter_mut().find(|c| c.name == custom.name) {
                    Some(existing) => {
                        info!(query = %custom.name, "Overriding built-in query");
                        *existing = custom;
                    }
                    None => configs.push(custom),
                }
            }
        }

        let registry = Self::new(configs)?;
        let result = registry.validate();
        for warning in &result.warnings {
            warn!(query = %warning.query, "{}", warning.message);
        }
        if !result.is_valid() {
            let messages: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
            return Err(DashboardError::Validation(messages.join("; ")));
        }

        info!(
            queries = registry.len(),
            checksum = %registry.checksum(),
            "Query registry loaded"
        );
        Ok(registry)
    }

    pub fn builtin() -> Result<Self> {
        Self::load(None)
    }

    pub fn validate(&self) -> ValidationResult {
        QueryValidator::new(&self.configs).validate_all(&self.configs)
    }

    pub fn get(&self, name: &str) -> Result<&QueryConfig> {
        self.find(name)
            .ok_or_else(|| DashboardError::QueryNotFound(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&QueryConfig> {
        self.index.get(name).map(|&i| &self.configs[i])
    }

    pub fn list(&self) -> &[QueryConfig] {
        &self.configs
    }

    pub fn tables(&self) -> impl Iterator<Item = &QueryConfig> {
        self.configs.iter().filter(|c| !c.is_chart())
    }

    pub fn charts(&self) -> impl Iterator<Item = &QueryConfig> {
        self.configs.iter().filter(|c| c.is_chart())
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// SHA-256 over every config's name and SQL, in name order. Changes
    /// whenever a report's SQL changes.
    pub fn checksum(&self) -> String {
        let mut names: Vec<&String> = self.index.keys().collect();
        names.sort();

        let mut hasher = Sha256::new();
        for name in names {
            let config = &self.configs[self.index[name]];
            hasher.update(config.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(config.sql.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_known_and_unknown() {
        let registry = QueryRegistry::builtin().unwrap();
        assert_eq!(registry.get("merges").unwrap().title, "Merges");
        assert!(matches!(
            registry.get("no-such-report"),
            Err(DashboardError::QueryNotFound(name)) if name == "no-such-report"
        ));
    }

    #[test]
    fn test_tables_and_charts_partition_registry() {
        let registry = QueryRegistry::builtin().unwrap();
        let tables = registry.tables().count();
        let charts = registry.charts().count();
        assert!(charts > 0);
        assert_eq!(tables + charts, registry.len());
    }

    #[test]
    fn test_override_replaces_builtin() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("disks.yaml"),
            "name: disks\ntitle: Storage\nsql: SELECT name FROM system.disks\ncolumns: [name]\n",
        )
        .unwrap();

        let builtin = QueryRegistry::builtin().unwrap();
        let registry = QueryRegistry::load(Some(dir.path())).unwrap();

        assert_eq!(registry.len(), builtin.len());
        assert_eq!(registry.get("disks").unwrap().title, "Storage");
        assert_ne!(registry.checksum(), builtin.checksum());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("bad.yaml"),
            "name: bad\nsql: SELECT a FROM system.one\ncolumns: [a]\nrelated_charts: [nope]\n",
        )
        .unwrap();

        let err = QueryRegistry::load(Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_checksum_is_stable() {
        let a = QueryRegistry::builtin().unwrap();
        let b = QueryRegistry::builtin().unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 16);
    }
}
