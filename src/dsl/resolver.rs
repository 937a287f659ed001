use super::parser::{Placeholder, QueryConfig};
use crate::error::{DashboardError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([A-Za-z][A-Za-z0-9_(), ']*?)\s*\}")
        .expect("placeholder pattern regex is valid")
});

/// URL keys that drive page state and are never bound as SQL parameters.
pub const RESERVED_KEYS: &[&str] = &["host", "page", "filter", "sort", "order", "refresh"];

/// Parameter values bound to a query, keyed by placeholder name.
pub type QueryParams = BTreeMap<String, String>;

pub struct ParamResolver;

impl ParamResolver {
    pub fn new() -> Self {
        Self
    }

    /// Placeholders in order of first appearance, without duplicates.
    pub fn placeholders(&self, sql: &str) -> Vec<Placeholder> {
        let mut found: Vec<Placeholder> = Vec::new();
        for caps in PLACEHOLDER_PATTERN.captures_iter(sql) {
            let name = &caps[1];
            if found.iter().any(|p| p.name == name) {
                continue;
            }
            found.push(Placeholder {
                name: name.to_string(),
                param_type: caps[2].to_string(),
            });
        }
        found
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        RESERVED_KEYS.contains(&key)
    }

    /// Merges the config's defaults with request values. Only keys that name
    /// a placeholder of the config's SQL are taken from the request; reserved
    /// page-state keys are skipped even when a placeholder shares the name.
    pub fn resolve(
        &self,
        config: &QueryConfig,
        request: &HashMap<String, String>,
    ) -> Result<QueryParams> {
        let mut params = QueryParams::new();

        for placeholder in &config.placeholders {
            let name = placeholder.name.as_str();
            let from_request = if self.is_reserved(name) {
                None
            } else {
                request.get(name)
            };

            match from_request.or_else(|| config.default_params.get(name)) {
                Some(value) => {
                    params.insert(name.to_string(), value.clone());
                }
                None => {
                    return Err(DashboardError::MissingParam {
                        query: config.name.clone(),
                        param: name.to_string(),
                    })
                }
            }
        }

        Ok(params)
    }

    pub fn yaml_to_param(&self, key: &str, value: &serde_yaml::Value) -> Result<String> {
        match value {
            serde_yaml::Value::String(s) => Ok(s.clone()),
            serde_yaml::Value::Number(n) => Ok(n.to_string()),
            serde_yaml::Value::Bool(b) => Ok(b.to_string()),
            serde_yaml::Value::Null => Ok(String::new()),
            _ => Err(DashboardError::DslParse(format!(
                "Default parameter '{}' must be a scalar",
                key
            ))),
        }
    }
}

impl Default for ParamResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parser::{QueryKind, QueryConfig};
    use std::collections::BTreeSet;

    fn config_with_sql(sql: &str, defaults: &[(&str, &str)]) -> QueryConfig {
        let resolver = ParamResolver::new();
        QueryConfig {
            name: "test".to_string(),
            title: "Test".to_string(),
            description: None,
            kind: QueryKind::Table,
            sql: sql.to_string(),
            columns: vec![],
            column_formats: BTreeMap::new(),
            default_params: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            required_params: vec![],
            related_charts: vec![],
            filters: vec![],
            sortable: true,
            optional: false,
            chart: None,
            refresh_interval: None,
            page_size: None,
            docs: None,
            placeholders: resolver.placeholders(sql),
            dependencies: BTreeSet::new(),
        }
    }

    #[test]
    fn test_placeholders_deduplicated_in_order() {
        let resolver = ParamResolver::new();
        let sql = "SELECT * FROM t WHERE d >= {last_hours:UInt32} AND x = {db:String} \
                   AND e >= {last_hours:UInt32}";
        let found = resolver.placeholders(sql);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "last_hours");
        assert_eq!(found[0].param_type, "UInt32");
        assert_eq!(found[1].name, "db");
    }

    #[test]
    fn test_placeholders_with_parametric_types() {
        let resolver = ParamResolver::new();
        let found = resolver.placeholders("SELECT {ids: Array(UInt64)}, {d:DateTime64(3)}");
        assert_eq!(found[0].param_type, "Array(UInt64)");
        assert_eq!(found[1].param_type, "DateTime64(3)");
    }

    #[test]
    fn test_map_literals_are_not_placeholders() {
        let resolver = ParamResolver::new();
        let found = resolver.placeholders("SELECT {'a': 1} AS m, map('k', 'v')");
        assert!(found.is_empty());
    }

    #[test]
    fn test_resolve_prefers_request_over_default() {
        let config = config_with_sql(
            "SELECT 1 WHERE h > {last_hours:UInt32}",
            &[("last_hours", "24")],
        );
        let request = HashMap::from([("last_hours".to_string(), "6".to_string())]);
        let params = ParamResolver::new().resolve(&config, &request).unwrap();
        assert_eq!(params.get("last_hours").map(String::as_str), Some("6"));
    }

    #[test]
    fn test_resolve_ignores_undeclared_and_reserved_keys() {
        let config = config_with_sql(
            "SELECT 1 WHERE h > {last_hours:UInt32} AND p = {page:UInt32}",
            &[("last_hours", "24"), ("page", "1")],
        );
        let request = HashMap::from([
            ("host".to_string(), "1".to_string()),
            ("page".to_string(), "7".to_string()),
            ("sneaky".to_string(), "1; DROP TABLE x".to_string()),
        ]);
        let params = ParamResolver::new().resolve(&config, &request).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("page").map(String::as_str), Some("1"));
        assert!(!params.contains_key("sneaky"));
        assert!(!params.contains_key("host"));
    }

    #[test]
    fn test_resolve_missing_param() {
        let config = config_with_sql("SELECT 1 WHERE q = {query_id:String}", &[]);
        let err = ParamResolver::new()
            .resolve(&config, &HashMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::MissingParam { ref param, .. } if param == "query_id"
        ));
    }

    #[test]
    fn test_yaml_to_param() {
        let resolver = ParamResolver::new();
        let number: serde_yaml::Value = serde_yaml::from_str("24").unwrap();
        let seq: serde_yaml::Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert_eq!(resolver.yaml_to_param("n", &number).unwrap(), "24");
        assert!(resolver.yaml_to_param("s", &seq).is_err());
    }
}
