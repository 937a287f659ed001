use super::parser::{QueryConfig, QueryKind};
use crate::executor::{Row, LIMIT_PARAM, OFFSET_PARAM};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub query: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.query, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub query: String,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.query, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, query: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            query: query.to_string(),
            message: message.into(),
        });
    }

    fn warn(&mut self, query: &str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            query: query.to_string(),
            message: message.into(),
        });
    }

    fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}

pub struct QueryValidator<'a> {
    by_name: HashMap<&'a str, &'a QueryConfig>,
}

impl<'a> QueryValidator<'a> {
    pub fn new(configs: &'a [QueryConfig]) -> Self {
        let by_name = configs.iter().map(|c| (c.name.as_str(), c)).collect();
        Self { by_name }
    }

    pub fn validate_all(&self, configs: &[QueryConfig]) -> ValidationResult {
        configs
            .par_iter()
            .map(|config| self.validate(config))
            .reduce(ValidationResult::default, ValidationResult::merge)
    }

    pub fn validate(&self, config: &QueryConfig) -> ValidationResult {
        let mut result = ValidationResult::default();
        let name = config.name.as_str();

        if config.sql.trim().is_empty() {
            result.error(name, "sql is empty");
        }

        let mut seen = HashSet::new();
        for column in &config.columns {
            if !seen.insert(column.as_str()) {
                result.error(name, format!("column '{}' is listed twice", column));
            }
        }

        if config.columns.is_empty() {
            result.warn(name, "no columns declared, every result column is displayed");
        } else {
            for column in config.column_formats.keys() {
                if !seen.contains(column.as_str()) {
                    result.error(
                        name,
                        format!("column_formats key '{}' is not in columns", column),
                    );
                }
            }
        }

        for chart_name in &config.related_charts {
            match self.by_name.get(chart_name.as_str()) {
                None => result.error(
                    name,
                    format!("related chart '{}' does not exist", chart_name),
                ),
                Some(chart) if chart.kind != QueryKind::Chart => result.error(
                    name,
                    format!("related chart '{}' is not a chart", chart_name),
                ),
                Some(_) => {}
            }
        }

        match (&config.kind, &config.chart) {
            (QueryKind::Chart, None) => {
                result.error(name, "chart query must declare a 'chart' section")
            }
            (QueryKind::Chart, Some(chart)) => {
                for column in std::iter::once(&chart.index).chain(chart.categories.iter()) {
                    if !seen.contains(column.as_str()) {
                        result.error(
                            name,
                            format!("chart column '{}' is not in columns", column),
                        );
                    }
                }
                if chart.categories.is_empty() {
                    result.error(name, "chart declares no categories");
                }
            }
            (QueryKind::Table, Some(_)) => {
                result.warn(name, "'chart' section is ignored for table queries")
            }
            (QueryKind::Table, None) => {}
        }

        for placeholder in &config.placeholders {
            if placeholder.name == LIMIT_PARAM || placeholder.name == OFFSET_PARAM {
                result.error(
                    name,
                    format!("placeholder '{}' is reserved for pagination", placeholder.name),
                );
                continue;
            }
            let has_default = config.default_params.contains_key(&placeholder.name);
            let is_required = config.required_params.contains(&placeholder.name);
            if !has_default && !is_required {
                result.error(
                    name,
                    format!(
                        "placeholder '{}' has no default and is not a required parameter",
                        placeholder.name
                    ),
                );
            }
        }

        for key in config.default_params.keys() {
            if !config.has_placeholder(key) {
                result.warn(name, format!("default parameter '{}' is never used", key));
            }
        }

        let mut filter_names = HashSet::new();
        for filter in &config.filters {
            if !filter_names.insert(filter.name.as_str()) {
                result.error(name, format!("filter '{}' is declared twice", filter.name));
            }
        }

        if config.dependencies.is_empty() {
            result.warn(name, "no table dependencies could be extracted from sql");
        }

        result
    }

    /// Columns the config declares that a sample row from the server lacks.
    pub fn missing_in_sample(config: &QueryConfig, row: &Row) -> Vec<String> {
        config
            .columns
            .iter()
            .filter(|column| !row.contains_key(column.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::column_format::ColumnFormat;
    use crate::dsl::loader::QueryLoader;

    fn load(yaml: &str) -> QueryConfig {
        QueryLoader::new().load_str(yaml, "test.yaml").unwrap()
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let configs = QueryLoader::new().load_builtin().unwrap();
        let validator = QueryValidator::new(&configs);
        let result = validator.validate_all(&configs);
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_every_format_key_is_a_column() {
        let configs = QueryLoader::new().load_builtin().unwrap();
        for config in &configs {
            for key in config.column_formats.keys() {
                assert!(
                    config.columns.contains(key),
                    "{}: format for unknown column {}",
                    config.name,
                    key
                );
            }
        }
    }

    #[test]
    fn test_format_for_unknown_column() {
        let mut config = load("name: t\nsql: SELECT a FROM system.one\ncolumns: [a]\n");
        config
            .column_formats
            .insert("b".to_string(), ColumnFormat::Badge);
        let configs = vec![config];
        let result = QueryValidator::new(&configs).validate(&configs[0]);
        assert!(!result.is_valid());
        assert!(result.errors[0].message.contains("'b'"));
    }

    #[test]
    fn test_related_chart_must_be_chart() {
        let table = load(
            "name: t\nsql: SELECT a FROM system.one\ncolumns: [a]\nrelated_charts: [u, missing]\n",
        );
        let other = load("name: u\nsql: SELECT a FROM system.one\ncolumns: [a]\n");
        let configs = vec![table, other];
        let result = QueryValidator::new(&configs).validate(&configs[0]);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_placeholder_without_default() {
        let config = load("name: t\nsql: SELECT a FROM system.one WHERE a = {x:String}\n");
        let configs = vec![config];
        let result = QueryValidator::new(&configs).validate(&configs[0]);
        assert!(result.errors.iter().any(|e| e.message.contains("'x'")));
    }

    #[test]
    fn test_pagination_placeholder_reserved() {
        let config = load(
            "name: t\nsql: SELECT a FROM system.one LIMIT {page_limit:UInt64}\n\
             default_params:\n  page_limit: 5\n",
        );
        let configs = vec![config];
        let result = QueryValidator::new(&configs).validate(&configs[0]);
        assert!(result.errors.iter().any(|e| e.message.contains("reserved")));
    }

    #[test]
    fn test_chart_columns_checked() {
        let config = load(
            "name: c\nkind: chart\nsql: SELECT a, b FROM system.one\ncolumns: [a, b]\n\
             chart:\n  type: bar\n  index: a\n  categories: [b, c]\n",
        );
        let configs = vec![config];
        let result = QueryValidator::new(&configs).validate(&configs[0]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("'c'"));
    }

    #[test]
    fn test_missing_in_sample() {
        let config = load("name: t\nsql: SELECT a, b FROM system.one\ncolumns: [a, b]\n");
        let row: Row = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(
            QueryValidator::missing_in_sample(&config, &row),
            vec!["b".to_string()]
        );
    }
}
