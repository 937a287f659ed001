use super::column_format::ColumnFormat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    #[default]
    Table,
    Chart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Area,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDef {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub index: String,
    pub categories: Vec<String>,
}

/// A named WHERE condition a user can toggle from the URL. The condition is
/// static SQL owned by the config; only the name travels in requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    pub label: String,
    pub condition: String,
}

/// A `{name:Type}` placeholder found in a SQL template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub name: String,
    pub param_type: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQueryConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: QueryKind,
    pub sql: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_formats: BTreeMap<String, ColumnFormat>,
    #[serde(default)]
    pub default_params: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub related_charts: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterPreset>,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub chart: Option<ChartDef>,
    #[serde(default)]
    pub refresh_interval: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
    #[serde(default)]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryConfig {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: QueryKind,
    pub sql: String,
    pub columns: Vec<String>,
    pub column_formats: BTreeMap<String, ColumnFormat>,
    pub default_params: BTreeMap<String, String>,
    pub required_params: Vec<String>,
    pub related_charts: Vec<String>,
    pub filters: Vec<FilterPreset>,
    pub sortable: bool,
    pub optional: bool,
    pub chart: Option<ChartDef>,
    pub refresh_interval: Option<u64>,
    pub page_size: Option<u64>,
    pub docs: Option<String>,
    pub placeholders: Vec<Placeholder>,
    pub dependencies: BTreeSet<String>,
}

impl QueryConfig {
    pub fn is_chart(&self) -> bool {
        self.kind == QueryKind::Chart
    }

    pub fn format_for(&self, column: &str) -> &ColumnFormat {
        static TEXT: ColumnFormat = ColumnFormat::Text;
        self.column_formats.get(column).unwrap_or(&TEXT)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterPreset> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders.iter().any(|p| p.name == name)
    }

    /// Columns to display: the declared list, or every column the result
    /// carries when the config declares none.
    pub fn display_columns<'a>(&'a self, result_columns: &'a [String]) -> &'a [String] {
        if self.columns.is_empty() {
            result_columns
        } else {
            &self.columns
        }
    }
}

/// Title used when a config omits one: `history-queries` → `History Queries`.
pub fn title_from_name(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_name() {
        assert_eq!(title_from_name("history-queries"), "History Queries");
        assert_eq!(title_from_name("mergetree_settings"), "Mergetree Settings");
        assert_eq!(title_from_name("disks"), "Disks");
    }

    #[test]
    fn test_raw_defaults() {
        let raw: RawQueryConfig =
            serde_yaml::from_str("name: disks\nsql: SELECT name FROM system.disks\n").unwrap();
        assert_eq!(raw.kind, QueryKind::Table);
        assert!(raw.sortable);
        assert!(!raw.optional);
        assert!(raw.columns.is_empty());
        assert!(raw.chart.is_none());
    }

    #[test]
    fn test_chart_def_parses_type_field() {
        let yaml = "type: area\nindex: event_time\ncategories: [memory]\n";
        let chart: ChartDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(chart.chart_type, ChartType::Area);
        assert_eq!(chart.categories, vec!["memory".to_string()]);
    }
}
