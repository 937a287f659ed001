use serde::{Deserialize, Serialize};

/// One result row: column name → JSON scalar, as returned by the server.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub rows_read: u64,
    #[serde(default)]
    pub bytes_read: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub query_id: String,
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub statistics: QueryStatistics,
}

impl QueryResult {
    /// Builds a result from rows alone; column order follows the first row.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|(name, value)| ColumnInfo {
                        name: name.clone(),
                        column_type: json_type_name(value).to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            query_id: String::new(),
            columns,
            rows,
            statistics: QueryStatistics::default(),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "Nullable(Nothing)",
        serde_json::Value::Bool(_) => "Bool",
        serde_json::Value::Number(n) if n.is_f64() => "Float64",
        serde_json::Value::Number(_) => "Int64",
        serde_json::Value::String(_) => "String",
        serde_json::Value::Array(_) => "Array",
        serde_json::Value::Object(_) => "Map",
    }
}

/// Body of a `FORMAT JSON` response from the ClickHouse HTTP interface.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonResponse {
    pub meta: Vec<ColumnInfo>,
    pub data: Vec<Row>,
    #[serde(default)]
    pub statistics: QueryStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_response() {
        let body = r#"{
            "meta": [{"name": "name", "type": "String"}, {"name": "free_space", "type": "UInt64"}],
            "data": [{"name": "default", "free_space": 1024}],
            "rows": 1,
            "statistics": {"elapsed": 0.0012, "rows_read": 1, "bytes_read": 58}
        }"#;
        let response: JsonResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta[1].column_type, "UInt64");
        assert_eq!(response.data[0]["free_space"], 1024);
        assert_eq!(response.statistics.bytes_read, 58);
    }

    #[test]
    fn test_from_rows_infers_columns() {
        let rows: Vec<Row> = serde_json::from_str(r#"[{"a": 1, "b": "x"}]"#).unwrap();
        let result = QueryResult::from_rows(rows);
        assert_eq!(result.column_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(result.columns[1].column_type, "String");
        assert_eq!(result.len(), 1);
    }
}
