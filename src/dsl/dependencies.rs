use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::visit_relations;
use sqlparser::dialect::ClickHouseDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use tracing::debug;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\s*[A-Za-z_][A-Za-z0-9_]*\s*:[^{}]*\}").expect("placeholder regex is valid")
});

static TABLE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+`?([A-Za-z_][A-Za-z0-9_]*(?:`?\.`?[A-Za-z_][A-Za-z0-9_]*)?)`?")
        .expect("table reference regex is valid")
});

static CTE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Za-z_][A-Za-z0-9_]*)\s+AS\s*\(").expect("cte regex is valid")
});

/// Tables a query reads, lower-cased and fully qualified as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlDependencies {
    pub tables: BTreeSet<String>,
}

impl SqlDependencies {
    pub fn extract(sql: &str) -> Self {
        // Placeholders are not valid SQL until the server binds them.
        let bindable = PLACEHOLDER.replace_all(sql, "0");

        let mut tables = match Parser::parse_sql(&ClickHouseDialect {}, &bindable) {
            Ok(statements) => {
                let mut tables = BTreeSet::new();
                let _ = visit_relations(&statements, |relation| {
                    tables.insert(relation.to_string().replace('`', "").to_lowercase());
                    ControlFlow::<()>::Continue(())
                });
                tables
            }
            Err(e) => {
                debug!(error = %e, "Falling back to regex table extraction");
                Self::extract_with_regex(&bindable)
            }
        };

        for caps in CTE_NAME.captures_iter(&bindable) {
            tables.remove(&caps[1].to_lowercase());
        }

        Self { tables }
    }

    fn extract_with_regex(sql: &str) -> BTreeSet<String> {
        TABLE_REF
            .captures_iter(sql)
            .map(|caps| caps[1].replace('`', "").to_lowercase())
            .collect()
    }

    /// System tables only, e.g. `system.backup_log`.
    pub fn system_tables(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .map(String::as_str)
            .filter(|t| t.starts_with("system."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple() {
        let deps = SqlDependencies::extract("SELECT name FROM system.disks ORDER BY name");
        assert_eq!(
            deps.tables,
            BTreeSet::from(["system.disks".to_string()])
        );
    }

    #[test]
    fn test_extract_join_with_placeholders() {
        let sql = "SELECT r.name FROM system.roles AS r \
                   LEFT JOIN system.grants AS g ON g.role_name = r.name \
                   WHERE r.name = {role:String}";
        let deps = SqlDependencies::extract(sql);
        assert!(deps.tables.contains("system.roles"));
        assert!(deps.tables.contains("system.grants"));
        assert_eq!(deps.tables.len(), 2);
    }

    #[test]
    fn test_regex_fallback() {
        let tables = SqlDependencies::extract_with_regex(
            "SELECT * FROM `system`.`parts` JOIN system.tables USING (database)",
        );
        assert!(tables.contains("system.parts"));
        assert!(tables.contains("system.tables"));
    }

    #[test]
    fn test_cte_names_are_excluded() {
        let sql = "WITH recent AS (SELECT * FROM system.query_log) SELECT * FROM recent";
        let deps = SqlDependencies::extract(sql);
        assert!(deps.tables.contains("system.query_log"));
        assert!(!deps.tables.contains("recent"));
    }

    #[test]
    fn test_system_tables_filter() {
        let deps = SqlDependencies {
            tables: BTreeSet::from(["default.events".to_string(), "system.parts".to_string()]),
        };
        assert_eq!(deps.system_tables().collect::<Vec<_>>(), vec!["system.parts"]);
    }
}
