use crate::dsl::{QueryConfig, QueryParams};
use crate::error::{DashboardError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const LIMIT_PARAM: &str = "page_limit";
pub const OFFSET_PARAM: &str = "page_offset";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

impl SortSpec {
    /// `order` is `asc` or `desc`; anything else is rejected.
    pub fn parse(column: &str, order: Option<&str>) -> Result<Self> {
        let descending = match order.map(|o| o.to_ascii_lowercase()) {
            None => false,
            Some(o) if o == "asc" => false,
            Some(o) if o == "desc" => true,
            Some(o) => {
                return Err(DashboardError::InvalidParam(format!(
                    "order must be 'asc' or 'desc', got '{}'",
                    o
                )))
            }
        };
        Ok(Self {
            column: column.to_string(),
            descending,
        })
    }
}

/// Page state taken from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportOptions {
    pub filters: Vec<String>,
    pub sort: Option<SortSpec>,
    /// 1-based page number.
    pub page: u64,
    /// Rows per page; zero disables pagination.
    pub page_size: u64,
}

/// Wraps the config's SQL with the selected filter conditions, sort order
/// and pagination. Filter conditions are static SQL owned by the config, the
/// sort column must be a declared column, and LIMIT/OFFSET are bound
/// parameters. Fetches one row beyond the page so callers can tell whether
/// another page exists.
pub fn build_report_sql(
    config: &QueryConfig,
    options: &ReportOptions,
    params: &mut QueryParams,
) -> Result<String> {
    let mut conditions = Vec::with_capacity(options.filters.len());
    for name in &options.filters {
        let filter = config.filter(name).ok_or_else(|| {
            DashboardError::InvalidParam(format!(
                "Unknown filter '{}' for query '{}'",
                name, config.name
            ))
        })?;
        conditions.push(format!("({})", filter.condition));
    }

    let order_by = match &options.sort {
        Some(sort) => {
            if !config.sortable {
                return Err(DashboardError::InvalidParam(format!(
                    "Query '{}' does not support sorting",
                    config.name
                )));
            }
            if !config.columns.contains(&sort.column) || !IDENTIFIER.is_match(&sort.column) {
                return Err(DashboardError::InvalidParam(format!(
                    "Cannot sort by '{}'",
                    sort.column
                )));
            }
            Some(format!(
                "`{}` {}",
                sort.column,
                if sort.descending { "DESC" } else { "ASC" }
            ))
        }
        None => None,
    };

    if conditions.is_empty() && order_by.is_none() && options.page_size == 0 {
        return Ok(config.sql.clone());
    }

    let inner = config.sql.trim().trim_end_matches(';');
    let mut sql = format!("SELECT *\nFROM (\n{}\n)", inner);

    if !conditions.is_empty() {
        sql.push_str("\nWHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if let Some(order_by) = order_by {
        sql.push_str("\nORDER BY ");
        sql.push_str(&order_by);
    }

    if options.page_size > 0 {
        let page = options.page.max(1);
        let limit = options.page_size.checked_add(1);
        let offset = (page - 1).checked_mul(options.page_size);
        let (Some(limit), Some(offset)) = (limit, offset) else {
            return Err(DashboardError::InvalidParam(format!(
                "page {} is out of range",
                options.page
            )));
        };
        params.insert(LIMIT_PARAM.to_string(), limit.to_string());
        params.insert(OFFSET_PARAM.to_string(), offset.to_string());
        sql.push_str(&format!(
            "\nLIMIT {{{}:UInt64}} OFFSET {{{}:UInt64}}",
            LIMIT_PARAM, OFFSET_PARAM
        ));
    }

    Ok(sql)
}
