use super::backend::Executor;
use super::result::QueryResult;
use crate::dsl::QueryParams;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

static EXCEPTION_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Code:\s*(\d+)").expect("exception code regex is valid"));

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(version [^)]*\)\s*$").expect("version suffix regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Network,
    Timeout,
    Query,
    Permission,
    TableMissing,
    NoData,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Query => "query",
            FetchErrorKind::Permission => "permission",
            FetchErrorKind::TableMissing => "table_missing",
            FetchErrorKind::NoData => "no_data",
        }
    }

    /// Heading shown above the message in the page alert.
    pub fn title(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "Cannot reach ClickHouse",
            FetchErrorKind::Timeout => "Query timed out",
            FetchErrorKind::Query => "Query failed",
            FetchErrorKind::Permission => "Permission denied",
            FetchErrorKind::TableMissing => "Table not found",
            FetchErrorKind::NoData => "No data",
        }
    }

    /// Failures that are a property of the server's contents rather than a
    /// fault, rendered as a neutral notice.
    pub fn is_informational(&self) -> bool {
        matches!(self, FetchErrorKind::NoData)
    }

    fn from_exception_code(code: u32) -> Self {
        match code {
            60 | 81 => FetchErrorKind::TableMissing,
            159 | 209 => FetchErrorKind::Timeout,
            164 | 192 | 193 | 497 | 516 => FetchErrorKind::Permission,
            _ => FetchErrorKind::Query,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure at the fetch boundary. Returned as a value so pages
/// can always render an alert instead of failing the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            query_id: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NoData, message)
    }

    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Classifies a non-2xx response of the HTTP interface. The body carries
    /// `Code: N. DB::Exception: ...`; the code decides the kind.
    pub fn from_server(status: u16, body: &str) -> Self {
        let code = EXCEPTION_CODE
            .captures(body)
            .and_then(|caps| caps[1].parse::<u32>().ok());

        let kind = match (code, status) {
            (Some(code), _) => FetchErrorKind::from_exception_code(code),
            (None, 401 | 403) => FetchErrorKind::Permission,
            (None, 408 | 504) => FetchErrorKind::Timeout,
            (None, 502 | 503) => FetchErrorKind::Network,
            (None, _) => FetchErrorKind::Query,
        };

        let first_line = body.lines().next().unwrap_or("").trim();
        let message = if first_line.is_empty() {
            format!("HTTP {}", status)
        } else {
            VERSION_SUFFIX.replace(first_line, "").into_owned()
        };

        Self {
            kind,
            code,
            message,
            query_id: None,
        }
    }
}

/// One call through the fetch layer.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub sql: &'a str,
    pub params: &'a QueryParams,
    /// Zero rows is reported as [`FetchErrorKind::NoData`] when set.
    pub require_rows: bool,
}

impl<'a> FetchRequest<'a> {
    pub fn new(sql: &'a str, params: &'a QueryParams) -> Self {
        Self {
            sql,
            params,
            require_rows: false,
        }
    }

    pub fn require_rows(mut self) -> Self {
        self.require_rows = true;
        self
    }
}

/// Submits parameterized SQL and returns rows or a classified error. Never
/// panics on server or transport failures.
pub async fn fetch_data(
    executor: &dyn Executor,
    request: FetchRequest<'_>,
) -> std::result::Result<QueryResult, FetchError> {
    let started = Instant::now();
    let result = executor.query(request.sql, request.params).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(result) if request.require_rows && result.is_empty() => {
            debug!(query_id = %result.query_id, elapsed_ms, "Query returned no rows");
            Err(FetchError::no_data("The query returned no rows").with_query_id(result.query_id))
        }
        Ok(result) => {
            debug!(
                query_id = %result.query_id,
                rows = result.len(),
                elapsed_ms,
                "Query succeeded"
            );
            Ok(result)
        }
        Err(e) => {
            warn!(
                kind = %e.kind,
                code = ?e.code,
                query_id = ?e.query_id,
                elapsed_ms,
                "Query failed: {}",
                e.message
            );
            Err(e)
        }
    }
}
