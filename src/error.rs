use crate::executor::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Query config not found: {0}")]
    QueryNotFound(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Missing parameter '{param}' for query '{query}'")]
    MissingParam { query: String, param: String },

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Failed to parse query config: {0}")]
    DslParse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
