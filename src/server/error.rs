use crate::error::DashboardError;
use crate::executor::FetchErrorKind;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::QueryNotFound(_) | DashboardError::HostNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DashboardError::MissingParam { .. } | DashboardError::InvalidParam(_) => {
                StatusCode::BAD_REQUEST
            }
            DashboardError::Fetch(e) => match e.kind {
                FetchErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FetchErrorKind::NoData => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `kind` field of the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::QueryNotFound(_) | DashboardError::HostNotFound(_) => "not_found",
            DashboardError::MissingParam { .. } | DashboardError::InvalidParam(_) => {
                "bad_request"
            }
            DashboardError::Fetch(e) => e.kind.as_str(),
            _ => "internal",
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), kind = self.kind(), "{}", self);
        }

        let body = match &self {
            DashboardError::Fetch(e) => json!({
                "error": {
                    "kind": e.kind,
                    "code": e.code,
                    "message": e.message,
                    "query_id": e.query_id,
                }
            }),
            other => json!({
                "error": {
                    "kind": other.kind(),
                    "code": null,
                    "message": other.to_string(),
                    "query_id": null,
                }
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FetchError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DashboardError::QueryNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DashboardError::InvalidParam("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DashboardError::from(FetchError::network("down")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DashboardError::from(FetchError::new(FetchErrorKind::Timeout, "slow")).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(DashboardError::from(FetchError::network("down")).kind(), "network");
        assert_eq!(DashboardError::Config("x".into()).kind(), "internal");
    }
}
