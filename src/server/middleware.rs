use axum::extract::Request;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Maps the old host-prefixed URLs onto the `?host=` form:
/// `/1/merges?x=y` → `/merges?host=1&x=y`. Any `host` pair in the original
/// query is dropped. Paths whose first segment is not a number are left
/// alone.
pub fn legacy_redirect(path: &str, query: Option<&str>) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: usize = first.parse().ok()?;

    let mut target = format!("/{}?host={}", rest, id);
    for pair in query.unwrap_or("").split('&') {
        let key = pair.split_once('=').map_or(pair, |(k, _)| k);
        if pair.is_empty() || key == "host" {
            continue;
        }
        target.push('&');
        target.push_str(pair);
    }
    Some(target)
}

pub async fn redirect_legacy_urls(request: Request, next: Next) -> Response {
    let uri = request.uri();
    match legacy_redirect(uri.path(), uri.query()) {
        Some(target) => {
            debug!(from = %uri, to = %target, "Redirecting legacy URL");
            (StatusCode::PERMANENT_REDIRECT, [(LOCATION, target)]).into_response()
        }
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_route() {
        assert_eq!(
            legacy_redirect("/1/running-queries", None).as_deref(),
            Some("/running-queries?host=1")
        );
    }

    #[test]
    fn test_preserves_other_params() {
        assert_eq!(
            legacy_redirect("/0/history-queries", Some("last_hours=6&host=3&filter=slow"))
                .as_deref(),
            Some("/history-queries?host=0&last_hours=6&filter=slow")
        );
    }

    #[test]
    fn test_nested_route_and_bare_host() {
        assert_eq!(
            legacy_redirect("/2/explorer/tables", None).as_deref(),
            Some("/explorer/tables?host=2")
        );
        assert_eq!(legacy_redirect("/2", None).as_deref(), Some("/?host=2"));
    }

    #[test]
    fn test_non_numeric_untouched() {
        assert_eq!(legacy_redirect("/merges", Some("host=1")), None);
        assert_eq!(legacy_redirect("/api/v1/health", None), None);
        assert_eq!(legacy_redirect("/", None), None);
        assert_eq!(legacy_redirect("/1a/merges", None), None);
    }
}
