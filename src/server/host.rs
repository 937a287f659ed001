use crate::error::{DashboardError, Result};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use tracing::debug;

pub const HOST_COOKIE: &str = "host";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    Query,
    Cookie,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSelection {
    pub id: usize,
    pub source: HostSource,
}

impl HostSelection {
    /// Remembers an explicit `?host=` choice for later requests.
    pub fn set_cookie(&self) -> Option<(axum::http::HeaderName, HeaderValue)> {
        if self.source != HostSource::Query {
            return None;
        }
        let cookie = format!("{}={}; Path=/; Max-Age=31536000; SameSite=Lax", HOST_COOKIE, self.id);
        HeaderValue::from_str(&cookie).ok().map(|v| (SET_COOKIE, v))
    }
}

/// Picks the host for a request: `?host=`, then the `host` cookie, then 0.
/// An explicit but invalid or unknown `?host=` is an error; a stale cookie
/// is ignored.
pub fn select_host(
    query: Option<&str>,
    headers: &HeaderMap,
    host_count: usize,
) -> Result<HostSelection> {
    if let Some(raw) = query {
        let id: usize = raw.trim().parse().map_err(|_| {
            DashboardError::InvalidParam(format!("host must be a host index, got '{}'", raw))
        })?;
        if id >= host_count {
            return Err(DashboardError::HostNotFound(id.to_string()));
        }
        return Ok(HostSelection {
            id,
            source: HostSource::Query,
        });
    }

    if let Some(id) = cookie_value(headers, HOST_COOKIE).and_then(|v| v.parse::<usize>().ok()) {
        if id < host_count {
            return Ok(HostSelection {
                id,
                source: HostSource::Cookie,
            });
        }
        debug!(id, host_count, "Ignoring host cookie for unknown host");
    }

    Ok(HostSelection {
        id: 0,
        source: HostSource::Default,
    })
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_query_wins_over_cookie() {
        let selection = select_host(Some("2"), &headers("host=1"), 3).unwrap();
        assert_eq!(selection.id, 2);
        assert_eq!(selection.source, HostSource::Query);
        assert!(selection.set_cookie().is_some());
    }

    #[test]
    fn test_cookie_then_default() {
        let selection = select_host(None, &headers("theme=dark; host=1"), 3).unwrap();
        assert_eq!(selection.id, 1);
        assert!(selection.set_cookie().is_none());

        let selection = select_host(None, &HeaderMap::new(), 3).unwrap();
        assert_eq!(selection.source, HostSource::Default);
        assert_eq!(selection.id, 0);
    }

    #[test]
    fn test_stale_cookie_ignored() {
        let selection = select_host(None, &headers("host=9"), 2).unwrap();
        assert_eq!(selection.id, 0);
    }

    #[test]
    fn test_unknown_query_host() {
        assert!(matches!(
            select_host(Some("5"), &HeaderMap::new(), 2),
            Err(DashboardError::HostNotFound(_))
        ));
        assert!(matches!(
            select_host(Some("abc"), &HeaderMap::new(), 2),
            Err(DashboardError::InvalidParam(_))
        ));
    }
}
