use crate::error::{DashboardError, Result};
use crate::executor::{ReportOptions, SortSpec};
use crate::render::PageUrl;
use std::collections::HashMap;

/// Query-string pairs of one request, in order. Repeated keys (`filter`)
/// are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pairs: Vec<(String, String)>,
}

impl RequestParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Last value wins for repeated keys.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.pairs.iter().cloned().collect()
    }

    pub fn page_url(&self, path: &str) -> PageUrl {
        PageUrl::new(path, self.pairs.clone())
    }

    pub fn report_options(&self) -> Result<ReportOptions> {
        let sort = match self.get("sort").filter(|s| !s.is_empty()) {
            Some(column) => Some(SortSpec::parse(column, self.get("order"))?),
            None => None,
        };
        let page = match self.get("page") {
            Some(page) => page
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| {
                    DashboardError::InvalidParam(format!(
                        "page must be a positive integer, got '{}'",
                        page
                    ))
                })?,
            None => 1,
        };
        Ok(ReportOptions {
            filters: self.get_all("filter"),
            sort,
            page,
            page_size: 0,
        })
    }

    /// `?refresh=<seconds>`; `0` turns polling off.
    pub fn refresh(&self) -> Result<Option<u64>> {
        match self.get("refresh") {
            Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
                DashboardError::InvalidParam(format!(
                    "refresh must be a number of seconds, got '{}'",
                    value
                ))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        RequestParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_report_options() {
        let p = params(&[
            ("filter", "select"),
            ("filter", "slow"),
            ("sort", "duration"),
            ("order", "desc"),
            ("page", "2"),
        ]);
        let options = p.report_options().unwrap();
        assert_eq!(options.filters, vec!["select", "slow"]);
        assert!(options.sort.unwrap().descending);
        assert_eq!(options.page, 2);
    }

    #[test]
    fn test_bad_page() {
        assert!(params(&[("page", "0")]).report_options().is_err());
        assert!(params(&[("page", "x")]).report_options().is_err());
    }

    #[test]
    fn test_refresh() {
        assert_eq!(params(&[("refresh", "30")]).refresh().unwrap(), Some(30));
        assert_eq!(params(&[]).refresh().unwrap(), None);
        assert!(params(&[("refresh", "soon")]).refresh().is_err());
    }
}
