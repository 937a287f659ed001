use super::format::percent_encode;

/// A page path plus its query pairs, used to build filter, sort and
/// pagination links that keep the rest of the page state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageUrl {
    pub path: String,
    pub pairs: Vec<(String, String)>,
}

impl PageUrl {
    pub fn new(path: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            path: path.into(),
            pairs,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Replaces every value of `key` with `value`.
    pub fn with(&self, key: &str, value: &str) -> Self {
        let mut next = self.without(key);
        next.pairs.push((key.to_string(), value.to_string()));
        next
    }

    pub fn without(&self, key: &str) -> Self {
        Self {
            path: self.path.clone(),
            pairs: self
                .pairs
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    /// Adds `key=value` if absent, removes it if present.
    pub fn toggle(&self, key: &str, value: &str) -> Self {
        let present = self.pairs.iter().any(|(k, v)| k == key && v == value);
        let mut next = self.clone();
        if present {
            next.pairs.retain(|(k, v)| !(k == key && v == value));
        } else {
            next.pairs.push((key.to_string(), value.to_string()));
        }
        next
    }

    pub fn href(&self) -> String {
        if self.pairs.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> PageUrl {
        PageUrl::new(
            "/history-queries",
            vec![
                ("host".to_string(), "1".to_string()),
                ("filter".to_string(), "select".to_string()),
                ("page".to_string(), "3".to_string()),
            ],
        )
    }

    #[test]
    fn test_with_replaces() {
        assert_eq!(
            url().with("page", "4").href(),
            "/history-queries?host=1&filter=select&page=4"
        );
    }

    #[test]
    fn test_toggle() {
        let url = url().toggle("filter", "select").toggle("filter", "slow");
        assert_eq!(url.get_all("filter"), vec!["slow"]);
    }

    #[test]
    fn test_href_encodes() {
        let url = PageUrl::new("/x", vec![("q".to_string(), "a b&c".to_string())]);
        assert_eq!(url.href(), "/x?q=a%20b%26c");
    }
}
