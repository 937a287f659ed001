use crate::error::Result;
use serde::{Deserialize, Serialize};

const BUILTIN_MENU: &str = include_str!("../assets/menu.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<MenuItem>,
}

impl MenuItem {
    /// Path part of `href`, without the query string.
    pub fn path(&self) -> Option<&str> {
        self.href
            .as_deref()
            .map(|href| href.split_once('?').map_or(href, |(path, _)| path))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_MENU)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let items: Vec<MenuItem> = serde_yaml::from_str(content)?;
        Ok(Self { items })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Titles from the root to the first item whose href path equals
    /// `path`, or empty when no item matches.
    pub fn breadcrumb(&self, path: &str) -> Vec<String> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let mut trail = Vec::new();
        if find_trail(&self.items, path, &mut trail) {
            trail
        } else {
            Vec::new()
        }
    }

    /// Every href path in depth-first order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        collect_paths(&self.items, &mut paths);
        paths
    }
}

fn find_trail(items: &[MenuItem], path: &str, trail: &mut Vec<String>) -> bool {
    for item in items {
        trail.push(item.title.clone());
        if item.path() == Some(path) || find_trail(&item.items, path, trail) {
            return true;
        }
        trail.pop();
    }
    false
}

fn collect_paths<'a>(items: &'a [MenuItem], out: &mut Vec<&'a str>) {
    for item in items {
        if let Some(path) = item.path() {
            out.push(path);
        }
        collect_paths(&item.items, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::QueryRegistry;

    #[test]
    fn test_breadcrumb_nested() {
        let menu = Menu::builtin().unwrap();
        assert_eq!(
            menu.breadcrumb("/history-queries"),
            vec!["Queries".to_string(), "History Queries".to_string()]
        );
        assert_eq!(menu.breadcrumb("/overview"), vec!["Overview".to_string()]);
    }

    #[test]
    fn test_breadcrumb_ignores_query_string() {
        let menu = Menu::builtin().unwrap();
        assert_eq!(
            menu.breadcrumb("/history-queries?host=1"),
            menu.breadcrumb("/history-queries")
        );
    }

    #[test]
    fn test_breadcrumb_unknown() {
        let menu = Menu::builtin().unwrap();
        assert!(menu.breadcrumb("/does-not-exist").is_empty());
        assert!(menu.breadcrumb("/").is_empty());
    }

    #[test]
    fn test_breadcrumb_deep() {
        let menu = Menu::from_yaml(
            r#"
- title: System
  items:
    - title: Settings
      items:
        - title: MergeTree
          href: /mergetree-settings?host=0
"#,
        )
        .unwrap();
        assert_eq!(
            menu.breadcrumb("/mergetree-settings"),
            vec!["System", "Settings", "MergeTree"]
        );
    }

    #[test]
    fn test_menu_links_resolve() {
        let menu = Menu::builtin().unwrap();
        let registry = QueryRegistry::builtin().unwrap();
        for path in menu.paths() {
            let name = path.trim_start_matches('/');
            if matches!(name, "overview" | "dashboard" | "explorer") {
                continue;
            }
            let config = registry.get(name).unwrap();
            assert!(!config.is_chart(), "{} links to a chart", path);
        }
    }
}
