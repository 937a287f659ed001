use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FileLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid glob pattern: {0}")]
    Pattern(String),
}

pub type Result<T> = std::result::Result<T, FileLoadError>;

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

pub struct FileLoader;

impl FileLoader {
    /// Recursively loads every file under `path` with the given extension,
    /// sorted by path so that load order is stable across platforms.
    pub fn load_dir(path: impl AsRef<Path>, extension: &str) -> Result<Vec<SourceFile>> {
        let path = path.as_ref();
        let pattern = format!("{}/**/*.{}", path.display(), extension);
        let mut files: Vec<SourceFile> = glob::glob(&pattern)
            .map_err(|e| FileLoadError::Pattern(e.to_string()))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(
                        path = %e.path().display(),
                        "Skipping unreadable path: {}",
                        e.error()
                    );
                    None
                }
            })
            .filter_map(|path| match std::fs::read_to_string(&path) {
                Ok(content) => Some(SourceFile { path, content }),
                Err(e) => {
                    warn!(path = %path.display(), "Skipping unreadable file: {}", e);
                    None
                }
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<SourceFile> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Ok(SourceFile {
            path: path.to_path_buf(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_dir_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.yaml"), "b").unwrap();
        fs::write(dir.path().join("a.yaml"), "a").unwrap();
        fs::write(dir.path().join("nested/c.yaml"), "c").unwrap();
        fs::write(dir.path().join("ignored.sql"), "SELECT 1").unwrap();

        let files = FileLoader::load_dir(dir.path(), "yaml").unwrap();
        let contents: Vec<&str> = files.iter().map(|f| f.content.as_str()).collect();

        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_dir_skips_non_utf8_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.yaml"), "good").unwrap();
        fs::write(dir.path().join("bad.yaml"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let files = FileLoader::load_dir(dir.path(), "yaml").unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("good.yaml"));
        assert_eq!(files[0].content, "good");
    }

    #[test]
    fn test_load_file_missing() {
        let dir = TempDir::new().unwrap();
        let result = FileLoader::load_file(dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(FileLoadError::Io(_))));
    }
}
