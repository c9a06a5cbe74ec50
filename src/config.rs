//! Indexer configuration.
//!
//! Loaded from a TOML file (`.php-indexer.toml` in the working directory by
//! default). Every field is optional; missing fields fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = ".php-indexer.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexerConfig {
    /// Number of files extracted per indexing cycle.
    pub batch_size: usize,
    /// Maximum number of results returned by symbol search.
    pub search_limit: usize,
    /// Debounce window of the per-root file watchers, in milliseconds.
    pub debounce_ms: u64,
    /// Start a watcher for every root after the initial scan.
    pub watch: bool,
    /// Glob patterns (relative to each root) excluded from scanning and watching.
    pub ignore: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            search_limit: 50,
            debounce_ms: 300,
            watch: true,
            ignore: vec!["**/vendor/**".to_string(), "**/node_modules/**".to_string()],
        }
    }
}

impl IndexerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| IndexerError::Config(e.to_string()))?;
        // A zero batch would stall the coordinator.
        config.batch_size = config.batch_size.max(1);
        Ok(config)
    }

    /// Loads `path` when given, otherwise `.php-indexer.toml` from the working
    /// directory when present, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = PathBuf::from(CONFIG_FILENAME);
                if default_path.is_file() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = IndexerConfig::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.search_limit, 50);
        assert!(config.watch);
        assert!(config.ignore.iter().any(|p| p.contains("vendor")));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = IndexerConfig::from_toml("batch_size = 5\nwatch = false\n").unwrap();
        assert_eq!(config.batch_size, 5);
        assert!(!config.watch);
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.debounce_ms, 300);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let config = IndexerConfig::from_toml("batch_size = 0").unwrap();
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = IndexerConfig::from_toml("batch_size = \"many\"").unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ignore = [\"tests/**\"]\nsearch_limit = 3").unwrap();

        let config = IndexerConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.ignore, vec!["tests/**".to_string()]);
        assert_eq!(config.search_limit, 3);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = IndexerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, IndexerError::Io(_)));
    }
}
