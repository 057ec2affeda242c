//! Configuration file support.
//!
//! Loads optional `.codemap/config.toml` from the project root. Every key is
//! optional; a missing file means defaults, an unreadable or malformed one
//! is reported and also falls back to defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::batch::{BatchOptions, DEFAULT_CONCURRENCY};
use crate::cache::DEFAULT_CACHE_DIR;
use crate::fs_utils::{DEFAULT_EXTENSIONS, DiscoveryOptions};
use crate::ignore::DEFAULT_IGNORE_FILE;

pub const CONFIG_DIR: &str = ".codemap";
pub const CONFIG_FILE: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CodemapConfig {
    pub concurrency: usize,
    pub continue_on_error: bool,
    pub include_tests: bool,
    pub use_gitignore: bool,
    /// Name of the per-directory ignore file.
    pub ignore_file: String,
    /// Extension allow-list, without dots.
    pub extensions: Vec<String>,
    /// Extra patterns applied after defaults and ignore files.
    pub ignore_patterns: Vec<String>,
    pub max_depth: Option<usize>,
    pub cache: CacheConfig,
}

impl Default for CodemapConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            continue_on_error: true,
            include_tests: false,
            use_gitignore: true,
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_patterns: Vec::new(),
            max_depth: None,
            cache: CacheConfig::default(),
        }
    }
}

/// `[cache]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Relative paths resolve against the project root.
    pub dir: PathBuf,
    /// Evict entries older than this many days at the start of a run.
    pub max_age_days: Option<u32>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_age_days: None,
        }
    }
}

impl CodemapConfig {
    /// Load config from `.codemap/config.toml` in the given root directory.
    pub fn load(root: &Path) -> Self {
        Self::load_from_path(&root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }
}

/// Runtime options for one mapping run.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub batch: BatchOptions,
    pub discovery: DiscoveryOptions,
    pub use_gitignore: bool,
    pub ignore_file: String,
    pub extra_ignore_patterns: Vec<String>,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    pub cache_max_age_days: Option<u32>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::from(&CodemapConfig::default())
    }
}

impl From<&CodemapConfig> for MapOptions {
    fn from(config: &CodemapConfig) -> Self {
        let extensions: HashSet<String> = config
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            batch: BatchOptions {
                concurrency: config.concurrency,
                continue_on_error: config.continue_on_error,
            },
            discovery: DiscoveryOptions {
                extensions: (!extensions.is_empty()).then_some(extensions),
                include_tests: config.include_tests,
                max_depth: config.max_depth,
                ..DiscoveryOptions::default()
            },
            use_gitignore: config.use_gitignore,
            ignore_file: config.ignore_file.clone(),
            extra_ignore_patterns: config.ignore_patterns.clone(),
            cache_enabled: config.cache.enabled,
            cache_dir: config.cache.dir.clone(),
            cache_max_age_days: config.cache.max_age_days,
        }
    }
}

impl MapOptions {
    /// Cache directory for a run rooted at `root`.
    pub fn cache_dir_for(&self, root: &Path) -> PathBuf {
        if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            root.join(&self.cache_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(root: &Path, body: &str) {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).expect("create .codemap");
        let mut file = std::fs::File::create(dir.join(CONFIG_FILE)).expect("create config");
        writeln!(file, "{body}").expect("write config");
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().expect("temp dir");
        let config = CodemapConfig::load(temp.path());
        assert_eq!(config, CodemapConfig::default());
        assert_eq!(config.concurrency, 20);
        assert!(config.continue_on_error);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from(".classify-cache"));
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().expect("temp dir");
        write_config(
            temp.path(),
            r#"
concurrency = 4
include_tests = true
extensions = [".ts", "RS"]
ignore_patterns = ["fixtures/"]

[cache]
enabled = false
max_age_days = 30
"#,
        );

        let config = CodemapConfig::load(temp.path());
        assert_eq!(config.concurrency, 4);
        assert!(config.include_tests);
        assert!(config.use_gitignore);
        assert_eq!(config.cache.max_age_days, Some(30));
        assert_eq!(config.cache.dir, PathBuf::from(".classify-cache"));

        let options = MapOptions::from(&config);
        assert_eq!(options.batch.concurrency, 4);
        assert!(!options.cache_enabled);
        assert!(options.discovery.include_tests);
        let exts = options.discovery.extensions.expect("extensions");
        assert!(exts.contains("ts"));
        assert!(exts.contains("rs"));
        assert_eq!(exts.len(), 2);
        assert_eq!(options.extra_ignore_patterns, vec!["fixtures/"]);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let temp = TempDir::new().expect("temp dir");
        write_config(temp.path(), "concurrency = \"many\"");
        assert_eq!(CodemapConfig::load(temp.path()), CodemapConfig::default());
    }

    #[test]
    fn test_cache_dir_resolution() {
        let options = MapOptions::default();
        assert_eq!(
            options.cache_dir_for(Path::new("/work/app")),
            PathBuf::from("/work/app/.classify-cache")
        );
    }
}
