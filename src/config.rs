//! # Configuration Module
//!
//! Runtime settings for Segue: where the song collection lives, where the
//! feature cache is stored, and how the external analyzer is run.
//!
//! ## Sources
//!
//! Settings are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults ([`RuntimeConfig::default`])
//! 2. An optional JSON config file in the platform config directory:
//!    - Linux: `~/.config/segue/config.json`
//!    - macOS: `~/Library/Application Support/segue/config.json`
//!    - Windows: `%APPDATA%\segue\config.json`
//! 3. Command-line flags and `SEGUE_*` environment variables
//!
//! The default cache path is relative to the working directory, matching
//! how the collection tooling is usually run from a project folder.
//!
//! ## Example File
//!
//! ```text
//! {
//!   "collection_dir": "/home/dj/crate",
//!   "cache_path": "/home/dj/.cache/segue/analysis_cache.json",
//!   "analyzer": { "program": "/opt/essentia/bin/python", "timeout_secs": 120 }
//! }
//! ```

use crate::analyzer::CommandAnalyzer;
use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default collection directory, relative to the working directory.
pub const DEFAULT_COLLECTION_DIR: &str = "database";
/// Default cache file, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "analysis_cache.json";
/// Default analyzer timeout per file.
pub const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 300;

/// How to run the external analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Program to execute, `python3` by default.
    pub program: String,
    /// Arguments placed before the audio file path. When absent, the
    /// program is assumed to be a Python interpreter and is given the
    /// built-in detection script.
    pub args: Option<Vec<String>>,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: None,
            timeout_secs: DEFAULT_ANALYZER_TIMEOUT_SECS,
        }
    }
}

impl AnalyzerConfig {
    /// Build the subprocess analyzer described by this config.
    pub fn build(&self) -> CommandAnalyzer {
        let timeout = Duration::from_secs(self.timeout_secs);
        match &self.args {
            Some(args) => CommandAnalyzer::new(self.program.clone(), args.clone(), timeout),
            None => CommandAnalyzer::python(self.program.clone(), timeout),
        }
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding the audio collection
    pub collection_dir: PathBuf,
    /// Path to the feature cache file
    pub cache_path: PathBuf,
    pub analyzer: AnalyzerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            collection_dir: PathBuf::from(DEFAULT_COLLECTION_DIR),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load the user config file if there is one, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is not valid JSON.
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(err) => {
                debug!("No config directory available, using defaults: {err}");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from an explicit file. A missing file yields the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line overrides on top of this configuration.
    #[must_use]
    pub fn with_overrides(
        mut self,
        collection_dir: Option<PathBuf>,
        cache_path: Option<PathBuf>,
        analyzer_program: Option<String>,
        analyzer_timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(dir) = collection_dir {
            self.collection_dir = dir;
        }
        if let Some(path) = cache_path {
            self.cache_path = path;
        }
        if let Some(program) = analyzer_program {
            self.analyzer.program = program;
        }
        if let Some(secs) = analyzer_timeout_secs {
            self.analyzer.timeout_secs = secs;
        }
        self
    }
}

/// Returns the platform-appropriate config file path.
///
/// Unlike the cache, the config file is never created automatically.
///
/// # Errors
///
/// Returns an error if the platform config directory cannot be determined.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow!("Could not determine system config directory. Please ensure your platform supports standard config directories.")
    })?;

    Ok(config_dir.join("segue").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.collection_dir, PathBuf::from("database"));
        assert_eq!(config.cache_path, PathBuf::from("analysis_cache.json"));
        assert_eq!(config.analyzer.program, "python3");
        assert_eq!(config.analyzer.timeout_secs, 300);
        assert!(config.analyzer.args.is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RuntimeConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"collection_dir": "/crate", "analyzer": {"timeout_secs": 5}}"#,
        )
        .unwrap();

        let config = RuntimeConfig::load_from(&path).unwrap();
        assert_eq!(config.collection_dir, PathBuf::from("/crate"));
        assert_eq!(config.cache_path, PathBuf::from("analysis_cache.json"));
        assert_eq!(config.analyzer.timeout_secs, 5);
        assert_eq!(config.analyzer.program, "python3");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "collection_dir = 3").unwrap();
        assert!(RuntimeConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = RuntimeConfig::default().with_overrides(
            Some(PathBuf::from("/music")),
            None,
            Some("/opt/py".to_string()),
            Some(12),
        );
        assert_eq!(config.collection_dir, PathBuf::from("/music"));
        assert_eq!(config.cache_path, PathBuf::from("analysis_cache.json"));
        assert_eq!(config.analyzer.program, "/opt/py");
        assert_eq!(config.analyzer.timeout_secs, 12);
    }

    #[test]
    fn test_config_path_structure() {
        if let Ok(path) = get_config_path() {
            assert!(path.ends_with("segue/config.json"));
        }
    }
}
