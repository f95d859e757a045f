//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::operation::MAX_REPEATS_CEILING;
use crate::store::map::MapStoreConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreProperties,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreProperties {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// JSON schema document
    #[serde(default)]
    pub schema_path: Option<String>,

    /// Store-wide `While` limit. Can lower the hard ceiling, never raise it.
    #[serde(default = "default_max_repeats")]
    pub max_repeats: usize,

    /// Largest right-hand side a `Join` may collect
    #[serde(default = "default_join_limit")]
    pub join_limit: usize,

    #[serde(default)]
    pub map: MapStoreConfig,
}

fn default_store_name() -> String {
    "trellis".to_string()
}

fn default_max_repeats() -> usize {
    MAX_REPEATS_CEILING
}

fn default_join_limit() -> usize {
    100_000
}

impl Default for StoreProperties {
    fn default() -> Self {
        Self {
            name: default_store_name(),
            schema_path: None,
            max_repeats: default_max_repeats(),
            join_limit: default_join_limit(),
            map: MapStoreConfig::default(),
        }
    }
}

impl StoreProperties {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Effective `While` limit
    pub fn max_repeats(&self) -> usize {
        self.max_repeats.min(MAX_REPEATS_CEILING)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("trellis").join("config.toml")),
            Some(PathBuf::from("/etc/trellis/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `TRELLIS_*` overrides read through `lookup`. Unparseable
    /// numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(name) = lookup("TRELLIS_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(path) = lookup("TRELLIS_SCHEMA_PATH") {
            self.store.schema_path = Some(path);
        }
        if let Some(n) = lookup("TRELLIS_MAX_REPEATS").and_then(|v| v.parse().ok()) {
            self.store.max_repeats = n;
        }
        if let Some(n) = lookup("TRELLIS_JOIN_LIMIT").and_then(|v| v.parse().ok()) {
            self.store.join_limit = n;
        }

        // Logging overrides
        if let Some(level) = lookup("TRELLIS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TRELLIS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Trellis Configuration
#
# Environment variables override these settings:
# - TRELLIS_STORE_NAME
# - TRELLIS_SCHEMA_PATH
# - TRELLIS_MAX_REPEATS
# - TRELLIS_JOIN_LIMIT
# - TRELLIS_LOG_LEVEL
# - TRELLIS_LOG_FORMAT

[store]
# Name reported in errors and logs
name = "trellis"

# JSON schema document
# schema_path = "/etc/trellis/schema.json"

# Maximum While iterations (capped at 1000)
max_repeats = 1000

# Maximum number of right-hand items a Join may collect
join_limit = 100000

[store.map]
# Merge duplicate elements on ingest
ingest_aggregation = true

# Filter results by the visibility property
visibility = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.store.name, "trellis");
        assert_eq!(config.store.max_repeats, 1000);
        assert_eq!(config.store.join_limit, 100_000);
        assert!(config.store.map.ingest_aggregation);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[store]\nname = \"graph\"\nmax_repeats = 50\n\n[store.map]\nvisibility = false"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.store.name, "graph");
        assert_eq!(config.store.max_repeats(), 50);
        assert!(!config.store.map.visibility);
        assert!(config.store.map.ingest_aggregation);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store\nname = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRELLIS_STORE_NAME", "federated"),
            ("TRELLIS_MAX_REPEATS", "5000"),
            ("TRELLIS_JOIN_LIMIT", "not a number"),
            ("TRELLIS_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.store.name, "federated");
        assert_eq!(config.store.max_repeats(), MAX_REPEATS_CEILING);
        assert_eq!(config.store.join_limit, 100_000);
        assert_eq!(config.logging.format, "json");
    }
}
