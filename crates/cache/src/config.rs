//! Cache configuration with precedence and validation
//!
//! Settings are resolved from defaults, then an optional JSON file, then
//! `DISKCACHE_*` environment variables. The result is a [`CacheConfig`]
//! that is validated before a cache is opened on it.

use crate::errors::{CacheError, RecoveryHint, Result, SerializationOp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default byte quota: 50 MiB
pub const DEFAULT_SIZE_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// Default entry-count quota: effectively unbounded
pub const DEFAULT_COUNT_LIMIT: u64 = u64::MAX;

pub const ENV_CACHE_DIR: &str = "DISKCACHE_DIR";
pub const ENV_SIZE_LIMIT: &str = "DISKCACHE_SIZE_LIMIT";
pub const ENV_COUNT_LIMIT: &str = "DISKCACHE_COUNT_LIMIT";

/// Configuration for one cache directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one file per entry
    pub cache_dir: PathBuf,
    /// Upper bound on the summed size of all entry files
    #[serde(default = "default_size_limit")]
    pub size_limit_bytes: u64,
    /// Upper bound on the number of entry files
    #[serde(default = "default_count_limit")]
    pub count_limit: u64,
}

fn default_size_limit() -> u64 {
    DEFAULT_SIZE_LIMIT_BYTES
}

fn default_count_limit() -> u64 {
    DEFAULT_COUNT_LIMIT
}

impl CacheConfig {
    /// Configuration for `cache_dir` with default quotas
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            size_limit_bytes: DEFAULT_SIZE_LIMIT_BYTES,
            count_limit: DEFAULT_COUNT_LIMIT,
        }
    }

    pub fn builder(cache_dir: impl Into<PathBuf>) -> CacheConfigBuilder {
        CacheConfigBuilder::new(cache_dir)
    }

    /// Reject configurations no cache can be opened with
    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(CacheError::configuration("cache_dir must not be empty"));
        }
        if self.size_limit_bytes == 0 {
            return Err(CacheError::configuration(
                "size_limit_bytes must be greater than zero",
            ));
        }
        if self.count_limit == 0 {
            return Err(CacheError::configuration(
                "count_limit must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON document such as
    /// `{"cache_dir": "/var/cache/app", "size_limit_bytes": 1048576}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CacheError::io(path, "read config file", e))?;

        serde_json::from_str(&content).map_err(|e| CacheError::Serialization {
            key: path.display().to_string(),
            operation: SerializationOp::Decode,
            source: Box::new(e),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check config file syntax".to_string(),
            },
        })
    }

    /// Resolve a configuration purely from `DISKCACHE_*` variables
    pub fn from_env() -> Result<Self> {
        CacheConfigLoader::load(None)
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            config: CacheConfig::new(cache_dir),
        }
    }

    /// Set the byte quota
    pub fn size_limit_bytes(mut self, limit: u64) -> Self {
        self.config.size_limit_bytes = limit;
        self
    }

    /// Set the entry-count quota
    pub fn count_limit(mut self, limit: u64) -> Self {
        self.config.count_limit = limit;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile(PathBuf),
    EnvironmentVariable(&'static str),
}

/// Partially specified settings from one source
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    cache_dir: Option<PathBuf>,
    size_limit_bytes: Option<u64>,
    count_limit: Option<u64>,
}

/// Configuration loader that handles precedence
pub struct CacheConfigLoader;

impl CacheConfigLoader {
    /// Resolve defaults, then `file` if given, then the environment
    pub fn load(file: Option<&Path>) -> Result<CacheConfig> {
        Self::load_with_sources(file).map(|(config, _)| config)
    }

    /// Like [`CacheConfigLoader::load`], also reporting which source set each field
    pub fn load_with_sources(file: Option<&Path>) -> Result<(CacheConfig, Vec<ConfigSource>)> {
        let mut merged = PartialConfig::default();
        let mut sources = vec![ConfigSource::Default];

        if let Some(path) = file {
            let content = std::fs::read_to_string(path)
                .map_err(|e| CacheError::io(path, "read config file", e))?;
            let from_file: PartialConfig = serde_json::from_str(&content)?;
            merged = Self::merge(merged, from_file);
            sources.push(ConfigSource::ConfigFile(path.to_path_buf()));
        }

        let (from_env, env_sources) = Self::load_from_env();
        merged = Self::merge(merged, from_env);
        sources.extend(env_sources);

        let cache_dir = merged.cache_dir.ok_or_else(|| CacheError::Configuration {
            message: "no cache directory configured".to_string(),
            recovery_hint: RecoveryHint::Manual {
                instructions: format!("Set {ENV_CACHE_DIR} or provide cache_dir in the config file"),
            },
        })?;

        let config = CacheConfig {
            cache_dir,
            size_limit_bytes: merged.size_limit_bytes.unwrap_or(DEFAULT_SIZE_LIMIT_BYTES),
            count_limit: merged.count_limit.unwrap_or(DEFAULT_COUNT_LIMIT),
        };
        config.validate()?;
        Ok((config, sources))
    }

    fn merge(base: PartialConfig, overlay: PartialConfig) -> PartialConfig {
        PartialConfig {
            cache_dir: overlay.cache_dir.or(base.cache_dir),
            size_limit_bytes: overlay.size_limit_bytes.or(base.size_limit_bytes),
            count_limit: overlay.count_limit.or(base.count_limit),
        }
    }

    fn load_from_env() -> (PartialConfig, Vec<ConfigSource>) {
        let mut partial = PartialConfig::default();
        let mut sources = Vec::new();

        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.is_empty() {
                partial.cache_dir = Some(PathBuf::from(dir));
                sources.push(ConfigSource::EnvironmentVariable(ENV_CACHE_DIR));
            }
        }

        if let Some(limit) = Self::parse_u64_var(ENV_SIZE_LIMIT) {
            partial.size_limit_bytes = Some(limit);
            sources.push(ConfigSource::EnvironmentVariable(ENV_SIZE_LIMIT));
        }

        if let Some(limit) = Self::parse_u64_var(ENV_COUNT_LIMIT) {
            partial.count_limit = Some(limit);
            sources.push(ConfigSource::EnvironmentVariable(ENV_COUNT_LIMIT));
        }

        (partial, sources)
    }

    fn parse_u64_var(name: &'static str) -> Option<u64> {
        let raw = std::env::var(name).ok()?;
        match raw.trim().parse::<u64>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "ignoring non-numeric cache limit");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var(ENV_CACHE_DIR);
        std::env::remove_var(ENV_SIZE_LIMIT);
        std::env::remove_var(ENV_COUNT_LIMIT);
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("/tmp/cache");
        assert_eq!(config.size_limit_bytes, 50 * 1024 * 1024);
        assert_eq!(config.count_limit, u64::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_quotas() {
        assert!(CacheConfig::builder("/tmp/cache")
            .size_limit_bytes(0)
            .build()
            .is_err());
        assert!(CacheConfig::builder("/tmp/cache")
            .count_limit(0)
            .build()
            .is_err());
        assert!(CacheConfig::builder("").build().is_err());

        let config = CacheConfig::builder("/tmp/cache")
            .size_limit_bytes(100)
            .count_limit(3)
            .build()
            .unwrap();
        assert_eq!(config.size_limit_bytes, 100);
        assert_eq!(config.count_limit, 3);
    }

    #[test]
    fn test_json_file_fills_missing_limits() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, r#"{"cache_dir": "/var/cache/app", "count_limit": 10}"#).unwrap();

        let config = CacheConfig::from_json_file(&path).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/app"));
        assert_eq!(config.count_limit, 10);
        assert_eq!(config.size_limit_bytes, DEFAULT_SIZE_LIMIT_BYTES);
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        match CacheConfig::from_json_file(&path) {
            Err(CacheError::Serialization { .. }) => {}
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(
            &path,
            r#"{"cache_dir": "/from/file", "size_limit_bytes": 1000}"#,
        )
        .unwrap();

        std::env::set_var(ENV_SIZE_LIMIT, "2000");
        let (config, sources) = CacheConfigLoader::load_with_sources(Some(&path)).unwrap();
        clear_env();

        assert_eq!(config.cache_dir, PathBuf::from("/from/file"));
        assert_eq!(config.size_limit_bytes, 2000);
        assert!(sources.contains(&ConfigSource::ConfigFile(path.clone())));
        assert!(sources.contains(&ConfigSource::EnvironmentVariable(ENV_SIZE_LIMIT)));
    }

    #[test]
    #[serial]
    fn test_env_without_dir_fails() {
        clear_env();
        assert!(matches!(
            CacheConfig::from_env(),
            Err(CacheError::Configuration { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_non_numeric_env_limit_is_ignored() {
        clear_env();
        std::env::set_var(ENV_CACHE_DIR, "/from/env");
        std::env::set_var(ENV_COUNT_LIMIT, "lots");
        let config = CacheConfig::from_env();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/from/env"));
        assert_eq!(config.count_limit, DEFAULT_COUNT_LIMIT);
    }
}
