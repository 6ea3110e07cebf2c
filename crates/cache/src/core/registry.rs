//! One live cache instance per directory
//!
//! Caches are only created here. The process-wide map is keyed by the
//! canonical directory path, so two handles for the same directory always
//! share one registry and one set of counters.

use crate::config::CacheConfig;
use crate::errors::{CacheError, Result};
use crate::eviction::{EvictionManager, Quotas};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use super::stats::CacheStats;
use super::types::{CacheInner, DiskCache};

static INSTANCES: Lazy<Mutex<HashMap<PathBuf, Weak<CacheInner>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl DiskCache {
    /// Open the cache for `config.cache_dir`, creating the directory if needed.
    ///
    /// Returns the existing instance when the directory is already open in
    /// this process; its quotas are kept even if `config` asks for others.
    /// A new instance starts scanning the directory in the background, see
    /// [`DiskCache::initial_scan`].
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| CacheError::io(&config.cache_dir, "create cache directory", e))?;
        let cache_dir = std::fs::canonicalize(&config.cache_dir)
            .map_err(|e| CacheError::io(&config.cache_dir, "resolve cache directory", e))?;

        let mut instances = INSTANCES.lock();
        if let Some(inner) = instances.get(&cache_dir).and_then(Weak::upgrade) {
            if inner.config.size_limit_bytes != config.size_limit_bytes
                || inner.config.count_limit != config.count_limit
            {
                warn!(
                    cache_dir = %cache_dir.display(),
                    size_limit_bytes = inner.config.size_limit_bytes,
                    count_limit = inner.config.count_limit,
                    "cache already open with different quotas; keeping existing instance"
                );
            }
            return Ok(Self { inner });
        }
        instances.retain(|_, weak| weak.strong_count() > 0);

        let quotas = Quotas {
            size_limit_bytes: config.size_limit_bytes,
            count_limit: config.count_limit,
        };
        let (eviction, initial_scan) = EvictionManager::start(cache_dir.clone(), quotas)?;

        let inner = Arc::new(CacheInner {
            config: CacheConfig {
                cache_dir: cache_dir.clone(),
                ..config
            },
            eviction,
            initial_scan,
            stats: CacheStats::default(),
        });
        instances.insert(cache_dir.clone(), Arc::downgrade(&inner));

        debug!(cache_dir = %cache_dir.display(), "opened disk cache");
        Ok(Self { inner })
    }

    /// Open the cache and wait for its initial scan to finish
    pub fn open_ready(config: CacheConfig) -> Result<Self> {
        let cache = Self::open(config)?;
        cache.inner.initial_scan.wait()?;
        Ok(cache)
    }
}
