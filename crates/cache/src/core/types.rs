//! Core cache types and structures

use crate::config::CacheConfig;
use crate::eviction::{EvictionManager, InitialScan};
use std::path::PathBuf;
use std::sync::Arc;

use super::stats::CacheStats;

/// Handle to the cache bound to one directory.
///
/// Cloning is cheap and every clone shares the same registry. Instances are
/// only obtained through [`DiskCache::open`], which hands out the live
/// instance for a directory when there is one.
#[derive(Clone)]
pub struct DiskCache {
    pub(super) inner: Arc<CacheInner>,
}

pub(super) struct CacheInner {
    /// Configuration, with `cache_dir` canonicalized
    pub config: CacheConfig,
    pub eviction: Arc<EvictionManager>,
    pub initial_scan: InitialScan,
    pub stats: CacheStats,
}

impl DiskCache {
    /// Absolute path of the cache directory
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.inner.config.cache_dir
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Completion handle for the scan that seeds the registry from
    /// pre-existing files
    pub fn initial_scan(&self) -> InitialScan {
        self.inner.initial_scan.clone()
    }

    /// Whether `self` and `other` share one registry
    pub fn same_instance(&self, other: &DiskCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(super) fn entry_path(&self, key: &str) -> PathBuf {
        crate::keys::KeyMapper::entry_path(&self.inner.config.cache_dir, key)
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("cache_dir", &self.inner.config.cache_dir)
            .field("entry_count", &self.inner.eviction.entry_count())
            .field("total_size", &self.inner.eviction.total_size())
            .finish()
    }
}
