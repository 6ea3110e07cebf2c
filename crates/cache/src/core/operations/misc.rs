//! Clear, lookup and statistics operations

use crate::envelope::ExpiryEnvelope;
use crate::errors::Result;
use crate::store::EntryStore;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

use super::super::stats::CacheStatistics;
use super::super::types::DiskCache;

impl DiskCache {
    /// Delete every entry; failures are logged
    pub fn clear(&self) {
        if let Err(e) = self.try_clear() {
            self.inner.stats.record_error();
            warn!(cache_dir = %self.cache_dir().display(), error = %e, "cache clear failed");
        }
    }

    pub fn try_clear(&self) -> Result<()> {
        self.inner.eviction.clear()?;
        debug!(cache_dir = %self.cache_dir().display(), "cleared cache");
        Ok(())
    }

    /// Path of the entry file for `key`, if one exists.
    ///
    /// The file holds the envelope header followed by the payload. Expiry is
    /// not checked and the entry's usage time is not refreshed.
    pub fn file(&self, key: &str) -> Option<PathBuf> {
        let path = self.entry_path(key);
        path.is_file().then_some(path)
    }

    /// Whether `key` currently has a readable, unexpired entry.
    ///
    /// Does not refresh usage time and does not delete due entries.
    pub fn contains(&self, key: &str) -> bool {
        let Ok(bytes) = EntryStore::read(&self.entry_path(key)) else {
            return false;
        };
        matches!(
            ExpiryEnvelope::unwrap(&bytes),
            Ok(entry) if entry.key == key && !entry.is_due
        )
    }

    /// Bytes currently tracked against the size quota
    pub fn total_size(&self) -> u64 {
        self.inner.eviction.total_size()
    }

    /// Entries currently tracked against the count quota
    pub fn entry_count(&self) -> u64 {
        self.inner.eviction.entry_count()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let stats = &self.inner.stats;
        let quotas = self.inner.eviction.quotas();
        CacheStatistics {
            hits: stats.hits.load(Ordering::Relaxed),
            misses: stats.misses.load(Ordering::Relaxed),
            writes: stats.writes.load(Ordering::Relaxed),
            removals: stats.removals.load(Ordering::Relaxed),
            errors: stats.errors.load(Ordering::Relaxed),
            expired: stats.expired.load(Ordering::Relaxed),
            evictions: self.inner.eviction.evictions(),
            entry_count: self.inner.eviction.entry_count(),
            total_size: self.inner.eviction.total_size(),
            size_limit_bytes: quotas.size_limit_bytes,
            count_limit: quotas.count_limit,
            stats_since: stats.stats_since,
        }
    }
}
