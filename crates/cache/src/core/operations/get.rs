//! Cache get operations

use crate::envelope::ExpiryEnvelope;
use crate::errors::{CacheError, Result};
use crate::store::EntryStore;
use std::path::Path;
use tracing::{debug, warn};

use super::super::types::DiskCache;

impl DiskCache {
    /// Value stored under `key`, or `None` on a miss.
    ///
    /// Missing, unreadable, corrupt and expired entries are all misses; the
    /// latter two are deleted as a side effect.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                self.inner.stats.record_error();
                warn!(key, error = %e, "cache get failed");
                None
            }
        }
    }

    /// Value stored under `key`, reporting read and decode failures.
    ///
    /// `Ok(None)` means the key is absent or its entry was due. Corrupt
    /// entries and entries belonging to a colliding key are deleted before
    /// the error is returned.
    pub fn try_get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);

        let bytes = match EntryStore::read(&path) {
            Ok(bytes) => bytes,
            Err(CacheError::NotFound { .. }) => {
                self.inner.stats.record_miss();
                // Deleted outside the cache; stop charging it against the quotas
                self.inner.eviction.forget_missing(&path);
                return Ok(None);
            }
            Err(e) => {
                self.inner.stats.record_miss();
                return Err(e);
            }
        };

        let entry = match ExpiryEnvelope::unwrap(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                self.inner.stats.record_miss();
                self.discard(&path);
                return Err(e.at_path(&path));
            }
        };

        if entry.key != key {
            self.inner.stats.record_miss();
            self.discard(&path);
            return Err(CacheError::Collision {
                path,
                requested_key: key.to_string(),
                stored_key: entry.key,
            });
        }

        if entry.is_due {
            self.inner.stats.record_miss();
            self.inner.stats.record_expired();
            self.discard(&path);
            debug!(key, "cache entry expired");
            return Ok(None);
        }

        self.inner.eviction.touch(&path);
        self.inner.stats.record_hit();
        Ok(Some(entry.payload.to_vec()))
    }

    /// Delete an entry found to be unusable during a read
    pub(in crate::core) fn discard(&self, path: &Path) {
        match self.inner.eviction.remove(path) {
            Ok(()) | Err(CacheError::NotFound { .. }) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to discard cache entry"),
        }
    }
}
