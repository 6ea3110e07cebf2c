//! Cache remove operations

use crate::errors::{CacheError, Result};
use tracing::warn;

use super::super::types::DiskCache;

impl DiskCache {
    /// Remove `key`; `true` if an entry was deleted
    pub fn remove(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(removed) => removed,
            Err(e) => {
                self.inner.stats.record_error();
                warn!(key, error = %e, "cache remove failed");
                false
            }
        }
    }

    pub fn try_remove(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        match self.inner.eviction.remove(&path) {
            Ok(()) => {
                self.inner.stats.record_removal();
                Ok(true)
            }
            Err(CacheError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
