//! Cache put operations

use crate::envelope::ExpiryEnvelope;
use crate::errors::Result;
use crate::store::EntryStore;
use std::time::Duration;
use tracing::{debug, warn};

use super::super::types::DiskCache;

impl DiskCache {
    /// Store `value` under `key` with no expiry
    pub fn put(&self, key: &str, value: &[u8]) {
        self.put_bytes(key, value, None);
    }

    /// Store `value` under `key`, expiring `ttl` from now
    pub fn put_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) {
        self.put_bytes(key, value, Some(ttl));
    }

    /// Store `value` under `key`; failures are logged and otherwise ignored
    pub fn put_bytes(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        if let Err(e) = self.try_put(key, value, ttl) {
            self.inner.stats.record_error();
            warn!(key, error = %e, "cache put failed");
        }
    }

    /// Store `value` under `key`, reporting failures
    pub fn try_put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let path = self.entry_path(key);
        let wrapped = ExpiryEnvelope::wrap(key, value, ttl)?;

        EntryStore::write(&path, &wrapped)?;
        self.inner.eviction.put_with_size(&path, value.len() as u64);
        self.inner.stats.record_write();

        debug!(key, size = value.len(), ?ttl, "cached value");
        Ok(())
    }
}
