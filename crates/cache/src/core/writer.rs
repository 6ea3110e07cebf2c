//! Streaming writes
//!
//! An [`EntryWriter`] streams a value into a temporary file behind a
//! placeholder envelope header. Nothing is visible or counted against the
//! quotas until [`EntryWriter::commit`] succeeds; dropping the writer
//! discards the partial value.

use crate::envelope::{EnvelopeHeader, PAYLOAD_FIELDS_OFFSET};
use crate::errors::{CacheError, Result};
use crate::store::PendingFile;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::DiskCache;

/// Writer for streaming a value into the cache
pub struct EntryWriter {
    cache: DiskCache,
    key: String,
    pending: PendingFile,
    payload_len: u64,
    payload_crc: u32,
}

impl EntryWriter {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Payload bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.payload_len
    }

    /// Seal the header, move the entry into place and register it for
    /// eviction. Returns the payload length.
    pub fn commit(mut self) -> Result<u64> {
        let fields = EnvelopeHeader::encode_payload_fields(self.payload_len, self.payload_crc)?;
        self.pending.patch_at(PAYLOAD_FIELDS_OFFSET, &fields)?;

        let path = self.pending.final_path().to_path_buf();
        self.pending.commit()?;
        self.cache.inner.eviction.put_with_size(&path, self.payload_len);
        self.cache.inner.stats.record_write();

        debug!(key = %self.key, size = self.payload_len, "committed streamed value");
        Ok(self.payload_len)
    }
}

impl Write for EntryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.pending.write(buf)?;
        self.payload_crc = crc32c::crc32c_append(self.payload_crc, &buf[..n]);
        self.payload_len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.pending.flush()
    }
}

impl DiskCache {
    /// Start streaming a value for `key`, expiring `ttl` after this call
    pub fn writer(&self, key: &str, ttl: Option<Duration>) -> Result<EntryWriter> {
        let path = self.entry_path(key);
        let header = EnvelopeHeader::new(key, ttl).encode()?;

        let mut pending = PendingFile::create(&path)?;
        pending
            .write_all(&header)
            .map_err(|e| CacheError::io(&path, "write envelope header", e))?;

        Ok(EntryWriter {
            cache: self.clone(),
            key: key.to_string(),
            pending,
            payload_len: 0,
            payload_crc: 0,
        })
    }

    /// Copy `reader` into the cache under `key`, reporting failures.
    /// Returns the number of payload bytes stored.
    pub fn try_put_stream<R: Read>(
        &self,
        key: &str,
        mut reader: R,
        ttl: Option<Duration>,
    ) -> Result<u64> {
        let mut writer = self.writer(key, ttl)?;
        io::copy(&mut reader, &mut writer)
            .map_err(|e| CacheError::io(self.entry_path(key), "stream value into cache", e))?;
        writer.commit()
    }

    /// Copy `reader` into the cache under `key`; failures are logged and the
    /// partial value is discarded
    pub fn put_stream<R: Read>(&self, key: &str, reader: R, ttl: Option<Duration>) {
        if let Err(e) = self.try_put_stream(key, reader, ttl) {
            self.inner.stats.record_error();
            warn!(key, error = %e, "cache stream put failed");
        }
    }
}
