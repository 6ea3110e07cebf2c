//! Least-recently-used eviction under a byte quota and an entry-count quota
//!
//! The [`EvictionManager`] owns the usage registry for one cache directory:
//! each tracked entry file maps to its size and last-used stamp. Running
//! totals live in atomics so they can be read without touching the
//! registry. Picking a victim iterates the registry under `scan_lock`;
//! deleting the victim's file happens after the lock is released.
//!
//! The size quota counts payload bytes. Envelope headers are not charged,
//! so an entry costs exactly the length of the value stored in it.

mod scan;

pub use scan::{InitialScan, ScanOutcome};

use crate::clock::UsageClock;
use crate::envelope::{EnvelopeHeader, HEADER_PREFIX_LEN};
use crate::errors::{CacheError, Result};
use crate::keys::KeyMapper;
use crate::store::EntryStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable quotas enforced on every insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub size_limit_bytes: u64,
    pub count_limit: u64,
}

/// Registry record for one entry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryUsage {
    pub size: u64,
    /// Usage stamp in epoch milliseconds, unique per manager
    pub last_used_ms: u64,
}

/// Usage registry and quota enforcement for one cache directory
pub struct EvictionManager {
    cache_dir: PathBuf,
    quotas: Quotas,
    usage: DashMap<PathBuf, EntryUsage>,
    /// Held while iterating `usage` to pick a victim or to clear
    scan_lock: Mutex<()>,
    total_size: AtomicU64,
    entry_count: AtomicU64,
    evictions: AtomicU64,
    clock: UsageClock,
}

impl EvictionManager {
    /// Create a manager and start seeding it from the files already in
    /// `cache_dir` on a background thread.
    ///
    /// Operations issued before the returned [`InitialScan`] completes race
    /// the scan: quotas are enforced against whatever has been registered so
    /// far.
    pub fn start(cache_dir: PathBuf, quotas: Quotas) -> Result<(Arc<Self>, InitialScan)> {
        let manager = Arc::new(Self::new(cache_dir, quotas));
        let scan = scan::spawn(Arc::clone(&manager))?;
        Ok((manager, scan))
    }

    /// Create a manager with an empty registry and no background scan
    pub fn new(cache_dir: PathBuf, quotas: Quotas) -> Self {
        Self {
            cache_dir,
            quotas,
            usage: DashMap::new(),
            scan_lock: Mutex::new(()),
            total_size: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            clock: UsageClock::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn quotas(&self) -> Quotas {
        self.quotas
    }

    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::Acquire)
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Acquire)
    }

    /// Entries evicted by quota enforcement since creation
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn usage_of(&self, path: &Path) -> Option<EntryUsage> {
        self.usage.get(path).map(|r| *r.value())
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.usage.contains_key(path)
    }

    /// Bytes `path` is charged against the size quota: the payload length
    /// from its envelope header, or the whole file when it has none
    pub fn accounted_size(path: &Path) -> Result<u64> {
        let mut file =
            File::open(path).map_err(|e| CacheError::from_fs(path, "open entry file", e))?;
        let file_len = file
            .metadata()
            .map_err(|e| CacheError::from_fs(path, "stat entry file", e))?
            .len();

        let mut prefix = Vec::with_capacity(HEADER_PREFIX_LEN);
        file.take(HEADER_PREFIX_LEN as u64)
            .read_to_end(&mut prefix)
            .map_err(|e| CacheError::io(path, "read entry header", e))?;

        Ok(match EnvelopeHeader::payload_len_from_prefix(&prefix) {
            Some(payload_len) if payload_len <= file_len => payload_len,
            _ => file_len,
        })
    }

    /// Register an entry file already on disk, charging its
    /// [`accounted_size`](Self::accounted_size)
    pub fn put(&self, path: &Path) -> Result<()> {
        let size = Self::accounted_size(path)?;
        self.put_with_size(path, size);
        Ok(())
    }

    /// Register a freshly written entry file charged at `new_size` bytes,
    /// evicting older entries as needed to keep both quotas.
    ///
    /// Count is enforced first, then size. Eviction stops early if the
    /// registry runs dry, so a single entry larger than the byte quota is
    /// still admitted.
    pub fn put_with_size(&self, path: &Path, new_size: u64) {
        // A replaced entry gives back its old contribution first and can
        // never be chosen as its own victim.
        if let Some((_, previous)) = self.usage.remove(path) {
            self.release(previous.size);
        }

        while self.entry_count() >= self.quotas.count_limit {
            if self.evict_one().is_none() {
                break;
            }
        }
        self.entry_count.fetch_add(1, Ordering::AcqRel);

        while self.total_size().saturating_add(new_size) > self.quotas.size_limit_bytes {
            if self.evict_one().is_none() {
                break;
            }
        }
        self.total_size.fetch_add(new_size, Ordering::AcqRel);

        let record = EntryUsage {
            size: new_size,
            last_used_ms: self.clock.stamp(),
        };
        if let Some(raced) = self.usage.insert(path.to_path_buf(), record) {
            // The initial scan registered this path while we were evicting
            self.release(raced.size);
        }

        debug!(
            path = %path.display(),
            size = new_size,
            total_size = self.total_size(),
            entry_count = self.entry_count(),
            "registered cache entry"
        );
    }

    /// Refresh the usage stamp of `path` after a successful read.
    ///
    /// An entry file that is not yet tracked (read before the initial scan
    /// reached it) is adopted with its current size.
    pub fn touch(&self, path: &Path) {
        if let Some(mut record) = self.usage.get_mut(path) {
            record.last_used_ms = self.clock.stamp();
            return;
        }

        let Ok(size) = Self::accounted_size(path) else {
            return;
        };
        let stamp = self.clock.stamp();
        match self.usage.entry(path.to_path_buf()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().last_used_ms = stamp,
            Entry::Vacant(vacant) => {
                vacant.insert(EntryUsage {
                    size,
                    last_used_ms: stamp,
                });
                self.admit(size);
            }
        }
    }

    /// Delete `path` and stop tracking it
    pub fn remove(&self, path: &Path) -> Result<()> {
        let deleted = EntryStore::remove(path)?;
        let record = self.usage.remove(path);

        if let Some((_, usage)) = record {
            self.release(usage.size);
        } else if !deleted {
            return Err(CacheError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Drop the record for `path` if its file no longer exists.
    ///
    /// Used when a read finds a tracked file gone; a file written again in
    /// the meantime keeps its record.
    pub fn forget_missing(&self, path: &Path) -> bool {
        match self.usage.remove_if(path, |p, _| !p.exists()) {
            Some((_, usage)) => {
                self.release(usage.size);
                debug!(path = %path.display(), "forgot cache entry deleted behind our back");
                true
            }
            None => false,
        }
    }

    /// Evict the least recently used entry, returning the bytes freed.
    ///
    /// Returns 0 when nothing is tracked.
    pub fn evict_oldest(&self) -> u64 {
        self.evict_one().unwrap_or(0)
    }

    /// `None` only when the registry is empty
    fn evict_one(&self) -> Option<u64> {
        let (victim, usage) = {
            let _guard = self.scan_lock.lock();
            let victim = self
                .usage
                .iter()
                .min_by_key(|r| r.value().last_used_ms)
                .map(|r| r.key().clone())?;
            match self.usage.remove(&victim) {
                Some(removed) => removed,
                // Removed concurrently between the scan and here
                None => return Some(0),
            }
        };

        if let Err(e) = EntryStore::remove(&victim) {
            warn!(path = %victim.display(), error = %e, "failed to delete evicted cache entry");
        }
        self.release(usage.size);
        self.evictions.fetch_add(1, Ordering::Relaxed);

        debug!(
            path = %victim.display(),
            freed = usage.size,
            last_used_ms = usage.last_used_ms,
            "evicted cache entry"
        );
        Some(usage.size)
    }

    /// Delete every entry file in the directory and reset the registry.
    ///
    /// All files are attempted; the first deletion error is returned.
    pub fn clear(&self) -> Result<()> {
        let tracked: Vec<PathBuf> = {
            let _guard = self.scan_lock.lock();
            let paths = self.usage.iter().map(|r| r.key().clone()).collect();
            self.usage.clear();
            self.total_size.store(0, Ordering::Release);
            self.entry_count.store(0, Ordering::Release);
            paths
        };

        let mut first_error = None;
        for path in tracked.iter().chain(self.entry_files_on_disk().iter()) {
            if let Err(e) = EntryStore::remove(path) {
                warn!(path = %path.display(), error = %e, "failed to delete cache entry during clear");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn entry_files_on_disk(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(KeyMapper::is_entry_file_name)
            })
            .map(|entry| entry.path())
            .collect()
    }

    /// Register a file found on disk, unless a concurrent `put` got there first.
    /// Returns whether the file was newly tracked.
    pub(crate) fn register_existing(&self, path: PathBuf, size: u64, modified_ms: u64) -> bool {
        self.clock.observe(modified_ms);
        match self.usage.entry(path) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(EntryUsage {
                    size,
                    last_used_ms: modified_ms,
                });
                self.admit(size);
                true
            }
        }
    }

    fn admit(&self, size: u64) {
        self.entry_count.fetch_add(1, Ordering::AcqRel);
        self.total_size.fetch_add(size, Ordering::AcqRel);
    }

    fn release(&self, size: u64) {
        saturating_sub(&self.entry_count, 1);
        saturating_sub(&self.total_size, size);
    }
}

fn saturating_sub(counter: &AtomicU64, amount: u64) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        Some(current.saturating_sub(amount))
    });
}

impl std::fmt::Debug for EvictionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionManager")
            .field("cache_dir", &self.cache_dir)
            .field("quotas", &self.quotas)
            .field("total_size", &self.total_size())
            .field("entry_count", &self.entry_count())
            .finish()
    }
}
