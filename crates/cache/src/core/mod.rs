//! The disk cache facade
//!
//! [`DiskCache`] ties key mapping, the expiry envelope, entry storage and
//! eviction together behind a byte-oriented API. It is advisory: the plain
//! `put`/`get`/`remove`/`clear` methods never fail the caller and turn
//! storage errors into no-ops and misses. The `try_*` variants surface the
//! underlying [`CacheError`](crate::errors::CacheError) instead.
//!
//! Known races, accepted rather than locked away:
//! - There is no per-key locking. Two writers of one key race at the
//!   filesystem level; the last rename wins and quota accounting stays
//!   consistent.
//! - A reader racing eviction of its entry either reads the complete old
//!   file (it already had it open) or misses. Entries are replaced by
//!   rename and deleted by unlink, so a partial file is never observed.
//! - Operations issued before [`DiskCache::initial_scan`] completes see a
//!   registry that does not yet know about pre-existing files.

mod operations;
mod registry;
mod stats;
mod types;
mod typed;
mod writer;

pub use stats::CacheStatistics;
pub use types::DiskCache;
pub use writer::EntryWriter;

#[cfg(test)]
mod tests;
