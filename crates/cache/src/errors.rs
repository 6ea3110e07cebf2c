//! Error handling for the disk cache
//!
//! Storage-layer operations return [`CacheError`] values carrying the path
//! and operation involved plus a [`RecoveryHint`]. The advisory facade
//! converts them into no-ops and misses at its boundary.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
