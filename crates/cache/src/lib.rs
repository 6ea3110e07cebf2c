//! Persistent on-disk key/value cache
//!
//! This crate provides a disk-backed cache with:
//! - One file per entry, written atomically
//! - Per-entry expiry checked lazily on read
//! - Least-recently-used eviction under a byte quota and an entry-count quota
//! - Typed codecs layered over a byte-oriented core
//!
//! ```no_run
//! use diskcache::{CacheConfig, DiskCache};
//! use std::time::Duration;
//!
//! let cache = DiskCache::open(CacheConfig::new("/tmp/my-cache"))?;
//! cache.put_with_ttl("greeting", b"hello", Duration::from_secs(60));
//! assert_eq!(cache.get("greeting").as_deref(), Some(&b"hello"[..]));
//! # Ok::<(), diskcache::CacheError>(())
//! ```

mod clock;

pub mod codec;
pub mod config;
pub mod core;
pub mod envelope;
pub mod errors;
pub mod eviction;
pub mod keys;
pub mod store;

pub use codec::{
    BincodeCodec, Bitmap, BitmapCodec, JsonCodec, JsonValueCodec, Utf8Codec, ValueCodec,
};
pub use config::{CacheConfig, CacheConfigBuilder, CacheConfigLoader, ConfigSource};
pub use crate::core::{CacheStatistics, DiskCache, EntryWriter};
pub use envelope::{ExpiryEnvelope, Unwrapped};
pub use errors::{CacheError, Error, RecoveryHint, Result, SerializationOp};
pub use eviction::{EntryUsage, EvictionManager, InitialScan, Quotas, ScanOutcome};
pub use keys::KeyMapper;
pub use store::{EntryStore, PendingFile};
