//! Mapping from logical cache keys to entry file names
//!
//! File names are the hex-encoded 128-bit XXH3 digest of the key. The key
//! itself is also stored in each entry's envelope so that a digest collision
//! is detected on read instead of silently returning another key's value.

use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_128;

/// Length of an entry file name in hex characters
pub const FILE_NAME_LEN: usize = 32;

/// Deterministic key to path mapping for one flat cache directory
pub struct KeyMapper;

impl KeyMapper {
    /// Hex digest used as the entry's file name
    #[inline]
    pub fn file_name(key: &str) -> String {
        hex::encode(xxh3_128(key.as_bytes()).to_be_bytes())
    }

    /// Full path of the entry file for `key` inside `cache_dir`
    pub fn entry_path(cache_dir: &Path, key: &str) -> PathBuf {
        cache_dir.join(Self::file_name(key))
    }

    /// Whether `name` looks like a file produced by [`KeyMapper::file_name`]
    pub fn is_entry_file_name(name: &str) -> bool {
        name.len() == FILE_NAME_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}
