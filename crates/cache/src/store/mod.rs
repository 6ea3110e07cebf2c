//! Full-file storage of entry bytes
//!
//! Writes go to a uniquely named temporary file in the cache directory and
//! are renamed over the destination once complete, so a reader sees either
//! the previous entry or the new one and never a partial file.

mod pending;

pub use pending::PendingFile;

use crate::errors::{CacheError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix of in-flight temporary files
pub const TEMP_SUFFIX: &str = ".tmp";

/// Entry file I/O with atomic replacement
pub struct EntryStore;

impl EntryStore {
    /// Atomically replace the file at `path` with `bytes`, returning its size
    pub fn write(path: &Path, bytes: &[u8]) -> Result<u64> {
        let temp_path = temp_path_for(path)?;

        let result = (|| -> Result<()> {
            let mut file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp_path)
                .map_err(|e| CacheError::io(&temp_path, "create temporary entry file", e))?;

            file.write_all(bytes)
                .map_err(|e| CacheError::io(&temp_path, "write temporary entry file", e))?;

            file.sync_all()
                .map_err(|e| CacheError::io(&temp_path, "sync temporary entry file", e))?;

            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CacheError::io(path, "rename entry file into place", e)
        })?;

        Ok(bytes.len() as u64)
    }

    /// Read the whole entry file
    pub fn read(path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| CacheError::from_fs(path, "read entry file", e))
    }

    /// Size of the entry file on disk
    pub fn size(path: &Path) -> Result<u64> {
        fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| CacheError::from_fs(path, "stat entry file", e))
    }

    /// Delete the entry file; `Ok(false)` if it was already gone
    pub fn remove(path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, "remove entry file", e)),
        }
    }

    pub fn is_temp_file_name(name: &str) -> bool {
        name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
    }
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| CacheError::configuration("entry path has no parent directory"))?;
    Ok(parent.join(format!(".{}{TEMP_SUFFIX}", uuid::Uuid::new_v4())))
}

#[cfg(test)]
mod tests;
