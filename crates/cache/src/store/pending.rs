//! Commit-on-close entry file

use super::temp_path_for;
use crate::errors::{CacheError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A streamed entry that only appears at its final path after [`commit`].
///
/// Dropping a `PendingFile` without committing deletes the temporary file.
///
/// [`commit`]: PendingFile::commit
pub struct PendingFile {
    file: Option<BufWriter<File>>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl PendingFile {
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path_for(final_path)?;
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .map_err(|e| CacheError::io(&temp_path, "create temporary entry file", e))?;

        Ok(Self {
            file: Some(BufWriter::new(file)),
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Overwrite `bytes` at absolute `offset`, leaving the write position at the end
    pub fn patch_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let temp_path = &self.temp_path;
        let writer = self
            .file
            .as_mut()
            .ok_or_else(|| CacheError::io(temp_path, "patch entry file", closed()))?;

        (|| -> io::Result<()> {
            writer.flush()?;
            let file = writer.get_mut();
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(bytes)?;
            file.seek(SeekFrom::End(0))?;
            Ok(())
        })()
        .map_err(|e| CacheError::io(temp_path, "patch entry file", e))
    }

    /// Flush, sync and rename into place; returns the final file size
    pub fn commit(mut self) -> Result<u64> {
        let mut writer = self
            .file
            .take()
            .ok_or_else(|| CacheError::io(&self.temp_path, "commit entry file", closed()))?;

        let synced = (|| -> io::Result<u64> {
            writer.flush()?;
            let file = writer.get_ref();
            file.sync_all()?;
            Ok(file.metadata()?.len())
        })();
        drop(writer);

        let size = match synced {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&self.temp_path);
                return Err(CacheError::io(&self.temp_path, "sync temporary entry file", e));
            }
        };

        if let Err(e) = fs::rename(&self.temp_path, &self.final_path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(CacheError::io(
                &self.final_path,
                "rename entry file into place",
                e,
            ));
        }

        Ok(size)
    }
}

fn closed() -> io::Error {
    io::Error::other("pending file already closed")
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(writer) => writer.flush(),
            None => Err(closed()),
        }
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if let Some(writer) = self.file.take() {
            drop(writer);
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
