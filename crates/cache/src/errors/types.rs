//! Core error types for the cache system

use std::path::PathBuf;
use std::time::Duration;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Re-export CacheError as Error for convenience
pub use CacheError as Error;

/// Error type for cache operations
#[derive(Debug)]
pub enum CacheError {
    /// I/O errors while reading, writing or deleting an entry
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
        recovery_hint: RecoveryHint,
    },

    /// Entry file is absent
    NotFound { path: PathBuf },

    /// Entry bytes could not be decoded as an envelope
    Corruption {
        path: PathBuf,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Two distinct keys resolved to the same entry file
    Collision {
        path: PathBuf,
        requested_key: String,
        stored_key: String,
    },

    /// Value encoding/decoding errors in the typed codecs
    Serialization {
        key: String,
        operation: SerializationOp,
        source: Box<dyn std::error::Error + Send + Sync>,
        recovery_hint: RecoveryHint,
    },

    /// Configuration error
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry { after: Duration },

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Delete the entry and write it again
    Recreate,

    /// Clear the cache and retry
    ClearAndRetry,

    /// Update cache configuration
    UpdateConfiguration,

    /// Operation can be safely ignored
    Ignore,

    /// No automated recovery possible
    Manual { instructions: String },
}

/// Serialization operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationOp {
    Encode,
    Decode,
}

impl CacheError {
    /// Build an [`CacheError::Io`] with a hint derived from the error kind
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        let recovery_hint = match source.kind() {
            std::io::ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
                path: path.clone(),
            },
            std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut => RecoveryHint::Retry {
                after: Duration::from_millis(100),
            },
            _ => RecoveryHint::Manual {
                instructions: "Check that the cache directory is writable".to_string(),
            },
        };

        Self::Io {
            path,
            operation,
            source,
            recovery_hint,
        }
    }

    /// Map a missing-file I/O error to [`CacheError::NotFound`]
    pub fn from_fs(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path: path.into() }
        } else {
            Self::io(path, operation, source)
        }
    }

    pub fn corruption(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corruption {
            path: path.into(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::Recreate,
        }
    }

    /// Attach the entry path to a path-less corruption error
    #[must_use]
    pub fn at_path(self, entry_path: &std::path::Path) -> Self {
        match self {
            Self::Corruption {
                path,
                reason,
                recovery_hint,
            } if path.as_os_str().is_empty() => Self::Corruption {
                path: entry_path.to_path_buf(),
                reason,
                recovery_hint,
            },
            other => other,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }

    pub fn serialization(
        key: &str,
        operation: SerializationOp,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            key: key.to_string(),
            operation,
            source: Box::new(source),
            recovery_hint: RecoveryHint::Recreate,
        }
    }
}
