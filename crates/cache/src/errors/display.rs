//! Display implementations for cache errors

use super::types::CacheError;
use std::fmt;

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
                ..
            } => write!(
                f,
                "I/O error during {} on '{}': {}",
                operation,
                path.display(),
                source
            ),
            Self::NotFound { path } => {
                write!(f, "Cache entry not found: '{}'", path.display())
            }
            Self::Corruption { path, reason, .. } => write!(
                f,
                "Cache corruption detected in '{}': {reason}",
                path.display()
            ),
            Self::Collision {
                path,
                requested_key,
                stored_key,
            } => write!(
                f,
                "Key '{requested_key}' collides with stored key '{stored_key}' at '{}'",
                path.display()
            ),
            Self::Serialization {
                key,
                operation,
                source,
                ..
            } => write!(f, "Failed to {operation:?} cache entry '{key}': {source}"),
            Self::Configuration { message, .. } => {
                write!(f, "Cache configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialization { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
