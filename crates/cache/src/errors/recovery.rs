//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::Corruption { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint.clone(),
            Self::NotFound { .. } => RecoveryHint::Ignore,
            Self::Collision { .. } => RecoveryHint::Recreate,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry { .. })
    }

    /// Whether the entry file behind this error should be discarded
    #[must_use]
    pub const fn invalidates_entry(&self) -> bool {
        matches!(self, Self::Corruption { .. } | Self::Collision { .. })
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = CacheError::from_fs("x", "read entry", IoError::from(ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.recovery_hint(), RecoveryHint::Ignore);
    }

    #[test]
    fn interrupted_io_is_transient() {
        let err = CacheError::io("x", "read entry", IoError::from(ErrorKind::Interrupted));
        assert!(err.is_transient());
        assert!(!err.invalidates_entry());
    }

    #[test]
    fn corruption_invalidates_entry() {
        let err = CacheError::corruption("x", "bad magic");
        assert!(err.invalidates_entry());
        assert_eq!(err.recovery_hint(), RecoveryHint::Recreate);
    }
}
