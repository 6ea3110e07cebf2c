//! Error conversion utilities

use super::types::{CacheError, RecoveryHint, SerializationOp};

/// Convert serde_json errors to cache errors
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        let operation = if error.is_io() {
            SerializationOp::Encode
        } else {
            SerializationOp::Decode
        };
        Self::Serialization {
            key: String::new(),
            operation,
            source: Box::new(error),
            recovery_hint: RecoveryHint::Manual {
                instructions: "Check JSON format and data types".to_string(),
            },
        }
    }
}

impl From<bincode::Error> for CacheError {
    fn from(error: bincode::Error) -> Self {
        Self::Serialization {
            key: String::new(),
            operation: SerializationOp::Decode,
            source: error,
            recovery_hint: RecoveryHint::Recreate,
        }
    }
}
