//! Entry envelope: expiry metadata stored inline in front of the payload
//!
//! Every entry file is a bincode-encoded [`EnvelopeHeader`] followed by the
//! untouched payload bytes. The header records the absolute expiry time,
//! the payload length and CRC32C, and the logical key the entry was written
//! under.

use crate::clock::{epoch_millis, from_epoch_millis, now_millis};
use crate::errors::{CacheError, Result};
use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Magic number for entry files: "DKC1"
pub const ENVELOPE_MAGIC: u32 = 0x444B_4331;

/// Current envelope format version
pub const ENVELOPE_VERSION: u16 = 1;

/// Byte offset of `payload_len` (followed by `payload_crc`) in an encoded
/// header: magic (4) + version (2) + flags (2) + expire_at_ms (8)
pub const PAYLOAD_FIELDS_OFFSET: u64 = 16;

/// Leading bytes of an entry file that hold everything up to `payload_len`
pub const HEADER_PREFIX_LEN: usize = PAYLOAD_FIELDS_OFFSET as usize + 8;

/// Binary header written before every payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    magic: u32,
    version: u16,
    flags: u16,
    expire_at_ms: u64,
    payload_len: u64,
    payload_crc: u32,
    key: String,
}

impl EnvelopeHeader {
    const FLAG_EXPIRES: u16 = 1 << 0;

    /// Header for `key` expiring `ttl` from now; payload fields left zero
    pub fn new(key: &str, ttl: Option<Duration>) -> Self {
        let (flags, expire_at_ms) = match ttl {
            Some(ttl) => {
                let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                (Self::FLAG_EXPIRES, now_millis().saturating_add(ttl_ms))
            }
            None => (0, 0),
        };

        Self {
            magic: ENVELOPE_MAGIC,
            version: ENVELOPE_VERSION,
            flags,
            expire_at_ms,
            payload_len: 0,
            payload_crc: 0,
            key: key.to_string(),
        }
    }

    pub fn seal(&mut self, payload_len: u64, payload_crc: u32) {
        self.payload_len = payload_len;
        self.payload_crc = payload_crc;
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Encoded `payload_len` + `payload_crc`, to be written at
    /// [`PAYLOAD_FIELDS_OFFSET`] once a streamed payload is complete
    pub fn encode_payload_fields(payload_len: u64, payload_crc: u32) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&(payload_len, payload_crc))?)
    }

    /// Payload length recorded in the first [`HEADER_PREFIX_LEN`] bytes of
    /// an entry file, without decoding the key or checking the CRC.
    /// `None` if the bytes are not an envelope header.
    pub fn payload_len_from_prefix(prefix: &[u8]) -> Option<u64> {
        let (magic, version, _flags, _expire_at_ms, payload_len): (u32, u16, u16, u64, u64) =
            bincode::deserialize(prefix.get(..HEADER_PREFIX_LEN)?).ok()?;
        (magic == ENVELOPE_MAGIC && version <= ENVELOPE_VERSION).then_some(payload_len)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        (self.flags & Self::FLAG_EXPIRES != 0).then(|| from_epoch_millis(self.expire_at_ms))
    }

    /// Whether the entry is past its expiry at `now`
    pub fn is_due_at(&self, now: SystemTime) -> bool {
        self.flags & Self::FLAG_EXPIRES != 0 && epoch_millis(now) > self.expire_at_ms
    }

    fn validate(&self) -> Result<()> {
        if self.magic != ENVELOPE_MAGIC {
            return Err(CacheError::corruption(
                PathBuf::new(),
                format!(
                    "Invalid magic number: expected {:08x}, got {:08x}",
                    ENVELOPE_MAGIC, self.magic
                ),
            ));
        }

        if self.version > ENVELOPE_VERSION {
            return Err(CacheError::corruption(
                PathBuf::new(),
                format!("Unsupported envelope version: {}", self.version),
            ));
        }

        Ok(())
    }
}

/// A decoded entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped<'a> {
    pub key: String,
    pub payload: &'a [u8],
    pub expires_at: Option<SystemTime>,
    /// Expiry has passed as of the unwrap call
    pub is_due: bool,
}

/// Encoder/decoder for entry envelopes
pub struct ExpiryEnvelope;

impl ExpiryEnvelope {
    /// Prefix `payload` with a header for `key`; `None` never expires
    pub fn wrap(key: &str, payload: &[u8], ttl: Option<Duration>) -> Result<Vec<u8>> {
        let mut header = EnvelopeHeader::new(key, ttl);
        header.seal(payload.len() as u64, crc32c(payload));

        let mut bytes = header.encode()?;
        bytes.reserve_exact(payload.len());
        bytes.extend_from_slice(payload);
        Ok(bytes)
    }

    /// Decode an entry and classify it against the current wall clock
    pub fn unwrap(bytes: &[u8]) -> Result<Unwrapped<'_>> {
        Self::unwrap_at(bytes, SystemTime::now())
    }

    pub fn unwrap_at(bytes: &[u8], now: SystemTime) -> Result<Unwrapped<'_>> {
        if bytes.len() < 4 || bytes[..4] != ENVELOPE_MAGIC.to_le_bytes() {
            return Err(CacheError::corruption(
                PathBuf::new(),
                "missing envelope header",
            ));
        }

        let header: EnvelopeHeader = bincode::deserialize(bytes).map_err(|e| {
            CacheError::corruption(PathBuf::new(), format!("unreadable envelope header: {e}"))
        })?;
        header.validate()?;

        let header_len = bincode::serialized_size(&header)? as usize;
        let payload = &bytes[header_len..];

        if payload.len() as u64 != header.payload_len {
            return Err(CacheError::corruption(
                PathBuf::new(),
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    payload.len()
                ),
            ));
        }

        let actual_crc = crc32c(payload);
        if actual_crc != header.payload_crc {
            return Err(CacheError::corruption(
                PathBuf::new(),
                format!(
                    "Payload CRC mismatch: expected {:08x}, got {:08x}",
                    header.payload_crc, actual_crc
                ),
            ));
        }

        Ok(Unwrapped {
            is_due: header.is_due_at(now),
            expires_at: header.expires_at(),
            key: header.key,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_survives_unchanged() {
        let payload = b"\x00\xffraw bytes\n".to_vec();
        let wrapped = ExpiryEnvelope::wrap("k", &payload, None).unwrap();
        assert!(wrapped.ends_with(&payload));

        let entry = ExpiryEnvelope::unwrap(&wrapped).unwrap();
        assert_eq!(entry.payload, payload.as_slice());
        assert_eq!(entry.key, "k");
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_due);
    }

    #[test]
    fn test_entry_becomes_due_after_ttl() {
        let wrapped = ExpiryEnvelope::wrap("k", b"v", Some(Duration::from_secs(1))).unwrap();
        let now = SystemTime::now();

        assert!(!ExpiryEnvelope::unwrap_at(&wrapped, now).unwrap().is_due);
        assert!(
            ExpiryEnvelope::unwrap_at(&wrapped, now + Duration::from_secs(2))
                .unwrap()
                .is_due
        );
    }

    #[test]
    fn test_no_ttl_never_due() {
        let wrapped = ExpiryEnvelope::wrap("k", b"v", None).unwrap();
        let far_future = SystemTime::now() + Duration::from_secs(100 * 365 * 24 * 3600);
        assert!(!ExpiryEnvelope::unwrap_at(&wrapped, far_future).unwrap().is_due);
    }

    #[test]
    fn test_truncated_entry_is_corruption() {
        let wrapped = ExpiryEnvelope::wrap("k", b"some payload", None).unwrap();
        let truncated = &wrapped[..wrapped.len() - 3];
        assert!(matches!(
            ExpiryEnvelope::unwrap(truncated),
            Err(CacheError::Corruption { .. })
        ));
    }

    #[test]
    fn test_flipped_payload_bit_is_corruption() {
        let mut wrapped = ExpiryEnvelope::wrap("k", b"some payload", None).unwrap();
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0x01;
        match ExpiryEnvelope::unwrap(&wrapped) {
            Err(CacheError::Corruption { reason, .. }) => assert!(reason.contains("CRC")),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_bytes_are_corruption() {
        assert!(ExpiryEnvelope::unwrap(b"").is_err());
        assert!(ExpiryEnvelope::unwrap(b"1700000000-60 legacy").is_err());
    }

    #[test]
    fn test_payload_len_read_from_prefix() {
        let wrapped =
            ExpiryEnvelope::wrap("a rather long key", &[7u8; 40], Some(Duration::from_secs(5)))
                .unwrap();
        assert_eq!(EnvelopeHeader::payload_len_from_prefix(&wrapped), Some(40));
        assert_eq!(
            EnvelopeHeader::payload_len_from_prefix(&wrapped[..HEADER_PREFIX_LEN]),
            Some(40)
        );
        assert_eq!(
            EnvelopeHeader::payload_len_from_prefix(&wrapped[..HEADER_PREFIX_LEN - 1]),
            None
        );
        assert_eq!(EnvelopeHeader::payload_len_from_prefix(&[0u8; 64]), None);
    }

    #[test]
    fn test_payload_fields_offset_matches_encoding() {
        let mut header = EnvelopeHeader::new("some key", Some(Duration::from_secs(5)));
        header.seal(0xAABB_CCDD_0011_2233, 0x4455_6677);
        let encoded = header.encode().unwrap();

        let fields =
            EnvelopeHeader::encode_payload_fields(0xAABB_CCDD_0011_2233, 0x4455_6677).unwrap();
        let start = PAYLOAD_FIELDS_OFFSET as usize;
        assert_eq!(&encoded[start..start + fields.len()], fields.as_slice());
    }
}
