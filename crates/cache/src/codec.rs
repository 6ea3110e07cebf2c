//! Typed value codecs layered over the byte-oriented cache
//!
//! Each codec turns one value type into the bytes handed to the cache and
//! back. The cache core never sees anything but bytes.

use crate::errors::{CacheError, Result, SerializationOp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Conversion between a value type and cache payload bytes
pub trait ValueCodec {
    type Value;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value>;
}

/// UTF-8 strings
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl ValueCodec for Utf8Codec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CacheError::serialization("", SerializationOp::Decode, e))
    }
}

/// Typed JSON documents via serde_json
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ValueCodec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| CacheError::serialization("", SerializationOp::Encode, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| CacheError::serialization("", SerializationOp::Decode, e))
    }
}

/// Untyped JSON objects and arrays
pub type JsonValueCodec = JsonCodec<serde_json::Value>;

/// Arbitrary serde types in compact binary form
pub struct BincodeCodec<T>(PhantomData<fn() -> T>);

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> ValueCodec for BincodeCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| CacheError::serialization("", SerializationOp::Encode, e))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| CacheError::serialization("", SerializationOp::Decode, e))
    }
}

/// An RGBA8 image, row-major, four bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let bitmap = Self {
            width,
            height,
            rgba,
        };
        bitmap.check_dimensions()?;
        Ok(bitmap)
    }

    fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }

    fn check_dimensions(&self) -> Result<()> {
        if self.expected_len() == Some(self.rgba.len()) {
            return Ok(());
        }
        Err(CacheError::serialization(
            "",
            SerializationOp::Encode,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "{}x{} bitmap needs {} RGBA bytes, got {}",
                    self.width,
                    self.height,
                    u64::from(self.width) * u64::from(self.height) * 4,
                    self.rgba.len()
                ),
            ),
        ))
    }
}

/// Bitmaps with their dimensions, validated in both directions
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapCodec;

impl ValueCodec for BitmapCodec {
    type Value = Bitmap;

    fn encode(&self, value: &Bitmap) -> Result<Vec<u8>> {
        value.check_dimensions()?;
        BincodeCodec::<Bitmap>::new().encode(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Bitmap> {
        let bitmap = BincodeCodec::<Bitmap>::new().decode(bytes)?;
        bitmap.check_dimensions().map_err(|e| match e {
            CacheError::Serialization {
                key,
                source,
                recovery_hint,
                ..
            } => CacheError::Serialization {
                key,
                operation: SerializationOp::Decode,
                source,
                recovery_hint,
            },
            other => other,
        })?;
        Ok(bitmap)
    }
}
