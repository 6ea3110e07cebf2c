//! Typed convenience API over the byte core

use crate::codec::{BincodeCodec, Bitmap, BitmapCodec, JsonCodec, Utf8Codec, ValueCodec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use super::types::DiskCache;

impl DiskCache {
    /// Encode `value` with `codec` and store it; encode failures are logged
    pub fn put_as<C: ValueCodec>(
        &self,
        codec: &C,
        key: &str,
        value: &C::Value,
        ttl: Option<Duration>,
    ) {
        match codec.encode(value) {
            Ok(bytes) => self.put_bytes(key, &bytes, ttl),
            Err(e) => {
                self.inner.stats.record_error();
                warn!(key, error = %e, "failed to encode cache value");
            }
        }
    }

    /// Read and decode the value under `key`; undecodable values are misses
    pub fn get_as<C: ValueCodec>(&self, codec: &C, key: &str) -> Option<C::Value> {
        let bytes = self.get(key)?;
        match codec.decode(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                self.inner.stats.record_error();
                warn!(key, error = %e, "failed to decode cache value");
                None
            }
        }
    }

    pub fn put_string(&self, key: &str, value: &str, ttl: Option<Duration>) {
        self.put_bytes(key, value.as_bytes(), ttl);
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_as(&Utf8Codec, key)
    }

    /// Store any serde value as a JSON document
    pub fn put_json<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) {
        self.put_as(&JsonCodec::<T>::new(), key, value, ttl);
    }

    pub fn get_json<T: Serialize + DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_as(&JsonCodec::<T>::new(), key)
    }

    /// Store an untyped JSON object or array
    pub fn put_json_value(&self, key: &str, value: &serde_json::Value, ttl: Option<Duration>) {
        self.put_json(key, value, ttl);
    }

    pub fn get_json_value(&self, key: &str) -> Option<serde_json::Value> {
        self.get_json(key)
    }

    /// Store any serde value in compact binary form
    pub fn put_object<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) {
        self.put_as(&BincodeCodec::<T>::new(), key, value, ttl);
    }

    pub fn get_object<T: Serialize + DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_as(&BincodeCodec::<T>::new(), key)
    }

    pub fn put_bitmap(&self, key: &str, bitmap: &Bitmap, ttl: Option<Duration>) {
        self.put_as(&BitmapCodec, key, bitmap, ttl);
    }

    pub fn get_bitmap(&self, key: &str) -> Option<Bitmap> {
        self.get_as(&BitmapCodec, key)
    }
}
