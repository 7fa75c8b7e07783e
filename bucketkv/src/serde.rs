//! Composite key encoding for bucketed storage.
//!
//! ```text
//! flat namespace: | version (u8) | 0x10 | user_key (bytes) |
//! bucketed:       | version (u8) | 0x20 | terminated(bucket) | user_key (bytes) |
//! ```
//!
//! Bucket names are written with the `terminated_bytes` encoding, which is
//! prefix-free: the prefix of `post` is never a prefix of the prefix of
//! `posts`, and a user key can never be mistaken for the tail of a bucket
//! name. Within a bucket, composite keys sort exactly as their user keys.

use bytes::{BufMut, Bytes, BytesMut};
use common::BytesRange;
use common::serde::terminated_bytes;

use crate::error::{Error, Result};

/// Key format version.
pub const KEY_VERSION: u8 = 0x01;

/// Record tag for keys in the flat namespace.
pub const FLAT_TAG: u8 = 0x10;

/// Record tag for keys inside a named bucket.
pub const BUCKET_TAG: u8 = 0x20;

/// The composite key of `bucket` with an empty user key.
///
/// Every key in the bucket starts with these bytes, and no key of another
/// bucket does.
pub fn bucket_prefix(bucket: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(prefix_len(bucket));
    put_prefix(bucket, &mut buf);
    buf.freeze()
}

fn prefix_len(bucket: &[u8]) -> usize {
    if bucket.is_empty() {
        2
    } else {
        2 + terminated_bytes::encoded_len(bucket)
    }
}

fn put_prefix(bucket: &[u8], buf: &mut BytesMut) {
    buf.put_u8(KEY_VERSION);
    if bucket.is_empty() {
        buf.put_u8(FLAT_TAG);
    } else {
        buf.put_u8(BUCKET_TAG);
        terminated_bytes::serialize(bucket, buf);
    }
}

/// Encodes `(bucket, key)` into the composite key stored in the engine.
pub fn encode_key(bucket: &[u8], key: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(prefix_len(bucket) + key.len());
    put_prefix(bucket, &mut buf);
    buf.extend_from_slice(key);
    buf.freeze()
}

/// Every composite key of `bucket`.
pub fn bucket_range(bucket: &[u8]) -> BytesRange {
    BytesRange::prefix(bucket_prefix(bucket))
}

/// Composite keys of `bucket` whose user key sorts strictly after `key`.
pub fn range_after(bucket: &[u8], key: &[u8]) -> BytesRange {
    BytesRange::prefix_after(bucket_prefix(bucket), encode_key(bucket, key))
}

/// Composite keys of `bucket` whose user key sorts strictly before `key`.
pub fn range_before(bucket: &[u8], key: &[u8]) -> BytesRange {
    BytesRange::prefix_before(bucket_prefix(bucket), encode_key(bucket, key))
}

/// Strips the prefix of `bucket` from a composite key, returning the user key.
pub fn decode_key(bucket: &[u8], storage_key: &Bytes) -> Result<Bytes> {
    if storage_key.len() < 2 {
        return Err(Error::Encoding(format!(
            "key too short: expected at least 2 bytes, got {}",
            storage_key.len()
        )));
    }

    if storage_key[0] != KEY_VERSION {
        return Err(Error::Encoding(format!(
            "invalid key version: expected 0x{:02x}, got 0x{:02x}",
            KEY_VERSION, storage_key[0]
        )));
    }

    let expected_tag = if bucket.is_empty() {
        FLAT_TAG
    } else {
        BUCKET_TAG
    };
    if storage_key[1] != expected_tag {
        return Err(Error::Encoding(format!(
            "invalid record tag: expected 0x{:02x}, got 0x{:02x}",
            expected_tag, storage_key[1]
        )));
    }

    let prefix = bucket_prefix(bucket);
    if !storage_key.starts_with(&prefix) {
        return Err(Error::Encoding(format!(
            "key does not belong to bucket '{}'",
            bucket.escape_ascii()
        )));
    }

    Ok(storage_key.slice(prefix.len()..))
}
