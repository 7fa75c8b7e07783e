//! Data types for BucketKV operations.

use bytes::Bytes;

/// A key-value entry returned by listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntry {
    /// The user key, without any bucket prefix.
    pub key: Bytes,
    /// The value.
    pub value: Bytes,
}

/// Order in which a listing walks a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanDirection {
    Forward,
    Reverse,
}

/// The fixed set of buckets a store accepts, in configured order.
///
/// Duplicates collapse onto their first occurrence. Empty names are dropped:
/// the empty bucket is the flat namespace and is always accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BucketList {
    names: Vec<Bytes>,
}

impl BucketList {
    pub(crate) fn new<I, B>(names: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut list: Vec<Bytes> = Vec::new();
        for name in names {
            let name = name.into();
            if !name.is_empty() && !list.contains(&name) {
                list.push(name);
            }
        }
        Self { names: list }
    }

    /// Whether `bucket` was configured. Never true for the flat namespace.
    pub(crate) fn contains(&self, bucket: &[u8]) -> bool {
        self.names.iter().any(|name| name.as_ref() == bucket)
    }

    /// Whether operations may address `bucket`.
    pub(crate) fn permits(&self, bucket: &[u8]) -> bool {
        bucket.is_empty() || self.contains(bucket)
    }

    pub(crate) fn names(&self) -> &[Bytes] {
        &self.names
    }
}
