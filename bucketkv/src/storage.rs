//! Bucket-aware storage wrapper.
//!
//! [`BucketStorage`] wraps the engine traits with composite key encoding and
//! maps engine errors into [`Error`]. It performs no validation; the
//! [`Store`](crate::Store) checks buckets, keys and the read-only flag first.

use std::sync::Arc;

use bytes::Bytes;
use common::{BytesRange, Record, RecordOp, Storage, StorageIterator};

use crate::config::WriteOptions;
use crate::error::Result;
use crate::model::{KeyValueEntry, ScanDirection};
use crate::serde::{bucket_range, decode_key, encode_key, range_after, range_before};

#[derive(Clone)]
pub(crate) struct BucketStorage {
    storage: Arc<dyn Storage>,
    options: WriteOptions,
}

impl BucketStorage {
    pub(crate) fn new(storage: Arc<dyn Storage>, options: WriteOptions) -> Self {
        Self { storage, options }
    }

    /// Gets the value stored under `(bucket, key)`.
    pub(crate) async fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Bytes>> {
        let record = self.storage.get(encode_key(bucket, key)).await?;
        Ok(record.map(|r| r.value))
    }

    /// Writes entries into one bucket as a single atomic batch.
    pub(crate) async fn put(&self, bucket: &[u8], entries: Vec<(Bytes, Bytes)>) -> Result<()> {
        let ops = entries
            .into_iter()
            .map(|(key, value)| RecordOp::Put(Record::new(encode_key(bucket, &key), value)))
            .collect();
        self.apply(ops).await
    }

    pub(crate) async fn delete(&self, bucket: &[u8], key: &[u8]) -> Result<()> {
        self.apply(vec![RecordOp::Delete(encode_key(bucket, key))])
            .await
    }

    /// Deletes raw composite keys as one atomic batch.
    pub(crate) async fn delete_raw(&self, keys: Vec<Bytes>) -> Result<()> {
        self.apply(keys.into_iter().map(RecordOp::Delete).collect())
            .await
    }

    async fn apply(&self, ops: Vec<RecordOp>) -> Result<()> {
        self.storage
            .apply_with_options(ops, self.options.into())
            .await?;
        Ok(())
    }

    /// Opens an iterator over `bucket` in `direction`, starting strictly past
    /// `from_key` when it is non-empty. `limit` caps what engines buffer to
    /// serve a reverse scan.
    pub(crate) async fn scan(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        direction: ScanDirection,
        limit: usize,
    ) -> Result<BucketScanIterator> {
        let range = match (from_key.is_empty(), direction) {
            (true, _) => bucket_range(bucket),
            (false, ScanDirection::Forward) => range_after(bucket, from_key),
            (false, ScanDirection::Reverse) => range_before(bucket, from_key),
        };
        let inner = match direction {
            ScanDirection::Forward => self.storage.scan_iter(range).await?,
            ScanDirection::Reverse => {
                self.storage
                    .scan_iter_rev_limited(range, limit)
                    .await?
            }
        };
        Ok(BucketScanIterator {
            bucket: Bytes::copy_from_slice(bucket),
            inner,
        })
    }

    /// Opens a forward iterator over the raw composite keys of `bucket`.
    pub(crate) async fn scan_raw(
        &self,
        bucket: &[u8],
    ) -> Result<Box<dyn StorageIterator + Send + 'static>> {
        let range: BytesRange = bucket_range(bucket);
        Ok(self.storage.scan_iter(range).await?)
    }

    pub(crate) async fn flush(&self) -> Result<()> {
        Ok(self.storage.flush().await?)
    }

    pub(crate) async fn close(&self) -> Result<()> {
        Ok(self.storage.close().await?)
    }

    pub(crate) async fn backup(&self, dest: &std::path::Path) -> Result<()> {
        Ok(self.storage.backup(dest).await?)
    }

    pub(crate) async fn restore(&self, src: &std::path::Path) -> Result<()> {
        Ok(self.storage.restore(src).await?)
    }
}

/// Iterator over the entries of one bucket.
pub(crate) struct BucketScanIterator {
    bucket: Bytes,
    inner: Box<dyn StorageIterator + Send>,
}

impl BucketScanIterator {
    /// Returns the next entry with the bucket prefix stripped.
    pub(crate) async fn next(&mut self) -> Result<Option<KeyValueEntry>> {
        match self.inner.next().await? {
            Some(record) => {
                let key = decode_key(&self.bucket, &record.key)?;
                Ok(Some(KeyValueEntry {
                    key,
                    value: record.value,
                }))
            }
            None => Ok(None),
        }
    }
}
