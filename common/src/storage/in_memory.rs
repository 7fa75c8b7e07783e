use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{RecordOp, Storage, VecIterator, WriteOptions};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// This implementation stores all data in memory and is useful for testing
/// or scenarios where durability is not required. Scans copy the matching
/// range under the read lock, so every iterator sees a consistent snapshot
/// regardless of later writes.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn collect_range(&self, range: &BytesRange) -> StorageResult<Vec<Record>> {
        // BTreeMap::range panics on inverted bounds
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .range((range.start_bound().cloned(), range.end_bound().cloned()))
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).map(|value| Record::new(key, value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let records = self.collect_range(&range)?;
        Ok(Box::new(VecIterator::new(records)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let mut records = self.collect_range(&range)?;
        records.reverse();
        Ok(Box::new(VecIterator::new(records)))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    /// Applies the batch under a single write lock acquisition.
    ///
    /// Write options are ignored since there is no durable storage to await.
    async fn apply_with_options(
        &self,
        ops: Vec<RecordOp>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    async fn flush(&self) -> StorageResult<()> {
        // No-op for in-memory storage - all writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Injected error slot; a stored error fires on the next matching call.
#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<StorageError>>;

/// Takes the error out of a [`FailSlot`], if one is set.
///
/// The slot is atomically swapped to `None` so the error fires exactly once.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    if slot.load().is_none() {
        return Ok(());
    }
    match slot.swap(Arc::new(None)).as_ref() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into `get`, `apply`, and the scans on demand.
///
/// Each injected failure is returned by the next matching call, then cleared.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
/// storage.fail_get_once(StorageError::Storage("io error".into()));
/// // only the next get returns Err(...), then auto-clears
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_get: FailSlot,
    fail_apply: FailSlot,
    fail_scan: FailSlot,
    reverse_supported: bool,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self::new(inner, true))
    }

    /// Wraps an existing storage, hiding its reverse iteration as an engine
    /// without that capability would.
    pub fn forward_only(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self::new(inner, false))
    }

    fn new(inner: Arc<dyn Storage>, reverse_supported: bool) -> Self {
        Self {
            inner,
            fail_get: arc_swap::ArcSwap::from_pointee(None),
            fail_apply: arc_swap::ArcSwap::from_pointee(None),
            fail_scan: arc_swap::ArcSwap::from_pointee(None),
            reverse_supported,
        }
    }

    /// Makes `get` return the given error on the next call only.
    pub fn fail_get_once(&self, err: StorageError) {
        self.fail_get.store(Arc::new(Some(err)));
    }

    /// Makes `apply` (and the puts built on it) return the given error on
    /// the next call only.
    pub fn fail_apply_once(&self, err: StorageError) {
        self.fail_apply.store(Arc::new(Some(err)));
    }

    /// Makes the next scan, in either direction, return the given error.
    pub fn fail_scan_once(&self, err: StorageError) {
        self.fail_scan.store(Arc::new(Some(err)));
    }

    fn check_reverse(&self) -> StorageResult<()> {
        if !self.reverse_supported {
            return Err(StorageError::Unsupported(
                "reverse iteration is not supported by this engine".to_string(),
            ));
        }
        check_failure(&self.fail_scan)
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_iter(range).await
    }

    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.check_reverse()?;
        self.inner.scan_iter_rev(range).await
    }

    async fn scan_iter_rev_limited(
        &self,
        range: BytesRange,
        limit: usize,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.check_reverse()?;
        self.inner.scan_iter_rev_limited(range, limit).await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn apply_with_options(
        &self,
        ops: Vec<RecordOp>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        check_failure(&self.fail_apply)?;
        self.inner.apply_with_options(ops, options).await
    }

    async fn flush(&self) -> StorageResult<()> {
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use super::*;

    async fn seeded(keys: &[&'static str]) -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        let records = keys
            .iter()
            .map(|k| Record::new(Bytes::from(*k), Bytes::from(format!("value_{}", k))))
            .collect();
        storage.put(records).await.unwrap();
        storage
    }

    async fn drain(mut iter: Box<dyn StorageIterator + Send>) -> Vec<Bytes> {
        let mut keys = Vec::new();
        while let Some(record) = iter.next().await.unwrap() {
            keys.push(record.key);
        }
        keys
    }

    #[tokio::test]
    async fn should_return_none_when_key_not_found() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.get(Bytes::from("missing_key")).await.unwrap();

        // then
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        let key = Bytes::from("test_key");
        storage
            .put(vec![Record::new(key.clone(), Bytes::from("initial"))])
            .await
            .unwrap();

        // when
        storage
            .put(vec![Record::new(key.clone(), Bytes::from("updated"))])
            .await
            .unwrap();

        // then
        let record = storage.get(key).await.unwrap().unwrap();
        assert_eq!(record.value, Bytes::from("updated"));
    }

    #[tokio::test]
    async fn should_apply_puts_and_deletes_in_one_batch() {
        // given
        let storage = seeded(&["a", "b"]).await;

        // when
        storage
            .apply(vec![
                RecordOp::Delete(Bytes::from("a")),
                Record::new(Bytes::from("c"), Bytes::from("value_c")).into(),
                RecordOp::Delete(Bytes::from("missing")),
            ])
            .await
            .unwrap();

        // then
        let keys = drain(storage.scan_iter(BytesRange::unbounded()).await.unwrap()).await;
        assert_eq!(keys, vec![Bytes::from("b"), Bytes::from("c")]);
    }

    #[tokio::test]
    async fn should_scan_records_with_prefix() {
        // given
        let storage = seeded(&["prefix_a", "prefix_b", "other_c"]).await;

        // when
        let scanned = storage
            .scan(BytesRange::prefix(Bytes::from("prefix_")))
            .await
            .unwrap();

        // then
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].key, Bytes::from("prefix_a"));
        assert_eq!(scanned[1].key, Bytes::from("prefix_b"));
    }

    #[tokio::test]
    async fn should_scan_records_in_bounded_range() {
        // given
        let storage = seeded(&["a", "b", "c", "d"]).await;

        // when
        let range = BytesRange::new(
            Bound::Included(Bytes::from("b")),
            Bound::Excluded(Bytes::from("d")),
        );
        let keys = drain(storage.scan_iter(range).await.unwrap()).await;

        // then
        assert_eq!(keys, vec![Bytes::from("b"), Bytes::from("c")]);
    }

    #[tokio::test]
    async fn should_scan_range_in_reverse() {
        // given
        let storage = seeded(&["a", "b", "c", "d"]).await;

        // when
        let range = BytesRange::new(Bound::Unbounded, Bound::Excluded(Bytes::from("d")));
        let keys = drain(storage.scan_iter_rev(range).await.unwrap()).await;

        // then
        assert_eq!(
            keys,
            vec![Bytes::from("c"), Bytes::from("b"), Bytes::from("a")]
        );
    }

    #[tokio::test]
    async fn should_not_see_writes_made_after_scan_started() {
        // given
        let storage = seeded(&["a", "b"]).await;
        let mut iter = storage.scan_iter(BytesRange::unbounded()).await.unwrap();

        // when
        storage
            .apply(vec![
                RecordOp::Delete(Bytes::from("b")),
                Record::new(Bytes::from("c"), Bytes::from("value_c")).into(),
            ])
            .await
            .unwrap();

        // then
        assert_eq!(iter.next().await.unwrap().unwrap().key, Bytes::from("a"));
        assert_eq!(iter.next().await.unwrap().unwrap().key, Bytes::from("b"));
        assert!(iter.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_return_empty_vec_when_scanning_empty_storage() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let scanned = storage.scan(BytesRange::unbounded()).await.unwrap();

        // then
        assert!(scanned.is_empty());
    }

    #[tokio::test]
    async fn should_report_backup_unsupported() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.backup(std::path::Path::new("/tmp/backup")).await;

        // then
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }
}
