//! The bucketed key-value facade.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use common::storage::factory::create_storage;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{BucketList, KeyValueEntry, ScanDirection};
use crate::storage::BucketStorage;

/// A key-value store partitioned into a fixed set of buckets.
///
/// Every operation names a bucket. The empty bucket is the flat namespace
/// and is always accepted; any other bucket must appear in
/// [`Config::buckets`] or the call fails with [`Error::UnknownBucket`].
/// Keys and values written through the store are never empty, so an empty
/// value read back means "absent".
///
/// Validation always completes before the engine is touched. A read-only
/// store rejects every mutation with [`Error::ReadOnly`], and its engine is
/// opened without write access as well.
///
/// `Store` is `Send + Sync` and all methods take `&self`, except
/// [`close`](Store::close), which consumes the handle.
///
/// # Example
///
/// ```ignore
/// use bucketkv::{Config, Store};
/// use bytes::Bytes;
///
/// let store = Store::open(Config::default().with_buckets(["posts"])).await?;
/// store.set(b"posts", Bytes::from("test_1"), Bytes::from("number one")).await?;
/// store.set(b"posts", Bytes::from("test_2"), Bytes::from("number two")).await?;
///
/// let page = store.list(b"posts", b"", 10).await?;
/// assert_eq!(page, Some(vec![Bytes::from("number one"), Bytes::from("number two")]));
///
/// let next = store.list(b"posts", b"test_1", 10).await?;
/// assert_eq!(next, Some(vec![Bytes::from("number two")]));
///
/// store.close().await?;
/// ```
pub struct Store {
    storage: BucketStorage,
    buckets: BucketList,
    read_only: bool,
    delete_batch_size: usize,
}

impl Store {
    /// Opens or creates a store with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unusable configuration and
    /// [`Error::Storage`] if the engine cannot be opened.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let storage = create_storage(&config.storage, config.read_only).await?;
        let store = Self::from_parts(storage, config);
        tracing::info!(
            buckets = store.buckets.names().len(),
            read_only = store.read_only,
            "opened store"
        );
        Ok(store)
    }

    /// Deletes everything a closed store persisted under `config`.
    ///
    /// The store must not be open anywhere. An in-memory configuration has
    /// nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] for a read-only configuration and
    /// [`Error::Storage`] if the objects cannot be listed or removed.
    pub async fn destroy(config: &Config) -> Result<()> {
        if config.read_only {
            return Err(Error::ReadOnly);
        }
        let removed = common::storage::util::delete(&config.storage).await?;
        tracing::info!(removed, "destroyed store");
        Ok(())
    }

    fn from_parts(storage: std::sync::Arc<dyn common::Storage>, config: Config) -> Self {
        Self {
            storage: BucketStorage::new(storage, config.write_options),
            buckets: BucketList::new(config.buckets),
            read_only: config.read_only,
            delete_batch_size: config.delete_batch_size,
        }
    }

    /// Creates a store over an existing storage implementation.
    #[cfg(test)]
    pub(crate) fn new(storage: std::sync::Arc<dyn common::Storage>, config: Config) -> Self {
        Self::from_parts(storage, config)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check_bucket(&self, bucket: &[u8]) -> Result<()> {
        if self.buckets.permits(bucket) {
            Ok(())
        } else {
            Err(Error::unknown_bucket(bucket))
        }
    }

    fn check_writable(&self, bucket: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.check_bucket(bucket)
    }

    fn check_entry(key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidInput("key must not be empty".to_string()));
        }
        if value.is_empty() {
            return Err(Error::InvalidInput("value must not be empty".to_string()));
        }
        Ok(())
    }

    /// Stores `value` under `key`, overwriting any previous value, and
    /// returns the key.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn set(&self, bucket: &[u8], key: Bytes, value: Bytes) -> Result<Bytes> {
        self.check_writable(bucket)?;
        Self::check_entry(&key, &value)?;

        self.storage
            .put(bucket, vec![(key.clone(), value)])
            .await
            .map_err(|e| e.context("set", bucket, Some(key.as_ref())))?;
        Ok(key)
    }

    /// Stores every entry atomically: either all of them become visible or
    /// none does. Any empty key or value rejects the whole batch.
    #[tracing::instrument(level = "debug", skip_all, fields(count = entries.len()))]
    pub async fn m_set(&self, bucket: &[u8], entries: Vec<(Bytes, Bytes)>) -> Result<()> {
        self.check_writable(bucket)?;
        for (key, value) in &entries {
            Self::check_entry(key, value)?;
        }
        if entries.is_empty() {
            return Ok(());
        }

        self.storage
            .put(bucket, entries)
            .await
            .map_err(|e| e.context("m_set", bucket, None))
    }

    /// Returns the value under `key`, or an empty value when it is absent.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Bytes> {
        self.check_bucket(bucket)?;

        let value = self
            .storage
            .get(bucket, key)
            .await
            .map_err(|e| e.context("get", bucket, Some(key)))?;
        Ok(value.unwrap_or_default())
    }

    /// Whether a non-empty value is stored under `key`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn key_exist(&self, bucket: &[u8], key: &[u8]) -> Result<bool> {
        let value = self.get(bucket, key).await?;
        Ok(!value.is_empty())
    }

    /// Removes `key`. Removing an absent key succeeds.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn delete(&self, bucket: &[u8], key: &[u8]) -> Result<()> {
        self.check_writable(bucket)?;
        if key.is_empty() {
            return Err(Error::InvalidInput("key must not be empty".to_string()));
        }

        self.storage
            .delete(bucket, key)
            .await
            .map_err(|e| e.context("delete", bucket, Some(key)))
    }

    /// Looks up each key independently.
    ///
    /// Best effort: keys that are absent, or whose lookup fails, are left out
    /// of the result instead of failing the call. Failures are logged. An
    /// unknown bucket still fails the whole call.
    #[tracing::instrument(level = "debug", skip_all, fields(count = keys.len()))]
    pub async fn m_get(&self, bucket: &[u8], keys: &[Bytes]) -> Result<HashMap<Bytes, Bytes>> {
        self.check_bucket(bucket)?;

        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            match self.storage.get(bucket, key).await {
                Ok(Some(value)) if !value.is_empty() => {
                    found.insert(key.clone(), value);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        bucket = %bucket.escape_ascii(),
                        key = %key.escape_ascii(),
                        error = %err,
                        "omitting key from m_get after failed lookup"
                    );
                }
            }
        }
        Ok(found)
    }

    /// Returns up to `page_size` values in ascending key order.
    ///
    /// With an empty `from_key` the page starts at the first key of the
    /// bucket; otherwise it starts strictly after `from_key`, which need not
    /// exist. Pass the last key of a page to fetch the next one (see
    /// [`list_entries`](Store::list_entries) for pages that carry keys).
    /// Returns `Ok(None)` when there is nothing left to list.
    pub async fn list(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        page_size: usize,
    ) -> Result<Option<Vec<Bytes>>> {
        let page = self.list_entries(bucket, from_key, page_size).await?;
        Ok(page.map(values))
    }

    /// Like [`list`](Store::list), walking backwards: descending key order,
    /// starting at the last key or strictly before `from_key`.
    ///
    /// Engines that only iterate forwards (SlateDB) read every key between
    /// the start of the bucket and `from_key` to serve a page, holding at
    /// most `page_size` entries at a time. Walking a large bucket backwards
    /// page by page is therefore quadratic in reads.
    pub async fn prev_list(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        page_size: usize,
    ) -> Result<Option<Vec<Bytes>>> {
        let page = self.prev_list_entries(bucket, from_key, page_size).await?;
        Ok(page.map(values))
    }

    /// [`list`](Store::list) returning keys alongside values.
    pub async fn list_entries(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        page_size: usize,
    ) -> Result<Option<Vec<KeyValueEntry>>> {
        self.page(bucket, from_key, page_size, ScanDirection::Forward)
            .await
    }

    /// [`prev_list`](Store::prev_list) returning keys alongside values.
    pub async fn prev_list_entries(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        page_size: usize,
    ) -> Result<Option<Vec<KeyValueEntry>>> {
        self.page(bucket, from_key, page_size, ScanDirection::Reverse)
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, bucket, from_key))]
    async fn page(
        &self,
        bucket: &[u8],
        from_key: &[u8],
        page_size: usize,
        direction: ScanDirection,
    ) -> Result<Option<Vec<KeyValueEntry>>> {
        self.check_bucket(bucket)?;
        if page_size == 0 {
            return Err(Error::InvalidInput(
                "page size must be greater than zero".to_string(),
            ));
        }

        let mut iter = self
            .storage
            .scan(bucket, from_key, direction, page_size)
            .await
            .map_err(|e| e.context("list", bucket, None))?;

        let mut entries = Vec::new();
        while entries.len() < page_size {
            match iter.next().await.map_err(|e| e.context("list", bucket, None))? {
                Some(entry) => entries.push(entry),
                None => break,
            }
        }

        if entries.is_empty() {
            Ok(None)
        } else {
            Ok(Some(entries))
        }
    }

    /// Whether `bucket` is one of the configured buckets.
    pub fn has_bucket(&self, bucket: &[u8]) -> bool {
        self.buckets.contains(bucket)
    }

    /// The configured buckets, in configuration order.
    pub fn list_bucket(&self) -> Vec<Bytes> {
        self.buckets.names().to_vec()
    }

    /// Removes every key in `bucket`; the bucket itself stays usable.
    ///
    /// Keys are deleted in atomic batches of at most
    /// [`Config::delete_batch_size`]. The operation as a whole is not
    /// atomic: the first failing batch aborts it, and batches committed
    /// before that stay deleted.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn delete_bucket(&self, bucket: &[u8]) -> Result<()> {
        self.check_writable(bucket)?;

        let mut iter = self
            .storage
            .scan_raw(bucket)
            .await
            .map_err(|e| e.context("delete_bucket", bucket, None))?;

        let mut batch = Vec::with_capacity(self.delete_batch_size);
        let mut deleted = 0usize;
        loop {
            let next = iter
                .next()
                .await
                .map_err(|e| Error::from(e).context("delete_bucket", bucket, None))?;
            let done = next.is_none();
            if let Some(record) = next {
                batch.push(record.key);
            }

            if batch.len() >= self.delete_batch_size || (done && !batch.is_empty()) {
                let count = batch.len();
                self.storage
                    .delete_raw(std::mem::take(&mut batch))
                    .await
                    .map_err(|e| e.context("delete_bucket", bucket, None))?;
                deleted += count;
            }

            if done {
                break;
            }
        }

        tracing::info!(bucket = %bucket.escape_ascii(), deleted, "deleted bucket contents");
        Ok(())
    }

    /// Flushes pending writes to durable storage.
    pub async fn flush(&self) -> Result<()> {
        self.storage.flush().await
    }

    /// Copies the store's persisted state to `dest`, if the engine can.
    pub async fn backup(&self, dest: &Path) -> Result<()> {
        self.storage.backup(dest).await
    }

    /// Replaces the store's contents with a backup taken from `src`.
    pub async fn restore(&self, src: &Path) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.storage.restore(src).await
    }

    /// Closes the store, releasing the engine.
    pub async fn close(self) -> Result<()> {
        self.storage.close().await?;
        tracing::info!("closed store");
        Ok(())
    }
}

fn values(entries: Vec<KeyValueEntry>) -> Vec<Bytes> {
    entries.into_iter().map(|entry| entry.value).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::StorageError;
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use rstest::rstest;

    use super::*;

    fn config() -> Config {
        Config::default().with_buckets(["posts", "pages"])
    }

    fn in_memory_store() -> Store {
        Store::new(Arc::new(InMemoryStorage::new()), config())
    }

    fn failing_store(batch: usize) -> (Store, Arc<FailingStorage>) {
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let store = Store::new(
            failing.clone(),
            Config {
                delete_batch_size: batch,
                ..config()
            },
        );
        (store, failing)
    }

    async fn seed(store: &Store, bucket: &[u8], keys: &[&str]) {
        for key in keys {
            store
                .set(bucket, Bytes::from(key.to_string()), Bytes::from(format!("v-{}", key)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn should_return_key_from_set() {
        // given
        let store = in_memory_store();

        // when
        let key = store
            .set(b"posts", Bytes::from("k"), Bytes::from("v"))
            .await
            .unwrap();

        // then
        assert_eq!(key, Bytes::from("k"));
        assert_eq!(store.get(b"posts", b"k").await.unwrap(), Bytes::from("v"));
    }

    #[rstest]
    #[case("", "v")]
    #[case("k", "")]
    #[tokio::test]
    async fn should_reject_empty_key_or_value(#[case] key: &str, #[case] value: &str) {
        // given
        let store = in_memory_store();

        // when
        let result = store
            .set(b"posts", Bytes::from(key.to_string()), Bytes::from(value.to_string()))
            .await;

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_reject_empty_key_on_delete() {
        let store = in_memory_store();

        let result = store.delete(b"posts", b"").await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_report_read_only_before_unknown_bucket() {
        // given
        let store = Store::new(
            Arc::new(InMemoryStorage::new()),
            config().with_read_only(true),
        );

        // when
        let result = store
            .set(b"nope", Bytes::from("k"), Bytes::from("v"))
            .await;

        // then
        assert_eq!(result, Err(Error::ReadOnly));
        assert!(store.is_read_only());
    }

    #[tokio::test]
    async fn should_reject_batch_with_any_empty_value() {
        // given
        let store = in_memory_store();

        // when
        let result = store
            .m_set(
                b"posts",
                vec![
                    (Bytes::from("a"), Bytes::from("1")),
                    (Bytes::from("b"), Bytes::new()),
                ],
            )
            .await;

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!store.key_exist(b"posts", b"a").await.unwrap());
    }

    #[tokio::test]
    async fn should_write_nothing_when_m_set_fails() {
        // given
        let (store, failing) = failing_store(16);
        failing.fail_apply_once(StorageError::Storage("disk full".into()));

        // when
        let result = store
            .m_set(
                b"posts",
                vec![
                    (Bytes::from("a"), Bytes::from("1")),
                    (Bytes::from("b"), Bytes::from("2")),
                ],
            )
            .await;

        // then
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(store.list(b"posts", b"", 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_omit_failed_lookups_from_m_get() {
        // given
        let (store, failing) = failing_store(16);
        seed(&store, b"posts", &["a", "b"]).await;
        failing.fail_get_once(StorageError::Storage("io error".into()));

        // when
        let found = store
            .m_get(
                b"posts",
                &[Bytes::from("a"), Bytes::from("b"), Bytes::from("missing")],
            )
            .await
            .unwrap();

        // then
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(&Bytes::from("b")), Some(&Bytes::from("v-b")));
    }

    #[tokio::test]
    async fn should_fail_m_get_for_unknown_bucket() {
        let store = in_memory_store();

        let result = store.m_get(b"nope", &[Bytes::from("a")]).await;

        assert_eq!(result, Err(Error::UnknownBucket("nope".to_string())));
    }

    #[tokio::test]
    async fn should_surface_get_failure_with_context() {
        // given
        let (store, failing) = failing_store(16);
        failing.fail_get_once(StorageError::Storage("io error".into()));

        // when
        let result = store.get(b"posts", b"a").await;

        // then
        assert_eq!(
            result,
            Err(Error::Storage(
                "get in bucket 'posts' at key 'a': io error".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn should_name_key_when_point_write_fails() {
        // given
        let (store, failing) = failing_store(16);

        // when
        failing.fail_apply_once(StorageError::Storage("disk full".into()));
        let set = store.set(b"posts", Bytes::from("k1"), Bytes::from("v")).await;
        failing.fail_apply_once(StorageError::Storage("disk full".into()));
        let delete = store.delete(b"pages", b"k2").await;

        // then
        assert_eq!(
            set,
            Err(Error::Storage(
                "set in bucket 'posts' at key 'k1': disk full".to_string()
            ))
        );
        assert_eq!(
            delete,
            Err(Error::Storage(
                "delete in bucket 'pages' at key 'k2': disk full".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn should_reject_zero_page_size() {
        let store = in_memory_store();

        let result = store.list(b"posts", b"", 0).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_cut_pages_at_page_size() {
        // given
        let store = in_memory_store();
        seed(&store, b"posts", &["a", "b", "c", "d", "e"]).await;

        // when
        let first = store.list_entries(b"posts", b"", 2).await.unwrap().unwrap();
        let cursor = first.last().unwrap().key.clone();
        let second = store.list(b"posts", &cursor, 2).await.unwrap();

        // then
        assert_eq!(first.len(), 2);
        assert_eq!(cursor, Bytes::from("b"));
        assert_eq!(second, Some(vec![Bytes::from("v-c"), Bytes::from("v-d")]));
    }

    #[tokio::test]
    async fn should_treat_missing_cursor_as_boundary() {
        // given
        let store = in_memory_store();
        seed(&store, b"posts", &["a", "c", "e"]).await;

        // when
        let forward = store.list(b"posts", b"b", 10).await.unwrap();
        let backward = store.prev_list(b"posts", b"d", 10).await.unwrap();

        // then
        assert_eq!(forward, Some(vec![Bytes::from("v-c"), Bytes::from("v-e")]));
        assert_eq!(backward, Some(vec![Bytes::from("v-c"), Bytes::from("v-a")]));
    }

    #[tokio::test]
    async fn should_surface_unsupported_reverse_iteration() {
        // given
        let failing = FailingStorage::forward_only(Arc::new(InMemoryStorage::new()));
        let store = Store::new(failing, config());
        seed(&store, b"posts", &["a"]).await;

        // when
        let result = store.prev_list(b"posts", b"", 10).await;

        // then
        assert!(matches!(result, Err(Error::Unsupported(_))));
        assert!(store.list(b"posts", b"", 10).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn should_propagate_scan_failure_instead_of_empty_page() {
        // given
        let (store, failing) = failing_store(16);
        seed(&store, b"posts", &["a"]).await;
        failing.fail_scan_once(StorageError::Storage("io error".into()));

        // when
        let result = store.list(b"posts", b"", 10).await;

        // then
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn should_delete_bucket_across_several_batches() {
        // given
        let (store, _) = failing_store(2);
        seed(&store, b"posts", &["a", "b", "c", "d", "e"]).await;
        seed(&store, b"pages", &["a"]).await;

        // when
        store.delete_bucket(b"posts").await.unwrap();

        // then
        assert_eq!(store.list(b"posts", b"", 10).await.unwrap(), None);
        assert_eq!(store.get(b"pages", b"a").await.unwrap(), Bytes::from("v-a"));
    }

    #[tokio::test]
    async fn should_abort_delete_bucket_on_first_engine_error() {
        // given
        let (store, failing) = failing_store(2);
        seed(&store, b"posts", &["a", "b", "c", "d", "e"]).await;
        failing.fail_apply_once(StorageError::Storage("io error".into()));

        // when
        let result = store.delete_bucket(b"posts").await;

        // then
        assert!(matches!(result, Err(Error::Storage(_))));
        let remaining = store.list(b"posts", b"", 10).await.unwrap().unwrap();
        assert_eq!(remaining.len(), 5);
    }

    #[tokio::test]
    async fn should_abort_delete_bucket_when_scan_fails() {
        // given
        let (store, failing) = failing_store(2);
        seed(&store, b"posts", &["a"]).await;
        failing.fail_scan_once(StorageError::Storage("io error".into()));

        // when
        let result = store.delete_bucket(b"posts").await;

        // then
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(store.key_exist(b"posts", b"a").await.unwrap());
    }

    #[tokio::test]
    async fn should_list_configured_buckets_in_order() {
        let store = Store::new(
            Arc::new(InMemoryStorage::new()),
            Config::default().with_buckets(["posts", "pages", "posts"]),
        );

        assert_eq!(
            store.list_bucket(),
            vec![Bytes::from("posts"), Bytes::from("pages")]
        );
        assert!(store.has_bucket(b"pages"));
        assert!(!store.has_bucket(b"users"));
        assert!(!store.has_bucket(b""));
    }

    #[tokio::test]
    async fn should_report_unsupported_backup_on_in_memory_engine() {
        let store = in_memory_store();

        let result = store.backup(Path::new("/tmp/backup")).await;

        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn should_reject_restore_on_read_only_store() {
        let store = Store::new(
            Arc::new(InMemoryStorage::new()),
            config().with_read_only(true),
        );

        let result = store.restore(Path::new("/tmp/backup")).await;

        assert_eq!(result, Err(Error::ReadOnly));
    }
}
