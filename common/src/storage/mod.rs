pub mod config;
pub mod factory;
pub mod in_memory;
pub mod read_only;
pub mod slate;
pub mod util;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::BytesRange;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// A single mutation inside an atomic [`Storage::apply`] batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordOp {
    Put(Record),
    Delete(Bytes),
}

impl From<Record> for RecordOp {
    fn from(record: Record) -> Self {
        RecordOp::Put(record)
    }
}

/// Options for write operations.
///
/// Controls the durability behavior of [`Storage::apply`] and
/// [`Storage::put_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Whether to wait for the write to be durable before returning.
    ///
    /// When `false` (the default), the operation returns as soon as the data
    /// is visible to readers, risking data loss on crash.
    pub await_durable: bool,
}

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Failure reported by the underlying engine (I/O, corruption, fencing).
    Storage(String),
    /// The engine does not implement the requested capability.
    Unsupported(String),
    /// A write reached an engine opened read-only.
    ReadOnly,
    /// Internal errors
    Internal(String),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            StorageError::ReadOnly => write!(f, "Storage opened read-only"),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StorageError {
    /// Converts an engine error to StorageError::Storage.
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        StorageError::Storage(e.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Iterator over storage records.
///
/// Iterators are owned: they hold whatever snapshot of the engine they need,
/// so concurrent writers can neither invalidate nor corrupt an in-progress
/// scan.
#[async_trait]
pub trait StorageIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>>;
}

/// Iterator over an already materialized, ordered run of records.
pub(crate) struct VecIterator {
    records: std::vec::IntoIter<Record>,
}

impl VecIterator {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

#[async_trait]
impl StorageIterator for VecIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}

/// Read operations every engine provides.
#[async_trait]
pub trait StorageRead: Send + Sync {
    /// Point lookup. Absence is `Ok(None)`, never an error.
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Returns an iterator over records in the given range, ascending.
    ///
    /// The returned iterator is owned and does not borrow from the storage,
    /// allowing it to be stored in structs or passed across await points.
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>>;

    /// Returns an iterator over records in the given range, descending.
    ///
    /// Engines without reverse iteration keep the default, which reports
    /// [`StorageError::Unsupported`].
    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let _ = range;
        Err(StorageError::Unsupported(
            "reverse iteration is not supported by this engine".to_string(),
        ))
    }

    /// Like [`scan_iter_rev`](StorageRead::scan_iter_rev), for callers that
    /// read at most `limit` records. Engines that buffer reverse scans keep
    /// only the last `limit` records of the range; the iterator may still
    /// yield more than `limit` records on other engines.
    async fn scan_iter_rev_limited(
        &self,
        range: BytesRange,
        limit: usize,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let _ = limit;
        self.scan_iter_rev(range).await
    }

    /// Collects all records in the range into a Vec.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan(&self, range: BytesRange) -> StorageResult<Vec<Record>> {
        let mut iter = self.scan_iter(range).await?;
        let mut records = Vec::new();
        while let Some(record) = iter.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}

/// The storage type encapsulates read-write access to the underlying engine.
#[async_trait]
pub trait Storage: StorageRead {
    /// Applies a batch of puts and deletes atomically.
    ///
    /// Either every operation in the batch becomes visible or none does.
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        self.apply_with_options(ops, WriteOptions::default()).await
    }

    /// Applies a batch of puts and deletes atomically with custom options.
    async fn apply_with_options(
        &self,
        ops: Vec<RecordOp>,
        options: WriteOptions,
    ) -> StorageResult<()>;

    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        self.put_with_options(records, WriteOptions::default())
            .await
    }

    /// Writes records to storage with custom options.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let ops = records.into_iter().map(RecordOp::Put).collect();
        self.apply_with_options(ops, options).await
    }

    /// Flushes all pending writes to durable storage.
    async fn flush(&self) -> StorageResult<()>;

    /// Closes the storage, releasing any resources.
    ///
    /// This method should be called before dropping the storage to ensure
    /// proper cleanup. For SlateDB, this releases the database fence.
    async fn close(&self) -> StorageResult<()>;

    /// Copies the engine's persisted state to `dest`.
    async fn backup(&self, dest: &Path) -> StorageResult<()> {
        Err(StorageError::Unsupported(format!(
            "backup to {} is not supported by this engine",
            dest.display()
        )))
    }

    /// Replaces the engine's state with a backup previously written to `src`.
    async fn restore(&self, src: &Path) -> StorageResult<()> {
        Err(StorageError::Unsupported(format!(
            "restore from {} is not supported by this engine",
            src.display()
        )))
    }
}
