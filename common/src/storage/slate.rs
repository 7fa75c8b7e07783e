//! SlateDB-backed engines.
//!
//! [`SlateDbStorage`] owns a writable `Db`; [`SlateDbStorageReader`] owns a
//! `DbReader` and backs stores opened read-only. SlateDB iterators read from
//! a consistent view of the database, so scans are unaffected by concurrent
//! writers. SlateDB only iterates forwards; reverse scans read the bounded
//! range front to back, keeping at most `limit` trailing records, and replay
//! them backwards.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::config::WriteOptions as SlateWriteOptions;
use slatedb::{Db, DbIterator, DbReader, WriteBatch};

use super::{RecordOp, Storage, VecIterator, WriteOptions};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// Writable SlateDB engine.
pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

/// Read-only SlateDB engine backed by a `DbReader`.
///
/// Every mutation fails with [`StorageError::ReadOnly`].
pub struct SlateDbStorageReader {
    reader: Arc<DbReader>,
}

impl SlateDbStorageReader {
    pub fn new(reader: Arc<DbReader>) -> Self {
        Self { reader }
    }
}

struct SlateDbIterator {
    inner: DbIterator,
}

#[async_trait]
impl StorageIterator for SlateDbIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        let kv = self
            .inner
            .next()
            .await
            .map_err(StorageError::from_storage)?;
        Ok(kv.map(|kv| Record::new(kv.key, kv.value)))
    }
}

/// Drains a forward iterator and returns its last `limit` records in
/// descending order.
async fn reversed(
    mut iter: SlateDbIterator,
    limit: usize,
) -> StorageResult<Box<dyn StorageIterator + Send>> {
    let mut tail = VecDeque::new();
    while let Some(record) = iter.next().await? {
        if tail.len() == limit {
            if limit == 0 {
                break;
            }
            tail.pop_front();
        }
        tail.push_back(record);
    }
    Ok(Box::new(VecIterator::new(tail.into_iter().rev().collect())))
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(key.as_ref())
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { inner }))
    }

    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.scan_iter_rev_limited(range, usize::MAX).await
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter_rev_limited(
        &self,
        range: BytesRange,
        limit: usize,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        reversed(SlateDbIterator { inner }, limit).await
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    /// Writes the batch as a single SlateDB `WriteBatch`.
    async fn apply_with_options(
        &self,
        ops: Vec<RecordOp>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                RecordOp::Put(record) => batch.put(record.key, record.value),
                RecordOp::Delete(key) => batch.delete(key),
            }
        }

        let mut write_options = SlateWriteOptions::default();
        write_options.await_durable = options.await_durable;
        self.db
            .write_with_options(batch, &write_options)
            .await
            .map_err(StorageError::from_storage)
    }

    async fn flush(&self) -> StorageResult<()> {
        self.db.flush().await.map_err(StorageError::from_storage)
    }

    async fn close(&self) -> StorageResult<()> {
        self.db.close().await.map_err(StorageError::from_storage)
    }
}

#[async_trait]
impl StorageRead for SlateDbStorageReader {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .reader
            .get(key.as_ref())
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .reader
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbIterator { inner }))
    }

    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.scan_iter_rev_limited(range, usize::MAX).await
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter_rev_limited(
        &self,
        range: BytesRange,
        limit: usize,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let inner = self
            .reader
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        reversed(SlateDbIterator { inner }, limit).await
    }
}

#[async_trait]
impl Storage for SlateDbStorageReader {
    async fn apply_with_options(
        &self,
        _ops: Vec<RecordOp>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        Err(StorageError::ReadOnly)
    }

    async fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.reader
            .close()
            .await
            .map_err(StorageError::from_storage)
    }

    async fn restore(&self, _src: &std::path::Path) -> StorageResult<()> {
        Err(StorageError::ReadOnly)
    }
}
