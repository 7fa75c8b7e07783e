//! Write-rejecting view over a readable engine.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::{RecordOp, Storage, WriteOptions};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// Wraps an engine that has no read-only mode of its own, failing every
/// mutation with [`StorageError::ReadOnly`].
///
/// Reads, `flush` and `close` are forwarded. Used when a store is opened
/// read-only so that a write which slips past the caller's own checks still
/// cannot reach the engine.
pub struct ReadOnlyStorage {
    inner: Arc<dyn Storage>,
}

impl ReadOnlyStorage {
    pub fn wrap(inner: Arc<dyn Storage>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageRead for ReadOnlyStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        self.inner.get(key).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.inner.scan_iter(range).await
    }

    async fn scan_iter_rev(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.inner.scan_iter_rev(range).await
    }

    async fn scan_iter_rev_limited(
        &self,
        range: BytesRange,
        limit: usize,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.inner.scan_iter_rev_limited(range, limit).await
    }
}

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn apply_with_options(
        &self,
        _ops: Vec<RecordOp>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        Err(StorageError::ReadOnly)
    }

    async fn flush(&self) -> StorageResult<()> {
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }

    async fn restore(&self, _src: &std::path::Path) -> StorageResult<()> {
        Err(StorageError::ReadOnly)
    }
}
