//! Storage utilities.

use futures::StreamExt;
use slatedb::object_store::path::Path;

use super::config::StorageConfig;
use super::factory::create_object_store;
use super::{StorageError, StorageResult};

/// Deletes all persisted data for the given storage configuration and
/// returns the number of objects removed.
///
/// In-memory storage has nothing to delete. Call this only after the
/// storage has been closed.
pub async fn delete(config: &StorageConfig) -> StorageResult<usize> {
    let StorageConfig::SlateDb(slate_config) = config else {
        return Ok(0);
    };

    let object_store = create_object_store(&slate_config.object_store)?;
    let prefix = Path::from(slate_config.path.as_str());

    let locations = object_store
        .list(Some(&prefix))
        .map(|meta| meta.map(|meta| meta.location))
        .boxed();
    let mut deleted = object_store.delete_stream(locations);

    let mut count = 0;
    while let Some(result) = deleted.next().await {
        result.map_err(|e| {
            StorageError::Storage(format!(
                "Failed to delete objects under '{}': {}",
                slate_config.path, e
            ))
        })?;
        count += 1;
    }

    tracing::info!(path = %slate_config.path, count, "deleted slatedb data");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::Record;
    use crate::storage::factory::create_storage;

    #[tokio::test]
    async fn should_start_empty_after_delete() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::local(dir.path(), "db");
        let storage = create_storage(&config, false).await.unwrap();
        storage
            .put(vec![Record::new(Bytes::from("k"), Bytes::from("v"))])
            .await
            .unwrap();
        storage.flush().await.unwrap();
        storage.close().await.unwrap();

        // when
        let count = delete(&config).await.unwrap();
        let reopened = create_storage(&config, false).await.unwrap();

        // then
        assert!(count > 0);
        assert!(reopened.get(Bytes::from("k")).await.unwrap().is_none());
        reopened.close().await.unwrap();
    }

    #[tokio::test]
    async fn should_leave_sibling_databases_alone() {
        // given
        let dir = tempfile::tempdir().unwrap();
        let doomed = StorageConfig::local(dir.path(), "doomed");
        let kept = StorageConfig::local(dir.path(), "kept");
        for config in [&doomed, &kept] {
            let storage = create_storage(config, false).await.unwrap();
            storage
                .put(vec![Record::new(Bytes::from("k"), Bytes::from("v"))])
                .await
                .unwrap();
            storage.flush().await.unwrap();
            storage.close().await.unwrap();
        }

        // when
        delete(&doomed).await.unwrap();

        // then
        let storage = create_storage(&kept, false).await.unwrap();
        assert!(storage.get(Bytes::from("k")).await.unwrap().is_some());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn should_treat_in_memory_delete_as_noop() {
        assert_eq!(delete(&StorageConfig::InMemory).await, Ok(0));
    }
}
