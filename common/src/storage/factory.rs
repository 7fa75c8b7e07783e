//! Storage factory for creating storage instances from configuration.

use std::sync::Arc;

use slatedb::config::{DbReaderOptions, Settings};
use slatedb::object_store::{self, ObjectStore};
use slatedb::{DbBuilder, DbReader};

use super::config::{ObjectStoreConfig, SlateDbStorageConfig, StorageConfig};
use super::in_memory::InMemoryStorage;
use super::read_only::ReadOnlyStorage;
use super::slate::{SlateDbStorage, SlateDbStorageReader};
use super::{Storage, StorageError, StorageResult};

/// Creates an object store from configuration without initializing SlateDB.
///
/// Local stores get their root directory created on demand.
pub fn create_object_store(config: &ObjectStoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        ObjectStoreConfig::InMemory => Ok(Arc::new(object_store::memory::InMemory::new())),
        ObjectStoreConfig::Local(local_config) => {
            std::fs::create_dir_all(&local_config.path).map_err(|e| {
                StorageError::Storage(format!(
                    "Failed to create storage directory '{}': {}",
                    local_config.path, e
                ))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(&local_config.path)
                .map_err(|e| {
                    StorageError::Storage(format!("Failed to create local filesystem store: {}", e))
                })?;
            Ok(Arc::new(store))
        }
    }
}

/// Opens a storage instance for `config`, read-write unless `read_only`.
pub async fn create_storage(
    config: &StorageConfig,
    read_only: bool,
) -> StorageResult<Arc<dyn Storage>> {
    StorageBuilder::new(config.clone())
        .read_only(read_only)
        .build()
        .await
}

/// Builder for opening storage instances.
///
/// ```rust,ignore
/// use common::storage::factory::StorageBuilder;
///
/// let storage = StorageBuilder::new(config).read_only(true).build().await?;
/// ```
pub struct StorageBuilder {
    config: StorageConfig,
    read_only: bool,
}

impl StorageBuilder {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            read_only: false,
        }
    }

    /// Opens the engine without write access.
    ///
    /// SlateDB is opened through a `DbReader`, which takes no writer fence
    /// and can run next to a live writer. Every write through the returned
    /// handle fails with [`StorageError::ReadOnly`].
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub async fn build(self) -> StorageResult<Arc<dyn Storage>> {
        match &self.config {
            StorageConfig::InMemory => {
                tracing::info!(read_only = self.read_only, "opening in-memory storage");
                let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
                if self.read_only {
                    Ok(Arc::new(ReadOnlyStorage::wrap(storage)))
                } else {
                    Ok(storage)
                }
            }
            StorageConfig::SlateDb(slate_config) => {
                tracing::info!(
                    path = %slate_config.path,
                    read_only = self.read_only,
                    "opening slatedb storage"
                );
                if self.read_only {
                    let reader = open_slatedb_reader(slate_config).await?;
                    Ok(Arc::new(reader))
                } else {
                    let storage = open_slatedb(slate_config).await?;
                    Ok(Arc::new(storage))
                }
            }
        }
    }
}

fn load_settings(config: &SlateDbStorageConfig) -> StorageResult<Settings> {
    match &config.settings_path {
        Some(path) => Settings::from_file(path).map_err(|e| {
            StorageError::Storage(format!(
                "Failed to load SlateDB settings from {}: {}",
                path, e
            ))
        }),
        None => Ok(Settings::load().unwrap_or_default()),
    }
}

async fn open_slatedb(config: &SlateDbStorageConfig) -> StorageResult<SlateDbStorage> {
    let object_store = create_object_store(&config.object_store)?;
    let settings = load_settings(config)?;

    let db = DbBuilder::new(config.path.clone(), object_store)
        .with_settings(settings)
        .build()
        .await
        .map_err(|e| StorageError::Storage(format!("Failed to create SlateDB: {}", e)))?;

    Ok(SlateDbStorage::new(Arc::new(db)))
}

async fn open_slatedb_reader(config: &SlateDbStorageConfig) -> StorageResult<SlateDbStorageReader> {
    let object_store = create_object_store(&config.object_store)?;

    let reader = DbReader::open(
        config.path.clone(),
        object_store,
        None,
        DbReaderOptions::default(),
    )
    .await
    .map_err(|e| StorageError::Storage(format!("Failed to open SlateDB reader: {}", e)))?;

    Ok(SlateDbStorageReader::new(Arc::new(reader)))
}
