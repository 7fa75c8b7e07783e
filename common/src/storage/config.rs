//! Storage backend configuration.

use std::path::Path;

use ::serde::{Deserialize, Serialize};

/// Selects and configures the engine backing a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Volatile BTreeMap engine, mostly for tests.
    #[default]
    InMemory,
    /// SlateDB over an object store.
    SlateDb(SlateDbStorageConfig),
}

impl StorageConfig {
    /// SlateDB persisted on the local filesystem.
    ///
    /// `root` is the directory holding the object store and is created if it
    /// does not exist; `folder` names the database inside it.
    pub fn local(root: impl AsRef<Path>, folder: impl Into<String>) -> Self {
        StorageConfig::SlateDb(SlateDbStorageConfig {
            path: folder.into(),
            object_store: ObjectStoreConfig::Local(LocalObjectStoreConfig {
                path: root.as_ref().to_string_lossy().into_owned(),
            }),
            settings_path: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateDbStorageConfig {
    /// Database path inside the object store.
    pub path: String,
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file; SlateDB's own defaults otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectStoreConfig {
    pub path: String,
}
