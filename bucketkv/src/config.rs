//! Configuration for opening a [`Store`](crate::Store).

use std::path::Path;

use ::serde::{Deserialize, Serialize};
use common::StorageConfig;

use crate::error::{Error, Result};

/// Default number of deletes committed per `delete_bucket` batch.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 1024;

/// Configuration for opening a [`Store`](crate::Store).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// buckets = ["posts", "pages"]
/// read_only = false
///
/// [storage]
/// type = "SlateDb"
/// path = "data"
///
/// [storage.object_store]
/// type = "Local"
/// path = "/var/lib/bucketkv"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Permitted bucket names. The flat namespace (empty bucket) is always
    /// available and never needs listing.
    pub buckets: Vec<String>,

    /// Storage backend configuration.
    pub storage: StorageConfig,

    /// Rejects every mutation and opens the engine through its read-only path.
    pub read_only: bool,

    pub write_options: WriteOptions,

    /// Upper bound on the deletes committed atomically by one
    /// `delete_bucket` batch.
    pub delete_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            storage: StorageConfig::default(),
            read_only: false,
            write_options: WriteOptions::default(),
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidInput(format!("invalid config: {}", e)))
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!(
                "failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&text)
    }

    /// SlateDB on the local filesystem: the database lives in `folder`
    /// under the directory `path`, which is created on open.
    pub fn local(path: impl AsRef<Path>, folder: impl Into<String>) -> Self {
        Self {
            storage: StorageConfig::local(path, folder),
            ..Self::default()
        }
    }

    pub fn with_buckets<I, S>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buckets = buckets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.delete_batch_size == 0 {
            return Err(Error::InvalidInput(
                "delete_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for write operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// If true, waits for each write to be durable before returning.
    /// Default: false (returns once the write is visible to readers).
    pub await_durable: bool,
}

impl From<WriteOptions> for common::WriteOptions {
    fn from(options: WriteOptions) -> Self {
        common::WriteOptions {
            await_durable: options.await_durable,
        }
    }
}
