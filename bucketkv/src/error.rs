//! Error types for BucketKV operations.

use common::StorageError;

/// Error type for BucketKV operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mutation was attempted on a store opened read-only.
    ReadOnly,

    /// A non-empty bucket name outside the configured whitelist.
    UnknownBucket(String),

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// The active engine lacks the requested capability.
    Unsupported(String),

    /// Storage-related errors from the underlying engine.
    Storage(String),

    /// Encoding or decoding errors.
    Encoding(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl Error {
    pub(crate) fn unknown_bucket(bucket: &[u8]) -> Self {
        Error::UnknownBucket(bucket.escape_ascii().to_string())
    }

    /// Prefixes engine failures with the operation, bucket and, for point
    /// operations, key that hit them.
    pub(crate) fn context(self, op: &str, bucket: &[u8], key: Option<&[u8]>) -> Self {
        match self {
            Error::Storage(msg) => match key {
                Some(key) => Error::Storage(format!(
                    "{} in bucket '{}' at key '{}': {}",
                    op,
                    bucket.escape_ascii(),
                    key.escape_ascii(),
                    msg
                )),
                None => Error::Storage(format!(
                    "{} in bucket '{}': {}",
                    op,
                    bucket.escape_ascii(),
                    msg
                )),
            },
            other => other,
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ReadOnly => write!(f, "Store is read-only"),
            Error::UnknownBucket(name) => write!(f, "Unknown bucket: {}", name),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Unsupported(msg) => Error::Unsupported(msg),
            StorageError::ReadOnly => Error::ReadOnly,
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Result type alias for BucketKV operations.
pub type Result<T> = std::result::Result<T, Error>;
