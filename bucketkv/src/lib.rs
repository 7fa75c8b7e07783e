//! BucketKV - an ordered key-value store partitioned into named buckets.
//!
//! BucketKV presents one storage contract over pluggable embedded engines
//! (in-memory, or SlateDB over an object store). Clients address
//! `(bucket, key)` pairs; the store enforces a fixed bucket whitelist,
//! read-only mode and non-empty keys and values, then hands encoded keys to
//! the engine.
//!
//! # Architecture
//!
//! Each `(bucket, key)` is encoded into one composite engine key (see the
//! `serde` module): a version byte, a record tag, the escaped and terminated
//! bucket name, then the user key. Buckets occupy disjoint, contiguous key
//! ranges, so listing a bucket is a bounded range scan and keyset
//! pagination is a range that starts strictly past the cursor.
//!
//! # Key Concepts
//!
//! - **Store**: the entry point; point reads and writes, paginated listing
//!   in both directions, and bucket-level operations.
//! - **Bucket**: a namespace from [`Config::buckets`]. The empty bucket is
//!   the flat namespace and is always available.
//! - **Page**: `list` and `prev_list` return `Ok(None)` once nothing is left,
//!   and never skip or repeat keys when fed the last key of the previous page.
//!
//! # Example
//!
//! ```ignore
//! use bucketkv::{Config, Store};
//! use bytes::Bytes;
//!
//! let config = Config::local("/var/lib/bucketkv", "data").with_buckets(["posts"]);
//! let store = Store::open(config).await?;
//!
//! store.set(b"posts", Bytes::from("a"), Bytes::from("1")).await?;
//! assert_eq!(store.get(b"posts", b"a").await?, Bytes::from("1"));
//!
//! let newest_first = store.prev_list(b"posts", b"", 10).await?;
//!
//! store.delete_bucket(b"posts").await?;
//! store.close().await?;
//! ```

mod config;
mod error;
mod model;
mod serde;
mod storage;
mod store;

pub use config::{Config, DEFAULT_DELETE_BATCH_SIZE, WriteOptions};
pub use error::{Error, Result};
pub use model::KeyValueEntry;
pub use store::Store;
