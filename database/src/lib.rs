//! Persistence layer: a RocksDB wrapper with bucket-scoped keys, LRU caches,
//! and the staging area that turns a logical operation into one atomic write.

pub mod access;
pub mod cache;
pub mod db;
pub mod errors;
pub mod key;
pub mod staged;
pub mod staging;

pub use access::CachedDbAccess;
pub use cache::LruCache;
pub use db::{Database, DbTransaction};
pub use errors::{DbError, DbResult, DbResultExt};
pub use key::{DbBucket, DbKey};
pub use staged::{StagedItem, StagedStore};
pub use staging::{StagingArea, StagingShard, StagingShardId};
