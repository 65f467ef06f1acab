use crate::cache::LruCache;
use crate::db::{Database, DbTransaction};
use crate::errors::{DbError, DbResult};
use crate::key::DbBucket;
use serde::{de::DeserializeOwned, Serialize};
use std::hash::Hash;
use std::sync::Arc;

/// Typed access to one bucket: bincode values read through an LRU cache.
///
/// Writes go through a [`DbTransaction`] and never touch the cache. Callers
/// refresh the cache once the transaction is committed. A read that misses the
/// cache fills it only if no such refresh happened meanwhile.
pub struct CachedDbAccess<K, V> {
    db: Arc<Database>,
    bucket: DbBucket,
    cache: LruCache<K, V>,
}

impl<K, V> CachedDbAccess<K, V>
where
    K: Clone + Eq + Hash + AsRef<[u8]>,
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(db: Arc<Database>, bucket: DbBucket, cache_size: usize, preallocate: bool) -> Self {
        Self { db, bucket, cache: LruCache::new(cache_size, preallocate) }
    }

    /// Reads from the cache, then from the database, caching a database hit
    pub fn read(&self, key: &K) -> DbResult<V> {
        if let Some(value) = self.cache.get(key) {
            return Ok(value);
        }
        let generation = self.cache.generation();
        let db_key = self.bucket.key(key);
        match self.db.get(&db_key)? {
            Some(bytes) => {
                let value: V = bincode::deserialize(&bytes)?;
                self.cache.insert_if_current(generation, key.clone(), value.clone());
                Ok(value)
            }
            None => Err(DbError::NotFound(db_key.to_string())),
        }
    }

    pub fn has(&self, key: &K) -> DbResult<bool> {
        if self.cache.contains_key(key) {
            return Ok(true);
        }
        self.db.has(&self.bucket.key(key))
    }

    pub fn write(&self, tx: &mut DbTransaction, key: &K, value: &V) -> DbResult<()> {
        tx.put(&self.bucket.key(key), &bincode::serialize(value)?)
    }

    pub fn delete(&self, tx: &mut DbTransaction, key: &K) -> DbResult<()> {
        tx.delete(&self.bucket.key(key))
    }

    pub fn cache_insert(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    pub fn cache_remove(&self, key: &K) {
        self.cache.remove(key);
    }

    /// Committed `(key suffix, value)` pairs in key order, bypassing the cache
    pub fn iterate(&self, after: Option<&[u8]>, limit: usize) -> DbResult<Vec<(Vec<u8>, V)>> {
        self.db
            .iter_bucket(&self.bucket, after, limit)?
            .into_iter()
            .map(|(suffix, bytes)| -> DbResult<(Vec<u8>, V)> {
                Ok((suffix, bincode::deserialize(&bytes)?))
            })
            .collect()
    }

    pub fn bucket(&self) -> &DbBucket {
        &self.bucket
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}
