use crate::access::CachedDbAccess;
use crate::db::{Database, DbTransaction};
use crate::errors::{DbError, DbResult};
use crate::key::DbBucket;
use crate::staging::{StagingArea, StagingShard, StagingShardId};
use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

pub trait StoreKey: Clone + Eq + Hash + AsRef<[u8]> + Send + Sync + 'static {}
impl<T: Clone + Eq + Hash + AsRef<[u8]> + Send + Sync + 'static> StoreKey for T {}

pub trait StoreValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static> StoreValue for T {}

/// Pending puts and deletes of a [`StagedStore`].
///
/// A delete drops any pending put of the same key. A later put wins over an
/// earlier delete since deletes are written first.
struct StagedMapShard<K, V> {
    access: Arc<CachedDbAccess<K, V>>,
    to_add: HashMap<K, V>,
    to_delete: HashSet<K>,
}

impl<K: StoreKey, V: StoreValue> StagingShard for StagedMapShard<K, V> {
    fn write(&self, tx: &mut DbTransaction) -> DbResult<()> {
        for key in self.to_delete.iter() {
            self.access.delete(tx, key)?;
        }
        for (key, value) in self.to_add.iter() {
            self.access.write(tx, key, value)?;
        }
        Ok(())
    }

    fn on_committed(&self) {
        for key in self.to_delete.iter() {
            self.access.cache_remove(key);
        }
        for (key, value) in self.to_add.iter() {
            self.access.cache_insert(key.clone(), value.clone());
        }
    }

    fn is_staged(&self) -> bool {
        !self.to_add.is_empty() || !self.to_delete.is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A keyed store whose writes go through a [`StagingArea`].
///
/// Reads consult the area's pending mutations first, then the cache, then the database.
pub struct StagedStore<K, V> {
    shard_id: StagingShardId,
    access: Arc<CachedDbAccess<K, V>>,
}

impl<K: StoreKey, V: StoreValue> StagedStore<K, V> {
    pub fn new(db: Arc<Database>, bucket: DbBucket, cache_size: usize, preallocate: bool) -> Self {
        let access = CachedDbAccess::new(db, bucket, cache_size, preallocate);
        Self { shard_id: StagingShardId::generate(), access: Arc::new(access) }
    }

    fn shard<'a>(&self, area: &'a StagingArea) -> Option<&'a StagedMapShard<K, V>> {
        area.shard::<StagedMapShard<K, V>>(self.shard_id)
    }

    fn shard_mut<'a>(&self, area: &'a mut StagingArea) -> DbResult<&'a mut StagedMapShard<K, V>> {
        let access = self.access.clone();
        area.shard_or_insert_with(self.shard_id, move || StagedMapShard {
            access,
            to_add: HashMap::new(),
            to_delete: HashSet::new(),
        })
    }

    pub fn stage(&self, area: &mut StagingArea, key: K, value: V) -> DbResult<()> {
        self.shard_mut(area)?.to_add.insert(key, value);
        Ok(())
    }

    pub fn stage_delete(&self, area: &mut StagingArea, key: K) -> DbResult<()> {
        let shard = self.shard_mut(area)?;
        shard.to_add.remove(&key);
        shard.to_delete.insert(key);
        Ok(())
    }

    pub fn get(&self, area: &StagingArea, key: &K) -> DbResult<V> {
        if let Some(shard) = self.shard(area) {
            if let Some(value) = shard.to_add.get(key) {
                return Ok(value.clone());
            }
            if shard.to_delete.contains(key) {
                let key = self.access.bucket().key(key);
                return Err(DbError::NotFound(format!("{key} (staged for deletion)")));
            }
        }
        self.access.read(key)
    }

    pub fn has(&self, area: &StagingArea, key: &K) -> DbResult<bool> {
        if let Some(shard) = self.shard(area) {
            if shard.to_add.contains_key(key) {
                return Ok(true);
            }
            if shard.to_delete.contains(key) {
                return Ok(false);
            }
        }
        self.access.has(key)
    }

    pub fn is_staged(&self, area: &StagingArea) -> bool {
        self.shard(area).is_some_and(|shard| shard.is_staged())
    }

    pub fn unstage_all(&self, area: &mut StagingArea) {
        area.remove_shard(self.shard_id);
    }

    /// Staged puts of this store in `area`
    pub fn staged_additions<'a>(
        &self,
        area: &'a StagingArea,
    ) -> impl Iterator<Item = (&'a K, &'a V)> + 'a {
        self.shard(area).into_iter().flat_map(|shard| shard.to_add.iter())
    }

    /// Staged deletes of this store in `area`
    pub fn staged_deletions<'a>(&self, area: &'a StagingArea) -> impl Iterator<Item = &'a K> + 'a {
        self.shard(area).into_iter().flat_map(|shard| shard.to_delete.iter())
    }

    /// Committed entries in key order, ignoring any staging area
    pub fn iter_committed(
        &self,
        after: Option<&[u8]>,
        limit: usize,
    ) -> DbResult<Vec<(Vec<u8>, V)>> {
        self.access.iterate(after, limit)
    }
}

/// Key of a single-value bucket. The value lives at the bucket prefix itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ItemKey;

impl AsRef<[u8]> for ItemKey {
    fn as_ref(&self) -> &[u8] {
        &[]
    }
}

/// A single staged value, e.g. the tips or the pruning point
pub struct StagedItem<V> {
    inner: StagedStore<ItemKey, V>,
}

impl<V: StoreValue> StagedItem<V> {
    pub fn new(db: Arc<Database>, bucket: DbBucket) -> Self {
        Self { inner: StagedStore::new(db, bucket, 1, true) }
    }

    pub fn stage(&self, area: &mut StagingArea, value: V) -> DbResult<()> {
        self.inner.stage(area, ItemKey, value)
    }

    pub fn stage_delete(&self, area: &mut StagingArea) -> DbResult<()> {
        self.inner.stage_delete(area, ItemKey)
    }

    pub fn get(&self, area: &StagingArea) -> DbResult<V> {
        self.inner.get(area, &ItemKey)
    }

    pub fn is_staged(&self, area: &StagingArea) -> bool {
        self.inner.is_staged(area)
    }

    pub fn unstage_all(&self, area: &mut StagingArea) {
        self.inner.unstage_all(area)
    }
}
