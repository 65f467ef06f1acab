use crate::db::{Database, DbTransaction};
use crate::errors::{DbError, DbResult};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Identifies the shard a store stages its mutations under
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StagingShardId(u64);

impl StagingShardId {
    /// Returns a process-wide unique id
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pending mutations of one store within one staging area
pub trait StagingShard: Any + Send + Sync {
    /// Adds the pending mutations to `tx`
    fn write(&self, tx: &mut DbTransaction) -> DbResult<()>;

    /// Called once the transaction holding this shard's writes is durable
    fn on_committed(&self);

    fn is_staged(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// In-memory overlay of the pending mutations of one logical operation.
///
/// Staged data is visible only through this area. [`StagingArea::commit`]
/// persists every shard in a single write batch. Dropping the area discards it.
#[derive(Default)]
pub struct StagingArea {
    shards: BTreeMap<StagingShardId, Box<dyn StagingShard>>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shard<T: StagingShard>(&self, id: StagingShardId) -> Option<&T> {
        self.shards.get(&id).and_then(|shard| shard.as_any().downcast_ref::<T>())
    }

    pub fn shard_or_insert_with<T: StagingShard>(
        &mut self,
        id: StagingShardId,
        create: impl FnOnce() -> T,
    ) -> DbResult<&mut T> {
        self.shards
            .entry(id)
            .or_insert_with(|| Box::new(create()) as Box<dyn StagingShard>)
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| {
                DbError::InvalidData(format!("staging shard {id:?} holds a different type"))
            })
    }

    pub fn remove_shard(&mut self, id: StagingShardId) {
        self.shards.remove(&id);
    }

    pub fn is_staged(&self) -> bool {
        self.shards.values().any(|shard| shard.is_staged())
    }

    /// Writes all shards in one atomic batch. Caches are refreshed only after
    /// the batch is durable; on error nothing is persisted and no cache changes.
    pub fn commit(self, db: &Database) -> DbResult<()> {
        let mut tx = db.begin_transaction();
        for shard in self.shards.values() {
            shard.write(&mut tx)?;
        }
        let ops = tx.len();
        tx.commit()?;
        for shard in self.shards.values() {
            shard.on_committed();
        }
        trace!(shards = self.shards.len(), ops, "staging area committed");
        Ok(())
    }
}

impl fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shards: Vec<_> = self.shards.keys().collect();
        f.debug_struct("StagingArea").field("shards", &shards).finish()
    }
}
