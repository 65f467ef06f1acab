//! Pruning point, its history and the pruning-point UTXO set
//!
//! The history root is the lowest chain block whose header is still kept.

use super::utxo_set::DbUtxoSetStore;
use consensus_core::Hash;
use database::db::CF_PRUNING;
use database::{Database, DbBucket, DbResult, StagedItem, StagedStore, StagingArea};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruningPointInfo {
    pub pruning_point: Hash,
    /// Number of times the pruning point moved since genesis
    pub index: u64,
}

impl PruningPointInfo {
    pub fn from_genesis(genesis: Hash) -> Self {
        Self { pruning_point: genesis, index: 0 }
    }
}

/// Big-endian so history iterates in index order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct HistoryKey([u8; 8]);

impl From<u64> for HistoryKey {
    fn from(index: u64) -> Self {
        Self(index.to_be_bytes())
    }
}

impl AsRef<[u8]> for HistoryKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub trait PruningStoreReader {
    fn get_pruning_point_info(&self, area: &StagingArea) -> DbResult<PruningPointInfo>;

    fn get_pruning_point(&self, area: &StagingArea) -> DbResult<Hash> {
        Ok(self.get_pruning_point_info(area)?.pruning_point)
    }

    /// The pruning point that was current after `index` moves
    fn get_past_pruning_point(&self, area: &StagingArea, index: u64) -> DbResult<Hash>;

    fn get_history_root(&self, area: &StagingArea) -> DbResult<Hash>;
}

pub trait PruningStore: PruningStoreReader {
    /// Sets the pruning point and records it in the history
    fn set_pruning_point(&self, area: &mut StagingArea, info: PruningPointInfo) -> DbResult<()>;

    fn set_history_root(&self, area: &mut StagingArea, root: Hash) -> DbResult<()>;
}

pub struct DbPruningStore {
    info: StagedItem<PruningPointInfo>,
    history: StagedStore<HistoryKey, Hash>,
    history_root: StagedItem<Hash>,
    /// The UTXO set as of the pruning point
    pub pruning_point_utxo_set: DbUtxoSetStore,
}

impl DbPruningStore {
    pub fn new(db: Arc<Database>, utxo_cache_size: usize) -> Self {
        let root = DbBucket::root(CF_PRUNING);
        Self {
            info: StagedItem::new(db.clone(), root.item(b"pruning-point")),
            history: StagedStore::new(db.clone(), root.bucket(b"past-pruning-points"), 64, false),
            history_root: StagedItem::new(db.clone(), root.item(b"history-root")),
            pruning_point_utxo_set: DbUtxoSetStore::new(
                db,
                root.bucket(b"pruning-point-utxo-set"),
                utxo_cache_size,
                false,
            ),
        }
    }
}

impl PruningStoreReader for DbPruningStore {
    fn get_pruning_point_info(&self, area: &StagingArea) -> DbResult<PruningPointInfo> {
        self.info.get(area)
    }

    fn get_past_pruning_point(&self, area: &StagingArea, index: u64) -> DbResult<Hash> {
        self.history.get(area, &index.into())
    }

    fn get_history_root(&self, area: &StagingArea) -> DbResult<Hash> {
        self.history_root.get(area)
    }
}

impl PruningStore for DbPruningStore {
    fn set_pruning_point(&self, area: &mut StagingArea, info: PruningPointInfo) -> DbResult<()> {
        self.history.stage(area, info.index.into(), info.pruning_point)?;
        self.info.stage(area, info)
    }

    fn set_history_root(&self, area: &mut StagingArea, root: Hash) -> DbResult<()> {
        self.history_root.stage(area, root)
    }
}
