//! Virtual state, tips, the virtual UTXO set and the pruning-point UTXO import area

use super::utxo_set::DbUtxoSetStore;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::utxo::UtxoDiff;
use consensus_core::{BlockHashes, Hash};
use database::db::CF_CONSENSUS_STATE;
use database::{Database, DbBucket, DbResult, DbResultExt, StagedItem, StagingArea};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key of the flag marking an unfinished pruning-point UTXO set import
pub const IMPORTING_PRUNING_POINT_UTXO_SET_KEY: &[u8] = b"importing-pruning-point-utxo-set";

/// The state of the virtual block, a block merging every current tip
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualState {
    /// Up to `max_block_parents` tips, best first
    pub parents: Vec<Hash>,
    pub ghostdag_data: GhostdagData,
    pub daa_score: u64,
    /// Selected parent of the virtual. The virtual UTXO set is the UTXO state of this block.
    pub sink: Hash,
    /// What the last resolution changed in the virtual UTXO set
    pub utxo_diff: UtxoDiff,
}

pub trait ConsensusStateStoreReader {
    fn get_tips(&self, area: &StagingArea) -> DbResult<BlockHashes>;
    fn get_virtual_state(&self, area: &StagingArea) -> DbResult<Arc<VirtualState>>;
    fn is_importing_pruning_point_utxo_set(&self, area: &StagingArea) -> DbResult<bool>;
}

pub trait ConsensusStateStore: ConsensusStateStoreReader {
    fn set_tips(&self, area: &mut StagingArea, tips: BlockHashes) -> DbResult<()>;
    fn set_virtual_state(&self, area: &mut StagingArea, state: Arc<VirtualState>) -> DbResult<()>;
    fn set_importing_pruning_point_utxo_set(
        &self,
        area: &mut StagingArea,
        importing: bool,
    ) -> DbResult<()>;
}

pub struct DbConsensusStateStore {
    tips: StagedItem<BlockHashes>,
    virtual_state: StagedItem<Arc<VirtualState>>,
    importing: StagedItem<bool>,
    /// The UTXO set of the virtual block
    pub virtual_utxo_set: DbUtxoSetStore,
    /// UTXO chunks received during a pruning-point import. Never read as live state.
    pub imported_pruning_point_utxos: DbUtxoSetStore,
}

impl DbConsensusStateStore {
    pub fn new(db: Arc<Database>, utxo_cache_size: usize, preallocate_utxo_cache: bool) -> Self {
        let root = DbBucket::root(CF_CONSENSUS_STATE);
        Self {
            tips: StagedItem::new(db.clone(), root.item(b"tips")),
            virtual_state: StagedItem::new(db.clone(), root.item(b"virtual-state")),
            importing: StagedItem::new(db.clone(), root.item(IMPORTING_PRUNING_POINT_UTXO_SET_KEY)),
            virtual_utxo_set: DbUtxoSetStore::new(
                db.clone(),
                root.bucket(b"virtual-utxo-set"),
                utxo_cache_size,
                preallocate_utxo_cache,
            ),
            imported_pruning_point_utxos: DbUtxoSetStore::new(
                db,
                root.bucket(b"imported-pruning-point-utxos"),
                0,
                false,
            ),
        }
    }
}

impl ConsensusStateStoreReader for DbConsensusStateStore {
    fn get_tips(&self, area: &StagingArea) -> DbResult<BlockHashes> {
        self.tips.get(area)
    }

    fn get_virtual_state(&self, area: &StagingArea) -> DbResult<Arc<VirtualState>> {
        self.virtual_state.get(area)
    }

    fn is_importing_pruning_point_utxo_set(&self, area: &StagingArea) -> DbResult<bool> {
        Ok(self.importing.get(area).optional()?.unwrap_or(false))
    }
}

impl ConsensusStateStore for DbConsensusStateStore {
    fn set_tips(&self, area: &mut StagingArea, tips: BlockHashes) -> DbResult<()> {
        self.tips.stage(area, tips)
    }

    fn set_virtual_state(&self, area: &mut StagingArea, state: Arc<VirtualState>) -> DbResult<()> {
        self.virtual_state.stage(area, state)
    }

    fn set_importing_pruning_point_utxo_set(
        &self,
        area: &mut StagingArea,
        importing: bool,
    ) -> DbResult<()> {
        if importing {
            self.importing.stage(area, true)
        } else {
            self.importing.stage_delete(area)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_importing_flag_lives_at_fixed_key() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = DbConsensusStateStore::new(db.clone(), 0, false);
        assert!(!store.is_importing_pruning_point_utxo_set(&StagingArea::new()).unwrap());

        let mut area = StagingArea::new();
        store.set_importing_pruning_point_utxo_set(&mut area, true).unwrap();
        area.commit(&db).unwrap();
        let flag_key = DbBucket::root(CF_CONSENSUS_STATE).key(IMPORTING_PRUNING_POINT_UTXO_SET_KEY);
        assert!(db.has(&flag_key).unwrap());
        assert!(store.is_importing_pruning_point_utxo_set(&StagingArea::new()).unwrap());

        let mut area = StagingArea::new();
        store.set_importing_pruning_point_utxo_set(&mut area, false).unwrap();
        area.commit(&db).unwrap();
        assert!(!store.is_importing_pruning_point_utxo_set(&StagingArea::new()).unwrap());
    }
}
