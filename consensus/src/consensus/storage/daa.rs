//! Per-block DAA score and the mergeset blocks added to the difficulty window

use consensus_core::{BlockHashes, Hash};
use database::db::CF_DAA;
use database::{Database, DbBucket, DbResult, StagedStore, StagingArea};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDaaData {
    pub daa_score: u64,
    pub added_blocks: BlockHashes,
}

pub trait DaaStoreReader {
    fn get_daa_data(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockDaaData>;

    fn get_daa_score(&self, area: &StagingArea, hash: Hash) -> DbResult<u64> {
        Ok(self.get_daa_data(area, hash)?.daa_score)
    }

    fn get_daa_added_blocks(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockHashes> {
        Ok(self.get_daa_data(area, hash)?.added_blocks)
    }
}

pub trait DaaStore: DaaStoreReader {
    fn insert(&self, area: &mut StagingArea, hash: Hash, data: BlockDaaData) -> DbResult<()>;
    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbDaaStore {
    access: StagedStore<Hash, BlockDaaData>,
}

impl DbDaaStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_DAA, b"daa-blocks");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl DaaStoreReader for DbDaaStore {
    fn get_daa_data(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockDaaData> {
        self.access.get(area, &hash)
    }
}

impl DaaStore for DbDaaStore {
    fn insert(&self, area: &mut StagingArea, hash: Hash, data: BlockDaaData) -> DbResult<()> {
        self.access.stage(area, hash, data)
    }

    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}
