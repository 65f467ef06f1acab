use consensus_core::utxo::UtxoDiff;
use consensus_core::Hash;
use database::db::CF_UTXO_DIFFS;
use database::{Database, DbBucket, DbResult, StagedStore, StagingArea};
use std::sync::Arc;

pub trait UtxoDiffsStoreReader {
    fn get(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<UtxoDiff>>;
    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool>;
}

pub trait UtxoDiffsStore: UtxoDiffsStoreReader {
    fn insert(&self, area: &mut StagingArea, hash: Hash, diff: Arc<UtxoDiff>) -> DbResult<()>;
    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

/// The diff of every UTXO-verified block relative to its selected parent
pub struct DbUtxoDiffsStore {
    access: StagedStore<Hash, Arc<UtxoDiff>>,
}

impl DbUtxoDiffsStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_UTXO_DIFFS, b"utxo-diffs");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl UtxoDiffsStoreReader for DbUtxoDiffsStore {
    fn get(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<UtxoDiff>> {
        self.access.get(area, &hash)
    }

    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool> {
        self.access.has(area, &hash)
    }
}

impl UtxoDiffsStore for DbUtxoDiffsStore {
    fn insert(&self, area: &mut StagingArea, hash: Hash, diff: Arc<UtxoDiff>) -> DbResult<()> {
        self.access.stage(area, hash, diff)
    }

    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}
