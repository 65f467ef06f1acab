use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::Hash;
use database::db::CF_ACCEPTANCE_DATA;
use database::{Database, DbBucket, DbResult, StagedStore, StagingArea};
use std::sync::Arc;

pub trait AcceptanceDataStoreReader {
    fn get(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<AcceptanceData>>;
}

pub trait AcceptanceDataStore: AcceptanceDataStoreReader {
    fn insert(&self, area: &mut StagingArea, hash: Hash, data: Arc<AcceptanceData>) -> DbResult<()>;
    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

/// Acceptance data of chain blocks, one entry per mergeset block in consensus order
pub struct DbAcceptanceDataStore {
    access: StagedStore<Hash, Arc<AcceptanceData>>,
}

impl DbAcceptanceDataStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_ACCEPTANCE_DATA, b"acceptance-data");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl AcceptanceDataStoreReader for DbAcceptanceDataStore {
    fn get(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<AcceptanceData>> {
        self.access.get(area, &hash)
    }
}

impl AcceptanceDataStore for DbAcceptanceDataStore {
    fn insert(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        data: Arc<AcceptanceData>,
    ) -> DbResult<()> {
        self.access.stage(area, hash, data)
    }

    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}
