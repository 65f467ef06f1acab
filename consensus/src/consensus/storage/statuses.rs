use consensus_core::blockstatus::BlockStatus;
use consensus_core::Hash;
use database::db::CF_STATUSES;
use database::{Database, DbBucket, DbResult, DbResultExt, StagedStore, StagingArea};
use std::sync::Arc;

pub trait StatusesStoreReader {
    fn get_status(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockStatus>;

    /// `None` for unknown blocks
    fn get_status_opt(&self, area: &StagingArea, hash: Hash) -> DbResult<Option<BlockStatus>> {
        self.get_status(area, hash).optional()
    }
}

pub trait StatusesStore: StatusesStoreReader {
    fn set_status(&self, area: &mut StagingArea, hash: Hash, status: BlockStatus) -> DbResult<()>;
    fn delete_status(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbStatusesStore {
    access: StagedStore<Hash, BlockStatus>,
}

impl DbStatusesStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_STATUSES, b"block-statuses");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl StatusesStoreReader for DbStatusesStore {
    fn get_status(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockStatus> {
        self.access.get(area, &hash)
    }
}

impl StatusesStore for DbStatusesStore {
    fn set_status(&self, area: &mut StagingArea, hash: Hash, status: BlockStatus) -> DbResult<()> {
        self.access.stage(area, hash, status)
    }

    fn delete_status(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}
