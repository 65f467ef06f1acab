//! Header and block body storage

use consensus_core::header::Header;
use consensus_core::tx::Transaction;
use consensus_core::Hash;
use database::{Database, DbBucket, DbResult, StagedStore, StagingArea};
use database::db::{CF_BLOCKS, CF_HEADERS};
use std::sync::Arc;

pub trait BlockHeaderStoreReader {
    fn get_header(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<Header>>;
    fn has_header(&self, area: &StagingArea, hash: Hash) -> DbResult<bool>;
}

pub trait BlockHeaderStore: BlockHeaderStoreReader {
    fn insert_header(&self, area: &mut StagingArea, header: Arc<Header>) -> DbResult<()>;
    fn delete_header(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbHeadersStore {
    access: StagedStore<Hash, Arc<Header>>,
}

impl DbHeadersStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_HEADERS, b"headers");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl BlockHeaderStoreReader for DbHeadersStore {
    fn get_header(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<Header>> {
        self.access.get(area, &hash)
    }

    fn has_header(&self, area: &StagingArea, hash: Hash) -> DbResult<bool> {
        self.access.has(area, &hash)
    }
}

impl BlockHeaderStore for DbHeadersStore {
    fn insert_header(&self, area: &mut StagingArea, header: Arc<Header>) -> DbResult<()> {
        self.access.stage(area, header.hash, header)
    }

    fn delete_header(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}

/// Block bodies. Headers live in [`DbHeadersStore`].
pub trait BlockStoreReader {
    fn get_transactions(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<Vec<Transaction>>>;
    fn has_transactions(&self, area: &StagingArea, hash: Hash) -> DbResult<bool>;
}

pub trait BlockStore: BlockStoreReader {
    fn insert_transactions(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        transactions: Arc<Vec<Transaction>>,
    ) -> DbResult<()>;
    fn delete_transactions(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbBlockTransactionsStore {
    access: StagedStore<Hash, Arc<Vec<Transaction>>>,
}

impl DbBlockTransactionsStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let bucket = DbBucket::new(CF_BLOCKS, b"block-transactions");
        Self { access: StagedStore::new(db, bucket, cache_size, false) }
    }
}

impl BlockStoreReader for DbBlockTransactionsStore {
    fn get_transactions(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<Vec<Transaction>>> {
        self.access.get(area, &hash)
    }

    fn has_transactions(&self, area: &StagingArea, hash: Hash) -> DbResult<bool> {
        self.access.has(area, &hash)
    }
}

impl BlockStore for DbBlockTransactionsStore {
    fn insert_transactions(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        transactions: Arc<Vec<Transaction>>,
    ) -> DbResult<()> {
        self.access.stage(area, hash, transactions)
    }

    fn delete_transactions(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.access.stage_delete(area, hash)
    }
}
