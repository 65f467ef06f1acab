//! Consensus storage coordinator
//!
//! Opens every store over one database so a single staging area can span them all.

use super::acceptance_data::DbAcceptanceDataStore;
use super::block_store::{DbBlockTransactionsStore, DbHeadersStore};
use super::consensus_state::DbConsensusStateStore;
use super::daa::DbDaaStore;
use super::pruning::DbPruningStore;
use super::selected_chain::DbSelectedChainStore;
use super::statuses::DbStatusesStore;
use super::utxo_diffs::DbUtxoDiffsStore;
use crate::config::CacheConfig;
use crate::consensus::dag::DbRelationsStore;
use crate::consensus::ghostdag::DbGhostdagStore;
use database::{Database, DbResult, StagingArea};
use std::sync::Arc;

pub struct ConsensusStorage {
    pub db: Arc<Database>,
    pub headers: Arc<DbHeadersStore>,
    pub block_transactions: Arc<DbBlockTransactionsStore>,
    pub relations: Arc<DbRelationsStore>,
    pub ghostdag: Arc<DbGhostdagStore>,
    pub statuses: Arc<DbStatusesStore>,
    pub daa: Arc<DbDaaStore>,
    pub acceptance_data: Arc<DbAcceptanceDataStore>,
    pub utxo_diffs: Arc<DbUtxoDiffsStore>,
    pub consensus_state: Arc<DbConsensusStateStore>,
    pub pruning: Arc<DbPruningStore>,
    pub selected_chain: Arc<DbSelectedChainStore>,
}

impl ConsensusStorage {
    pub fn new(db: Arc<Database>, cache: &CacheConfig) -> Self {
        Self {
            headers: Arc::new(DbHeadersStore::new(db.clone(), cache.headers)),
            block_transactions: Arc::new(DbBlockTransactionsStore::new(db.clone(), cache.blocks)),
            relations: Arc::new(DbRelationsStore::new(db.clone(), cache.relations)),
            ghostdag: Arc::new(DbGhostdagStore::new(db.clone(), cache.ghostdag)),
            statuses: Arc::new(DbStatusesStore::new(db.clone(), cache.statuses)),
            daa: Arc::new(DbDaaStore::new(db.clone(), cache.daa)),
            acceptance_data: Arc::new(DbAcceptanceDataStore::new(
                db.clone(),
                cache.acceptance_data,
            )),
            utxo_diffs: Arc::new(DbUtxoDiffsStore::new(db.clone(), cache.utxo_diffs)),
            consensus_state: Arc::new(DbConsensusStateStore::new(
                db.clone(),
                cache.utxo_set,
                cache.preallocate_utxo_cache,
            )),
            pruning: Arc::new(DbPruningStore::new(db.clone(), cache.utxo_set / 4)),
            selected_chain: Arc::new(DbSelectedChainStore::new(db.clone(), cache.ghostdag)),
            db,
        }
    }

    /// Commits `area` to the underlying database
    pub fn commit(&self, area: StagingArea) -> DbResult<()> {
        area.commit(&self.db)
    }
}
