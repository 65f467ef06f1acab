//! Block templates
//!
//! A template is assembled in a scratch staging area that is dropped at the
//! end, so building one never changes consensus state. The coinbase is
//! computed exactly the way a chain block's coinbase is verified.

use crate::consensus::difficulty::DaaManager;
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStore};
use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::acceptance_data::{AcceptanceDataStore, DbAcceptanceDataStore};
use crate::consensus::storage::block_store::{BlockHeaderStoreReader, DbHeadersStore};
use crate::consensus::storage::consensus_state::{ConsensusStateStoreReader, DbConsensusStateStore};
use crate::consensus::storage::daa::{BlockDaaData, DaaStore, DbDaaStore};
use crate::consensus::validation::TransactionValidator;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::pipeline::virtual_processor::VirtualStateProcessor;
use crate::process::coinbase::CoinbaseManager;
use consensus_core::block::{Block, BlockTemplate};
use consensus_core::blockhash::VIRTUAL;
use consensus_core::coinbase::CoinbaseData;
use consensus_core::constants::BLOCK_VERSION;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::GhostdagDataVariant;
use consensus_core::header::Header;
use consensus_core::tx::Transaction;
use consensus_core::utxo::{ComposedUtxoView, UtxoDiff};
use consensus_core::Hash;
use database::StagingArea;
use lumen_hashes::calc_merkle_root;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub struct BlockTemplateBuilder {
    headers: Arc<DbHeadersStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    daa_store: Arc<DbDaaStore>,
    acceptance_data_store: Arc<DbAcceptanceDataStore>,
    consensus_state: Arc<DbConsensusStateStore>,

    ghostdag_protocol: Arc<GhostdagProtocol>,
    daa_manager: Arc<DaaManager>,
    virtual_processor: Arc<VirtualStateProcessor>,
    coinbase_manager: Arc<CoinbaseManager>,
    transaction_validator: Arc<TransactionValidator>,
}

impl BlockTemplateBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        headers: Arc<DbHeadersStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        daa_store: Arc<DbDaaStore>,
        acceptance_data_store: Arc<DbAcceptanceDataStore>,
        consensus_state: Arc<DbConsensusStateStore>,
        ghostdag_protocol: Arc<GhostdagProtocol>,
        daa_manager: Arc<DaaManager>,
        virtual_processor: Arc<VirtualStateProcessor>,
        coinbase_manager: Arc<CoinbaseManager>,
        transaction_validator: Arc<TransactionValidator>,
    ) -> Self {
        Self {
            headers,
            ghostdag_store,
            daa_store,
            acceptance_data_store,
            consensus_state,
            ghostdag_protocol,
            daa_manager,
            virtual_processor,
            coinbase_manager,
            transaction_validator,
        }
    }

    /// A template over the current virtual parents, stamped with the current time
    pub fn build_block_template(
        &self,
        coinbase_data: &CoinbaseData,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<BlockTemplate> {
        let parents = self.consensus_state.get_virtual_state(&StagingArea::new())?.parents.clone();
        self.build_block(&parents, coinbase_data, transactions, unix_now_millis())
    }

    /// A template over arbitrary known parents. The timestamp is raised to one
    /// millisecond past the latest parent when `timestamp` is not later.
    ///
    /// Every transaction must be valid against the UTXO state of the new block,
    /// in the given order. The first invalid one fails the build.
    pub fn build_block(
        &self,
        parents: &[Hash],
        coinbase_data: &CoinbaseData,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> ConsensusResult<BlockTemplate> {
        let mut area = StagingArea::new();
        if self.consensus_state.is_importing_pruning_point_utxo_set(&area)? {
            return Err(RuleError::UtxoImportInProgress.into());
        }
        let ghostdag_data = Arc::new(self.ghostdag_protocol.ghostdag(&area, parents)?);
        let selected_parent = ghostdag_data.selected_parent;
        let (daa_score, added_blocks) =
            self.daa_manager.calc_daa_score_and_added_blocks(&area, &ghostdag_data)?;

        let sink = self.consensus_state.get_virtual_state(&area)?.sink;
        let selected_parent_diff =
            self.virtual_processor.chain_diff(&mut area, UtxoDiff::new(), sink, selected_parent)?;
        let (block_diff, acceptance_data) = {
            let virtual_view = self.consensus_state.virtual_utxo_set.view(&area);
            let selected_parent_view = ComposedUtxoView::new(&virtual_view, &selected_parent_diff);
            self.virtual_processor.calc_acceptance(
                &area,
                &ghostdag_data,
                daa_score,
                &selected_parent_view,
            )?
        };

        // The new block is staged under the virtual hash so the coinbase manager can read it back
        let variant = GhostdagDataVariant::Local;
        self.ghostdag_store.insert(&mut area, VIRTUAL, ghostdag_data.clone(), variant)?;
        let daa_data = BlockDaaData { daa_score, added_blocks: Arc::new(added_blocks) };
        self.daa_store.insert(&mut area, VIRTUAL, daa_data)?;
        self.acceptance_data_store.insert(&mut area, VIRTUAL, Arc::new(acceptance_data))?;
        let (coinbase, coinbase_has_red_reward) =
            self.coinbase_manager.expected_coinbase_transaction(&area, VIRTUAL, coinbase_data)?;

        let mut state_diff = selected_parent_diff.with_diff(&block_diff).map_err(|err| {
            ConsensusError::DataIntegrity(format!("utxo state of template: {err}"))
        })?;
        let virtual_view = self.consensus_state.virtual_utxo_set.view(&area);
        for tx in transactions.iter() {
            let populated = {
                let view = ComposedUtxoView::new(&virtual_view, &state_diff);
                let (populated, _fee) = self
                    .transaction_validator
                    .validate_transaction_in_context(tx, &view, daa_score)?;
                populated
            };
            state_diff.add_transaction(&populated, daa_score).map_err(|err| {
                ConsensusError::DataIntegrity(format!("template transaction {}: {err}", tx.id()))
            })?;
        }

        let mut latest_parent_timestamp = 0;
        for &parent in parents {
            let parent_timestamp = self.headers.get_header(&area, parent)?.timestamp;
            latest_parent_timestamp = latest_parent_timestamp.max(parent_timestamp);
        }
        let timestamp = timestamp.max(latest_parent_timestamp + 1);
        let bits = self.daa_manager.calc_required_bits(&area, selected_parent)?;
        let mut block_transactions = Vec::with_capacity(transactions.len() + 1);
        block_transactions.push(coinbase);
        block_transactions.extend(transactions);
        let header = Header::new_finalized(
            BLOCK_VERSION,
            parents.to_vec(),
            calc_merkle_root(block_transactions.iter().map(|tx| tx.id())),
            timestamp,
            bits,
            0,
            daa_score,
            ghostdag_data.blue_work,
            ghostdag_data.blue_score,
        );
        debug!(
            selected_parent = %selected_parent,
            blue_score = ghostdag_data.blue_score,
            daa_score,
            transactions = block_transactions.len(),
            "built block template"
        );
        Ok(BlockTemplate {
            block: Block::new(header, block_transactions),
            coinbase_has_red_reward,
            selected_parent_hash: selected_parent,
        })
    }
}

fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
