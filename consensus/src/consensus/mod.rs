//! The consensus engine
//!
//! [`Consensus`] wires the stores, the GHOSTDAG and DAA managers, the block
//! pipeline and the pruning machinery over one database, and serves
//! [`ConsensusApi`]. Mutations take the process lock, so blocks are appended
//! and the virtual is resolved one operation at a time.

pub mod dag;
pub mod difficulty;
pub mod ghostdag;
pub mod storage;
pub mod validation;

use crate::api::ConsensusApi;
use crate::config::Config;
use crate::errors::ConsensusResult;
use crate::pipeline::{BlockProcessor, BodyProcessor, HeaderProcessor, VirtualStateProcessor};
use crate::process::{BlockTemplateBuilder, CoinbaseManager, PruningManager, PruningProofManager};
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::block::{Block, BlockTemplate};
use consensus_core::blockstatus::BlockStatus;
use consensus_core::coinbase::CoinbaseData;
use consensus_core::errors::RuleError;
use consensus_core::config::params::Params;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::mass::MassCalculator;
use consensus_core::pruning::{PruningPointProof, PruningPointUtxoChunk};
use consensus_core::trusted::TrustedBlock;
use consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutpoint, UtxoEntry};
use consensus_core::Hash;
use dag::DagTopology;
use database::{Database, DbResultExt, StagingArea};
use difficulty::DaaManager;
use ghostdag::{GhostdagProtocol, GhostdagStoreReader};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use storage::acceptance_data::AcceptanceDataStoreReader;
use storage::block_store::{BlockHeaderStoreReader, BlockStoreReader};
use storage::consensus_state::ConsensusStateStoreReader;
use storage::pruning::{PruningPointInfo, PruningStore, PruningStoreReader};
use storage::statuses::StatusesStoreReader;
use storage::utxo_set::UtxoSetStoreReader;
use storage::ConsensusStorage;
use tracing::info;
use validation::{BlockValidator, HeaderValidator, TransactionValidator};

pub struct Consensus {
    params: Params,
    genesis_hash: Hash,
    storage: Arc<ConsensusStorage>,

    block_processor: BlockProcessor,
    virtual_processor: Arc<VirtualStateProcessor>,
    pruning_manager: Arc<PruningManager>,
    pruning_proof_manager: PruningProofManager,
    template_builder: BlockTemplateBuilder,
    coinbase_manager: Arc<CoinbaseManager>,
    transaction_validator: Arc<TransactionValidator>,

    /// Held by every operation that commits
    process_lock: Mutex<()>,
}

impl Consensus {
    /// Opens (or creates) the database at `path`
    pub fn open(path: impl AsRef<Path>, config: &Config) -> ConsensusResult<Self> {
        let db = Arc::new(Database::open(path)?);
        Self::new(db, config)
    }

    /// Builds the engine over `db`. An empty database is initialized with the genesis block.
    pub fn new(db: Arc<Database>, config: &Config) -> ConsensusResult<Self> {
        let params = config.params();
        let genesis = params.genesis_block();
        let genesis_hash = genesis.hash();
        let storage = Arc::new(ConsensusStorage::new(db, &config.cache));

        let topology = DagTopology::new(
            storage.relations.clone(),
            storage.ghostdag.clone(),
            storage.selected_chain.clone(),
        );
        let ghostdag_protocol = Arc::new(GhostdagProtocol::new(
            params.ghostdag_k,
            storage.ghostdag.clone(),
            storage.relations.clone(),
            storage.headers.clone(),
            topology.clone(),
        ));
        let daa_manager = Arc::new(DaaManager::new(
            params.difficulty_window_size,
            params.target_time_per_block,
            params.pow_max_bits,
            storage.ghostdag.clone(),
            storage.daa.clone(),
            storage.headers.clone(),
        ));
        let transaction_validator = Arc::new(TransactionValidator::new(params.coinbase_maturity));
        let coinbase_manager = Arc::new(CoinbaseManager::new(
            &params,
            genesis_hash,
            storage.ghostdag.clone(),
            storage.acceptance_data.clone(),
            storage.daa.clone(),
            storage.block_transactions.clone(),
        ));

        let virtual_processor = Arc::new(VirtualStateProcessor::new(
            genesis_hash,
            params.max_block_parents as usize,
            storage.headers.clone(),
            storage.block_transactions.clone(),
            storage.relations.clone(),
            storage.ghostdag.clone(),
            storage.statuses.clone(),
            storage.daa.clone(),
            storage.acceptance_data.clone(),
            storage.utxo_diffs.clone(),
            storage.consensus_state.clone(),
            storage.selected_chain.clone(),
            storage.pruning.clone(),
            ghostdag_protocol.clone(),
            daa_manager.clone(),
            topology.clone(),
            coinbase_manager.clone(),
            transaction_validator.clone(),
        ));
        let pruning_manager = Arc::new(PruningManager::new(
            params.pruning_depth,
            storage.headers.clone(),
            storage.block_transactions.clone(),
            storage.relations.clone(),
            storage.ghostdag.clone(),
            storage.statuses.clone(),
            storage.daa.clone(),
            storage.acceptance_data.clone(),
            storage.utxo_diffs.clone(),
            storage.consensus_state.clone(),
            storage.pruning.clone(),
            storage.selected_chain.clone(),
            topology.clone(),
            virtual_processor.clone(),
        ));

        let header_processor = HeaderProcessor::new(
            HeaderValidator::new(
                params.max_block_parents as usize,
                genesis_hash,
                params.pow_max_bits,
                params.skip_proof_of_work,
                params.max_future_timestamp_offset,
                storage.headers.clone(),
                storage.statuses.clone(),
                storage.pruning.clone(),
                topology.clone(),
            ),
            ghostdag_protocol.clone(),
            daa_manager.clone(),
            storage.headers.clone(),
            storage.relations.clone(),
            storage.ghostdag.clone(),
            storage.daa.clone(),
            storage.statuses.clone(),
        );
        let body_processor = BodyProcessor::new(
            BlockValidator::new(
                transaction_validator.clone(),
                params.max_coinbase_payload_len,
                params.coinbase_payload_script_public_key_max_length,
                MassCalculator::from_params(&params),
                params.max_block_mass,
            ),
            storage.block_transactions.clone(),
            storage.statuses.clone(),
        );
        let block_processor = BlockProcessor::new(
            storage.clone(),
            header_processor,
            body_processor,
            virtual_processor.clone(),
            pruning_manager.clone(),
        );

        let pruning_proof_manager = PruningProofManager::new(
            genesis_hash,
            params.pruning_depth,
            storage.headers.clone(),
            storage.ghostdag.clone(),
            storage.pruning.clone(),
        );
        let template_builder = BlockTemplateBuilder::new(
            storage.headers.clone(),
            storage.ghostdag.clone(),
            storage.daa.clone(),
            storage.acceptance_data.clone(),
            storage.consensus_state.clone(),
            ghostdag_protocol,
            daa_manager,
            virtual_processor.clone(),
            coinbase_manager.clone(),
            transaction_validator.clone(),
        );

        let consensus = Self {
            params,
            genesis_hash,
            storage,
            block_processor,
            virtual_processor,
            pruning_manager,
            pruning_proof_manager,
            template_builder,
            coinbase_manager,
            transaction_validator,
            process_lock: Mutex::new(()),
        };
        consensus.init(&genesis)?;
        Ok(consensus)
    }

    fn init(&self, genesis: &Block) -> ConsensusResult<()> {
        let mut area = StagingArea::new();
        if self.storage.consensus_state.get_virtual_state(&area).optional()?.is_some() {
            return Ok(());
        }
        self.virtual_processor.init_genesis_state(&mut area, genesis)?;
        let pruning_point = PruningPointInfo::from_genesis(genesis.hash());
        self.storage.pruning.set_pruning_point(&mut area, pruning_point)?;
        self.storage.pruning.set_history_root(&mut area, genesis.hash())?;
        self.storage.commit(area)?;
        info!(
            network = %self.params.net,
            genesis = %genesis.hash(),
            "initialized new consensus database"
        );
        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn storage(&self) -> &Arc<ConsensusStorage> {
        &self.storage
    }

    /// UTXO set reads check this after reading. The sets are rewritten in pages
    /// during an import, so a read overlapping one may have seen a mix.
    fn ensure_utxo_sets_settled(&self) -> ConsensusResult<()> {
        if self.storage.consensus_state.is_importing_pruning_point_utxo_set(&StagingArea::new())? {
            return Err(RuleError::UtxoImportInProgress.into());
        }
        Ok(())
    }

    /// A template over `parents` instead of the virtual parents. The timestamp is
    /// the earliest one the parents allow, so the result is deterministic.
    pub fn build_block_with_parents(
        &self,
        parents: &[Hash],
        coinbase_data: &CoinbaseData,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<BlockTemplate> {
        let _guard = self.process_lock.lock();
        self.template_builder.build_block(parents, coinbase_data, transactions, 0)
    }
}

impl ConsensusApi for Consensus {
    fn validate_and_insert_block(&self, block: &Block) -> ConsensusResult<BlockStatus> {
        let _guard = self.process_lock.lock();
        self.block_processor.validate_and_insert_block(block)
    }

    fn validate_block(&self, block: &Block) -> ConsensusResult<BlockStatus> {
        let _guard = self.process_lock.lock();
        let mut area = StagingArea::new();
        self.block_processor.stage_block(&mut area, block)
    }

    fn build_block_template(
        &self,
        coinbase_data: &CoinbaseData,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<BlockTemplate> {
        let _guard = self.process_lock.lock();
        self.template_builder.build_block_template(coinbase_data, transactions)
    }

    fn import_trusted_block(&self, block: &TrustedBlock) -> ConsensusResult<BlockStatus> {
        let _guard = self.process_lock.lock();
        self.block_processor.import_trusted_block(block)
    }

    fn begin_pruning_point_utxo_import(&self) -> ConsensusResult<()> {
        let _guard = self.process_lock.lock();
        self.pruning_manager.begin_pruning_point_utxo_import(|area| self.storage.commit(area))
    }

    fn append_imported_pruning_point_utxos(
        &self,
        chunk: &PruningPointUtxoChunk,
    ) -> ConsensusResult<()> {
        let _guard = self.process_lock.lock();
        let mut area = StagingArea::new();
        self.pruning_manager.append_imported_pruning_point_utxos(&mut area, chunk)?;
        Ok(self.storage.commit(area)?)
    }

    fn commit_pruning_point_utxo_import(&self, pruning_point: Hash) -> ConsensusResult<()> {
        let _guard = self.process_lock.lock();
        self.pruning_manager
            .commit_pruning_point_utxo_import(pruning_point, |area| self.storage.commit(area))
    }

    fn get_virtual_selected_parent(&self) -> ConsensusResult<Hash> {
        Ok(self.storage.consensus_state.get_virtual_state(&StagingArea::new())?.sink)
    }

    fn get_virtual_parents(&self) -> ConsensusResult<Vec<Hash>> {
        Ok(self.storage.consensus_state.get_virtual_state(&StagingArea::new())?.parents.clone())
    }

    fn get_virtual_daa_score(&self) -> ConsensusResult<u64> {
        Ok(self.storage.consensus_state.get_virtual_state(&StagingArea::new())?.daa_score)
    }

    fn get_tips(&self) -> ConsensusResult<Vec<Hash>> {
        Ok(Vec::clone(&self.storage.consensus_state.get_tips(&StagingArea::new())?))
    }

    fn calc_block_subsidy(&self, block_hash: Hash) -> ConsensusResult<u64> {
        self.coinbase_manager.calc_block_subsidy(&StagingArea::new(), block_hash)
    }

    fn calc_subsidy_at_daa_score(&self, daa_score: u64) -> u64 {
        self.coinbase_manager.calc_subsidy_at_daa_score(daa_score)
    }

    fn expected_coinbase_transaction(
        &self,
        block_hash: Hash,
        coinbase_data: &CoinbaseData,
    ) -> ConsensusResult<(Transaction, bool)> {
        let area = StagingArea::new();
        self.coinbase_manager.expected_coinbase_transaction(&area, block_hash, coinbase_data)
    }

    fn get_virtual_utxo(
        &self,
        outpoint: &TransactionOutpoint,
    ) -> ConsensusResult<Option<UtxoEntry>> {
        let utxo_set = &self.storage.consensus_state.virtual_utxo_set;
        let entry = utxo_set.get(&StagingArea::new(), outpoint)?;
        self.ensure_utxo_sets_settled()?;
        Ok(entry)
    }

    fn get_virtual_utxos(
        &self,
        after: Option<TransactionOutpoint>,
        limit: usize,
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>> {
        let entries = self.storage.consensus_state.virtual_utxo_set.iterate(after.as_ref(), limit)?;
        self.ensure_utxo_sets_settled()?;
        Ok(entries)
    }

    fn get_utxos_by_script_public_keys(
        &self,
        scripts: &[ScriptPublicKey],
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>> {
        let scripts: HashSet<&ScriptPublicKey> = scripts.iter().collect();
        let mut found = Vec::new();
        self.storage.consensus_state.virtual_utxo_set.for_each_committed(|outpoint, entry| {
            if scripts.contains(&entry.script_public_key) {
                found.push((outpoint, entry));
            }
            Ok(())
        })?;
        self.ensure_utxo_sets_settled()?;
        Ok(found)
    }

    fn validate_transaction(&self, transaction: &Transaction) -> ConsensusResult<u64> {
        let area = StagingArea::new();
        let daa_score = self.storage.consensus_state.get_virtual_state(&area)?.daa_score;
        let view = self.storage.consensus_state.virtual_utxo_set.view(&area);
        let validator = &self.transaction_validator;
        let (_, fee) = validator.validate_transaction_in_context(transaction, &view, daa_score)?;
        self.ensure_utxo_sets_settled()?;
        Ok(fee)
    }

    fn get_ghostdag_data(&self, hash: Hash) -> ConsensusResult<Arc<GhostdagData>> {
        Ok(self.storage.ghostdag.get_data(&StagingArea::new(), hash)?)
    }

    fn get_header(&self, hash: Hash) -> ConsensusResult<Arc<Header>> {
        Ok(self.storage.headers.get_header(&StagingArea::new(), hash)?)
    }

    fn get_block(&self, hash: Hash) -> ConsensusResult<Block> {
        let area = StagingArea::new();
        let header = self.storage.headers.get_header(&area, hash)?;
        let transactions = self.storage.block_transactions.get_transactions(&area, hash)?;
        Ok(Block::new(Header::clone(&header), Vec::clone(&transactions)))
    }

    fn get_block_status(&self, hash: Hash) -> ConsensusResult<Option<BlockStatus>> {
        Ok(self.storage.statuses.get_status_opt(&StagingArea::new(), hash)?)
    }

    fn get_acceptance_data(&self, hash: Hash) -> ConsensusResult<Arc<AcceptanceData>> {
        Ok(self.storage.acceptance_data.get(&StagingArea::new(), hash)?)
    }

    fn get_pruning_point(&self) -> ConsensusResult<Hash> {
        Ok(self.storage.pruning.get_pruning_point(&StagingArea::new())?)
    }

    fn get_pruning_point_proof(&self) -> ConsensusResult<PruningPointProof> {
        self.pruning_proof_manager.get_pruning_point_proof(&StagingArea::new())
    }

    fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()> {
        self.pruning_proof_manager.validate_pruning_point_proof(proof)
    }

    fn get_pruning_point_utxos(
        &self,
        after: Option<TransactionOutpoint>,
        limit: usize,
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>> {
        let entries = self.storage.pruning.pruning_point_utxo_set.iterate(after.as_ref(), limit)?;
        self.ensure_utxo_sets_settled()?;
        Ok(entries)
    }
}
