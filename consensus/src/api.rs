//! The interface the rest of a node talks to
//!
//! Mutating calls are serialized by the engine. What-if calls stage their work
//! in a scratch area that is dropped. Reads see committed state only.

use crate::errors::ConsensusResult;
use consensus_core::acceptance_data::AcceptanceData;
use consensus_core::block::{Block, BlockTemplate};
use consensus_core::blockstatus::BlockStatus;
use consensus_core::coinbase::CoinbaseData;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::pruning::{PruningPointProof, PruningPointUtxoChunk};
use consensus_core::trusted::TrustedBlock;
use consensus_core::tx::{ScriptPublicKey, Transaction, TransactionOutpoint, UtxoEntry};
use consensus_core::Hash;
use std::sync::Arc;

pub trait ConsensusApi: Send + Sync {
    /// Validates `block` and, if it is valid, adds it to the DAG and resolves the virtual.
    /// Returns the block status on success, the violated rule otherwise.
    fn validate_and_insert_block(&self, block: &Block) -> ConsensusResult<BlockStatus>;

    /// Runs the full insertion of `block` without persisting anything
    fn validate_block(&self, block: &Block) -> ConsensusResult<BlockStatus>;

    fn build_block_template(
        &self,
        coinbase_data: &CoinbaseData,
        transactions: Vec<Transaction>,
    ) -> ConsensusResult<BlockTemplate>;

    fn import_trusted_block(&self, block: &TrustedBlock) -> ConsensusResult<BlockStatus>;

    fn begin_pruning_point_utxo_import(&self) -> ConsensusResult<()>;

    fn append_imported_pruning_point_utxos(
        &self,
        chunk: &PruningPointUtxoChunk,
    ) -> ConsensusResult<()>;

    fn commit_pruning_point_utxo_import(&self, pruning_point: Hash) -> ConsensusResult<()>;

    fn get_virtual_selected_parent(&self) -> ConsensusResult<Hash>;

    fn get_virtual_parents(&self) -> ConsensusResult<Vec<Hash>>;

    fn get_virtual_daa_score(&self) -> ConsensusResult<u64>;

    fn get_tips(&self) -> ConsensusResult<Vec<Hash>>;

    fn calc_block_subsidy(&self, block_hash: Hash) -> ConsensusResult<u64>;

    fn calc_subsidy_at_daa_score(&self, daa_score: u64) -> u64;

    fn expected_coinbase_transaction(
        &self,
        block_hash: Hash,
        coinbase_data: &CoinbaseData,
    ) -> ConsensusResult<(Transaction, bool)>;

    fn get_virtual_utxo(
        &self,
        outpoint: &TransactionOutpoint,
    ) -> ConsensusResult<Option<UtxoEntry>>;

    /// Up to `limit` virtual UTXOs in key order, starting after `after`
    fn get_virtual_utxos(
        &self,
        after: Option<TransactionOutpoint>,
        limit: usize,
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>>;

    fn get_utxos_by_script_public_keys(
        &self,
        scripts: &[ScriptPublicKey],
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>>;

    /// Validates a standalone transaction against the virtual UTXO set and returns its fee
    fn validate_transaction(&self, transaction: &Transaction) -> ConsensusResult<u64>;

    fn get_ghostdag_data(&self, hash: Hash) -> ConsensusResult<Arc<GhostdagData>>;

    fn get_header(&self, hash: Hash) -> ConsensusResult<Arc<Header>>;

    fn get_block(&self, hash: Hash) -> ConsensusResult<Block>;

    fn get_block_status(&self, hash: Hash) -> ConsensusResult<Option<BlockStatus>>;

    fn get_acceptance_data(&self, hash: Hash) -> ConsensusResult<Arc<AcceptanceData>>;

    fn get_pruning_point(&self) -> ConsensusResult<Hash>;

    fn get_pruning_point_proof(&self) -> ConsensusResult<PruningPointProof>;

    fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()>;

    /// Up to `limit` entries of the pruning-point UTXO set, starting after `after`
    fn get_pruning_point_utxos(
        &self,
        after: Option<TransactionOutpoint>,
        limit: usize,
    ) -> ConsensusResult<Vec<(TransactionOutpoint, UtxoEntry)>>;
}
