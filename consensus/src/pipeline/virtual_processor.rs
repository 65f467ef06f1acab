//! Virtual state processor
//!
//! Keeps the virtual block in sync with the DAG tips. The UTXO state of a chain
//! block is the state of its selected parent plus whatever its mergeset
//! accepted; the virtual UTXO set is the state of the sink. Moving the sink
//! unwinds the diffs of the old chain and applies those of the new one,
//! computing and verifying the missing ones on the way.

use crate::consensus::dag::relations::{DbRelationsStore, RelationsStore};
use crate::consensus::dag::topology::DagTopology;
use crate::consensus::difficulty::DaaManager;
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStore, GhostdagStoreReader};
use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::acceptance_data::{AcceptanceDataStore, DbAcceptanceDataStore};
use crate::consensus::storage::block_store::{
    BlockHeaderStore, BlockStore, BlockStoreReader, DbBlockTransactionsStore, DbHeadersStore,
};
use crate::consensus::storage::consensus_state::{
    ConsensusStateStore, ConsensusStateStoreReader, DbConsensusStateStore, VirtualState,
};
use crate::consensus::storage::daa::{BlockDaaData, DaaStore, DaaStoreReader, DbDaaStore};
use crate::consensus::storage::pruning::{DbPruningStore, PruningStoreReader};
use crate::consensus::storage::selected_chain::{
    DbSelectedChainStore, SelectedChainStore, SelectedChainStoreReader,
};
use crate::consensus::storage::statuses::{DbStatusesStore, StatusesStore, StatusesStoreReader};
use crate::consensus::storage::utxo_diffs::{DbUtxoDiffsStore, UtxoDiffsStore, UtxoDiffsStoreReader};
use crate::consensus::storage::utxo_set::UtxoSetStore;
use crate::consensus::validation::TransactionValidator;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::process::coinbase::CoinbaseManager;
use consensus_core::acceptance_data::{AcceptanceData, AcceptedTxEntry, MergesetBlockAcceptanceData};
use consensus_core::block::Block;
use consensus_core::blockstatus::BlockStatus;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::{GhostdagData, GhostdagDataVariant};
use consensus_core::tx::{PopulatedTransaction, Transaction, TransactionIndexType};
use consensus_core::utxo::{ComposedUtxoView, UtxoAlgebraError, UtxoDiff, UtxoView};
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::{BlockHashSet, Hash};
use database::{DbResultExt, StagingArea};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

pub struct VirtualStateProcessor {
    genesis_hash: Hash,
    max_block_parents: usize,

    headers: Arc<DbHeadersStore>,
    block_transactions: Arc<DbBlockTransactionsStore>,
    relations: Arc<DbRelationsStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    statuses: Arc<DbStatusesStore>,
    daa_store: Arc<DbDaaStore>,
    acceptance_data_store: Arc<DbAcceptanceDataStore>,
    utxo_diffs_store: Arc<DbUtxoDiffsStore>,
    consensus_state: Arc<DbConsensusStateStore>,
    selected_chain: Arc<DbSelectedChainStore>,
    pruning_store: Arc<DbPruningStore>,

    ghostdag_protocol: Arc<GhostdagProtocol>,
    daa_manager: Arc<DaaManager>,
    topology: DagTopology,
    coinbase_manager: Arc<CoinbaseManager>,
    transaction_validator: Arc<TransactionValidator>,
}

impl VirtualStateProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        genesis_hash: Hash,
        max_block_parents: usize,
        headers: Arc<DbHeadersStore>,
        block_transactions: Arc<DbBlockTransactionsStore>,
        relations: Arc<DbRelationsStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        statuses: Arc<DbStatusesStore>,
        daa_store: Arc<DbDaaStore>,
        acceptance_data_store: Arc<DbAcceptanceDataStore>,
        utxo_diffs_store: Arc<DbUtxoDiffsStore>,
        consensus_state: Arc<DbConsensusStateStore>,
        selected_chain: Arc<DbSelectedChainStore>,
        pruning_store: Arc<DbPruningStore>,
        ghostdag_protocol: Arc<GhostdagProtocol>,
        daa_manager: Arc<DaaManager>,
        topology: DagTopology,
        coinbase_manager: Arc<CoinbaseManager>,
        transaction_validator: Arc<TransactionValidator>,
    ) -> Self {
        Self {
            genesis_hash,
            max_block_parents,
            headers,
            block_transactions,
            relations,
            ghostdag_store,
            statuses,
            daa_store,
            acceptance_data_store,
            utxo_diffs_store,
            consensus_state,
            selected_chain,
            pruning_store,
            ghostdag_protocol,
            daa_manager,
            topology,
            coinbase_manager,
            transaction_validator,
        }
    }

    /// Stages genesis as the only block, tip and sink
    pub fn init_genesis_state(
        &self,
        area: &mut StagingArea,
        genesis: &Block,
    ) -> ConsensusResult<()> {
        let hash = genesis.hash();
        if hash != self.genesis_hash {
            return Err(ConsensusError::DataIntegrity(format!(
                "genesis block hashes to {hash}, expected {}",
                self.genesis_hash
            )));
        }
        self.headers.insert_header(area, Arc::new(genesis.header.clone()))?;
        let transactions = Arc::new(genesis.transactions.clone());
        self.block_transactions.insert_transactions(area, hash, transactions)?;
        self.relations.insert(area, hash, Arc::new(vec![]))?;
        let ghostdag_data = Arc::new(self.ghostdag_protocol.genesis_ghostdag_data());
        self.ghostdag_store.insert(area, hash, ghostdag_data, GhostdagDataVariant::Local)?;
        let daa_data =
            BlockDaaData { daa_score: genesis.header.daa_score, added_blocks: Default::default() };
        self.daa_store.insert(area, hash, daa_data)?;
        // Genesis merges nothing, its own coinbase is accepted by its first chain child
        self.utxo_diffs_store.insert(area, hash, Arc::new(UtxoDiff::new()))?;
        self.acceptance_data_store.insert(area, hash, Arc::new(AcceptanceData::new()))?;
        self.statuses.set_status(area, hash, BlockStatus::UtxoValid)?;
        self.consensus_state.set_tips(area, Arc::new(vec![hash]))?;
        self.selected_chain.init_with(area, hash)?;
        let state = self.calc_virtual_state(area, hash, vec![hash], UtxoDiff::new())?;
        self.consensus_state.set_virtual_state(area, Arc::new(state))?;
        info!(genesis = %hash, "initialized consensus state from genesis");
        Ok(())
    }

    /// Recomputes the virtual block from the current tips and moves the virtual UTXO set to
    /// the new sink.
    ///
    /// A chain block whose coinbase fails verification on the way is disqualified from the chain
    /// and the sink is picked again, so the outcome does not depend on which block triggered it.
    pub fn resolve_virtual(&self, area: &mut StagingArea) -> ConsensusResult<()> {
        let tips = self.consensus_state.get_tips(area)?;
        let previous = self.consensus_state.get_virtual_state(area)?;
        let (sink, parents, diff) = loop {
            let parents = self.pick_virtual_parents(area, &tips)?;
            let sink = *parents.first().ok_or_else(|| {
                ConsensusError::DataIntegrity("no tip has a qualified chain".into())
            })?;
            match self.chain_diff(area, UtxoDiff::new(), previous.sink, sink) {
                Ok(diff) => break (sink, parents, diff),
                Err(ConsensusError::Rule(RuleError::BadCoinbaseTransaction(offender))) => {
                    warn!(
                        block = %offender,
                        candidate_sink = %sink,
                        "coinbase failed verification, disqualified from the chain"
                    );
                    let status = BlockStatus::DisqualifiedFromChain;
                    self.statuses.set_status(area, offender, status)?;
                }
                Err(err) => return Err(err),
            }
        };
        self.consensus_state.virtual_utxo_set.stage_diff(area, &diff)?;
        self.update_selected_chain(area, sink)?;

        if sink != previous.sink {
            if self.topology.is_chain_ancestor_of(area, previous.sink, sink)? {
                debug!(old_sink = %previous.sink, new_sink = %sink, "sink advanced");
            } else {
                let split = self.topology.find_common_chain_ancestor(area, previous.sink, sink)?;
                info!(
                    old_sink = %previous.sink,
                    new_sink = %sink,
                    split = %split,
                    "virtual chain reorg"
                );
            }
        }

        let state = self.calc_virtual_state(area, sink, parents, diff)?;
        self.consensus_state.set_virtual_state(area, Arc::new(state))?;
        Ok(())
    }

    /// Re-indexes the selected chain from the highest indexed chain block of `sink` upwards
    fn update_selected_chain(&self, area: &mut StagingArea, sink: Hash) -> ConsensusResult<()> {
        let mut added = Vec::new();
        let mut current = sink;
        let split_index = loop {
            if let Some(index) = self.selected_chain.get_by_hash(area, current).optional()? {
                break index;
            }
            if current.is_sentinel() {
                return Err(ConsensusError::DataIntegrity(format!(
                    "chain of sink {sink} never meets the selected chain"
                )));
            }
            added.push(current);
            current = self.ghostdag_store.get_selected_parent(area, current)?;
        };
        added.reverse();
        self.selected_chain.apply_changes(area, split_index, &added)?;
        Ok(())
    }

    pub(crate) fn calc_virtual_state(
        &self,
        area: &StagingArea,
        sink: Hash,
        parents: Vec<Hash>,
        utxo_diff: UtxoDiff,
    ) -> ConsensusResult<VirtualState> {
        let ghostdag_data = self.ghostdag_protocol.ghostdag(area, &parents)?;
        let (daa_score, _) =
            self.daa_manager.calc_daa_score_and_added_blocks(area, &ghostdag_data)?;
        Ok(VirtualState { parents, ghostdag_data, daa_score, sink, utxo_diff })
    }

    /// Virtual parents ordered best first (most blue work, then smaller hash), capped at
    /// `max_block_parents`.
    ///
    /// A tip with a block disqualified from the chain on its selected chain competes for the sink
    /// through the highest chain block below every disqualified one, and is not merged itself.
    /// The first parent is the sink, the others are tips with a qualified chain.
    pub fn pick_virtual_parents(
        &self,
        area: &StagingArea,
        tips: &[Hash],
    ) -> ConsensusResult<Vec<Hash>> {
        let mut ranked = Vec::with_capacity(tips.len());
        let mut qualified_tips = BlockHashSet::with_capacity(tips.len());
        for &tip in tips {
            let Some(candidate) = self.highest_qualified_chain_block(area, tip)? else { continue };
            if candidate == tip {
                qualified_tips.insert(tip);
            }
            ranked.push((Reverse(self.ghostdag_store.get_blue_work(area, candidate)?), candidate));
        }
        ranked.sort();
        ranked.dedup();

        let Some(&(_, sink)) = ranked.first() else { return Ok(vec![]) };
        let others = ranked
            .iter()
            .map(|&(_, hash)| hash)
            .filter(|hash| *hash != sink && qualified_tips.contains(hash));
        Ok(std::iter::once(sink).chain(others).take(self.max_block_parents).collect())
    }

    /// Walks the selected chain of `tip` down to the first verified block and returns the highest
    /// block with no disqualified block at or above it on that path. `None` if the walk leaves the
    /// known part of the DAG before finding one.
    fn highest_qualified_chain_block(
        &self,
        area: &StagingArea,
        tip: Hash,
    ) -> ConsensusResult<Option<Hash>> {
        let mut candidate = tip;
        let mut current = tip;
        loop {
            if current.is_sentinel() {
                return Ok((candidate != current).then_some(candidate));
            }
            match self.statuses.get_status_opt(area, current)? {
                Some(BlockStatus::UtxoPendingVerification) => {}
                Some(BlockStatus::DisqualifiedFromChain) => {
                    current = self.ghostdag_store.get_selected_parent(area, current)?;
                    candidate = current;
                    continue;
                }
                Some(BlockStatus::HeaderOnly) | None => {
                    return Ok((candidate != current).then_some(candidate))
                }
                Some(_) => return Ok(Some(candidate)),
            }
            current = self.ghostdag_store.get_selected_parent(area, current)?;
        }
    }

    /// The diff moving the UTXO state from chain block `from` to chain block `to`, composed on
    /// top of `base_diff`.
    ///
    /// The state of `from` must be the virtual UTXO set as seen through `area` plus `base_diff`.
    /// Chain blocks of `to` without a stored diff get their diff, acceptance data and coinbase
    /// verified and staged, and are marked UTXO valid.
    pub fn chain_diff(
        &self,
        area: &mut StagingArea,
        base_diff: UtxoDiff,
        from: Hash,
        to: Hash,
    ) -> ConsensusResult<UtxoDiff> {
        if from == to {
            return Ok(base_diff);
        }
        let pruning_point = self.pruning_store.get_pruning_point(area)?;
        let split = match self.topology.find_common_chain_ancestor(area, from, to) {
            Ok(split) => split,
            // the chains only meet below the kept history
            Err(err) if err.is_not_found() => {
                return Err(RuleError::ReorgBelowPruningPoint(from, to, pruning_point).into())
            }
            Err(err) => return Err(err.into()),
        };
        let split_score = self.ghostdag_store.get_blue_score(area, split)?;
        if split_score < self.ghostdag_store.get_blue_score(area, pruning_point)? {
            return Err(RuleError::ReorgBelowPruningPoint(from, to, pruning_point).into());
        }
        let mut diff = base_diff;
        for hash in self.topology.chain_down_to(area, from, split)? {
            let block_diff = self.utxo_diffs_store.get(area, hash)?;
            diff = diff
                .with_diff(&block_diff.reversed())
                .map_err(|err| algebra_violation(hash, err))?;
        }

        let new_chain = self.topology.chain_down_to(area, to, split)?;
        for &hash in new_chain.iter().rev() {
            let block_diff = match self.utxo_diffs_store.get(area, hash).optional()? {
                Some(block_diff) => block_diff,
                None => self.verify_chain_block(area, hash, &diff)?,
            };
            diff = diff.with_diff(&block_diff).map_err(|err| algebra_violation(hash, err))?;
        }
        trace!(
            from = %from,
            to = %to,
            split = %split,
            added = diff.add.len(),
            removed = diff.remove.len(),
            "computed chain diff"
        );
        Ok(diff)
    }

    /// Computes the UTXO diff of a chain block whose selected parent state is the virtual set plus
    /// `selected_parent_diff`, checks its coinbase and stages the results.
    fn verify_chain_block(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        selected_parent_diff: &UtxoDiff,
    ) -> ConsensusResult<Arc<UtxoDiff>> {
        let ghostdag_data = self.ghostdag_store.get_data(area, hash)?;
        let daa_score = self.daa_store.get_daa_score(area, hash)?;
        let (block_diff, acceptance_data) = {
            let virtual_view = self.consensus_state.virtual_utxo_set.view(area);
            let selected_parent_view = ComposedUtxoView::new(&virtual_view, selected_parent_diff);
            self.calc_acceptance(area, &ghostdag_data, daa_score, &selected_parent_view)?
        };
        self.acceptance_data_store.insert(area, hash, Arc::new(acceptance_data))?;
        if let Err(err) = self.verify_coinbase(area, hash) {
            self.acceptance_data_store.delete(area, hash)?;
            return Err(err);
        }

        let block_diff = Arc::new(block_diff);
        self.utxo_diffs_store.insert(area, hash, block_diff.clone())?;
        self.statuses.set_status(area, hash, BlockStatus::UtxoValid)?;
        debug!(block = %hash, daa_score, "verified chain block utxo state");
        Ok(block_diff)
    }

    fn verify_coinbase(&self, area: &StagingArea, hash: Hash) -> ConsensusResult<()> {
        let transactions = self.block_transactions.get_transactions(area, hash)?;
        let coinbase = first_coinbase(&transactions, hash)?;
        let payload = self.coinbase_manager.extract_coinbase_payload(coinbase)?;
        let (expected, _) = self.coinbase_manager.expected_coinbase_transaction(
            area,
            hash,
            &payload.coinbase_data,
        )?;
        if expected.id() != coinbase.id() {
            return Err(RuleError::BadCoinbaseTransaction(hash).into());
        }
        Ok(())
    }

    /// Walks the mergeset in consensus order and accepts every transaction that is valid
    /// against `base` plus what was accepted before it. The coinbase of the selected parent
    /// is always accepted, those of other merged blocks never are.
    pub fn calc_acceptance<V>(
        &self,
        area: &StagingArea,
        ghostdag_data: &GhostdagData,
        daa_score: u64,
        base: &V,
    ) -> ConsensusResult<(UtxoDiff, AcceptanceData)>
    where
        V: UtxoView,
        ConsensusError: From<V::Error>,
    {
        let mut diff = UtxoDiff::new();
        let mergeset = self.ghostdag_protocol.consensus_ordered_mergeset(area, ghostdag_data)?;
        let mut acceptance_data = AcceptanceData::with_capacity(mergeset.len());

        for (position, merged) in mergeset.into_iter().enumerate() {
            let is_selected_parent = position == 0;
            let transactions = self.block_transactions.get_transactions(area, merged)?;
            let mut accepted_transactions = Vec::with_capacity(transactions.len());

            for (index, tx) in transactions.iter().enumerate() {
                let outcome = if tx.is_coinbase() {
                    is_selected_parent.then(|| (PopulatedTransaction::new(tx, vec![]), 0))
                } else {
                    let view = ComposedUtxoView::new(base, &diff);
                    self.try_accept(tx, &view, daa_score)?
                };
                let (is_accepted, fee) = match outcome {
                    Some((populated, fee)) => {
                        diff.add_transaction(&populated, daa_score)
                            .map_err(|err| algebra_violation(merged, err))?;
                        (true, fee)
                    }
                    None => (false, 0),
                };
                accepted_transactions.push(AcceptedTxEntry {
                    transaction_id: tx.id(),
                    index_within_block: index as TransactionIndexType,
                    is_accepted,
                    fee,
                });
            }
            acceptance_data
                .push(MergesetBlockAcceptanceData { block_hash: merged, accepted_transactions });
        }
        Ok((diff, acceptance_data))
    }

    /// `Ok(None)` when the transaction breaks a rule in this context
    fn try_accept<'a, V>(
        &self,
        tx: &'a Transaction,
        view: &V,
        pov_daa_score: u64,
    ) -> ConsensusResult<Option<(PopulatedTransaction<'a>, u64)>>
    where
        V: UtxoView,
        ConsensusError: From<V::Error>,
    {
        let populated = match self.transaction_validator.populate_transaction(tx, view) {
            Ok(populated) => populated,
            Err(ConsensusError::Tx(err)) => {
                trace!(tx = %tx.id(), %err, "transaction not accepted");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let validator = &self.transaction_validator;
        match validator.validate_populated_transaction_and_get_fee(&populated, pov_daa_score) {
            Ok(fee) => Ok(Some((populated, fee))),
            Err(err) => {
                trace!(tx = %tx.id(), %err, "transaction not accepted");
                Ok(None)
            }
        }
    }
}

pub(crate) fn first_coinbase(
    transactions: &[Transaction],
    hash: Hash,
) -> ConsensusResult<&Transaction> {
    transactions
        .first()
        .filter(|tx| tx.is_coinbase())
        .ok_or_else(|| {
            ConsensusError::DataIntegrity(format!(
                "stored body of {hash} does not start with a coinbase"
            ))
        })
}

fn algebra_violation(hash: Hash, err: UtxoAlgebraError) -> ConsensusError {
    ConsensusError::DataIntegrity(format!("utxo diff of {hash}: {err}"))
}
