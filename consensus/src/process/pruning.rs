//! Pruning point management
//!
//! The pruning point trails the sink by `pruning_depth` blue score along the
//! selected chain. Moving it advances the pruning-point UTXO set and prunes its
//! past: chain blocks keep their header, relations and GHOSTDAG data as proof
//! material, every other block is deleted. Chain blocks sinking a further
//! `pruning_depth` below the pruning point are deleted as well, the lowest one
//! kept is the history root.
//!
//! A node syncing from a pruning point instead imports the UTXO set of that
//! point chunk by chunk. Block processing is refused while the import flag is
//! set, and the flag only clears in the commit that switches to the new state.

use crate::consensus::dag::relations::{DbRelationsStore, RelationsStore, RelationsStoreReader};
use crate::consensus::dag::topology::DagTopology;
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStore, GhostdagStoreReader};
use crate::consensus::storage::acceptance_data::{AcceptanceDataStore, DbAcceptanceDataStore};
use crate::consensus::storage::block_store::{
    BlockHeaderStore, BlockHeaderStoreReader, BlockStore, DbBlockTransactionsStore, DbHeadersStore,
};
use crate::consensus::storage::consensus_state::{
    ConsensusStateStore, ConsensusStateStoreReader, DbConsensusStateStore,
};
use crate::consensus::storage::daa::{DaaStore, DbDaaStore};
use crate::consensus::storage::pruning::{
    DbPruningStore, PruningPointInfo, PruningStore, PruningStoreReader,
};
use crate::consensus::storage::selected_chain::{
    DbSelectedChainStore, SelectedChainStore, SelectedChainStoreReader,
};
use crate::consensus::storage::statuses::{DbStatusesStore, StatusesStore, StatusesStoreReader};
use crate::consensus::storage::utxo_diffs::{DbUtxoDiffsStore, UtxoDiffsStore, UtxoDiffsStoreReader};
use crate::consensus::storage::utxo_set::{UtxoSetStore, ITERATION_PAGE};
use crate::errors::{ConsensusError, ConsensusResult};
use crate::pipeline::virtual_processor::VirtualStateProcessor;
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::blockstatus::BlockStatus;
use consensus_core::errors::RuleError;
use consensus_core::pruning::PruningPointUtxoChunk;
use consensus_core::utxo::UtxoDiff;
use consensus_core::Hash;
use database::{DbResult, DbResultExt, StagingArea};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, trace};

pub struct PruningManager {
    pruning_depth: u64,

    headers: Arc<DbHeadersStore>,
    block_transactions: Arc<DbBlockTransactionsStore>,
    relations: Arc<DbRelationsStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    statuses: Arc<DbStatusesStore>,
    daa_store: Arc<DbDaaStore>,
    acceptance_data_store: Arc<DbAcceptanceDataStore>,
    utxo_diffs_store: Arc<DbUtxoDiffsStore>,
    consensus_state: Arc<DbConsensusStateStore>,
    pruning_store: Arc<DbPruningStore>,
    selected_chain: Arc<DbSelectedChainStore>,

    topology: DagTopology,
    virtual_processor: Arc<VirtualStateProcessor>,
}

/// What a pruning point move removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PruneCounts {
    stripped: usize,
    deleted: usize,
}

impl PruningManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pruning_depth: u64,
        headers: Arc<DbHeadersStore>,
        block_transactions: Arc<DbBlockTransactionsStore>,
        relations: Arc<DbRelationsStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        statuses: Arc<DbStatusesStore>,
        daa_store: Arc<DbDaaStore>,
        acceptance_data_store: Arc<DbAcceptanceDataStore>,
        utxo_diffs_store: Arc<DbUtxoDiffsStore>,
        consensus_state: Arc<DbConsensusStateStore>,
        pruning_store: Arc<DbPruningStore>,
        selected_chain: Arc<DbSelectedChainStore>,
        topology: DagTopology,
        virtual_processor: Arc<VirtualStateProcessor>,
    ) -> Self {
        Self {
            pruning_depth,
            headers,
            block_transactions,
            relations,
            ghostdag_store,
            statuses,
            daa_store,
            acceptance_data_store,
            utxo_diffs_store,
            consensus_state,
            pruning_store,
            selected_chain,
            topology,
            virtual_processor,
        }
    }

    /// The highest block on the chain of `sink` above `current` that lies at least
    /// `pruning_depth` blue score below the sink. The search resumes at `current`.
    pub fn next_pruning_point(
        &self,
        area: &StagingArea,
        current: Hash,
        sink: Hash,
    ) -> ConsensusResult<Option<Hash>> {
        let sink_score = self.ghostdag_store.get_blue_score(area, sink)?;
        if sink_score < self.pruning_depth {
            return Ok(None);
        }
        let chain = &self.selected_chain;
        let Some(current_index) = chain.get_by_hash(area, current).optional()? else {
            return Ok(None);
        };
        let Some(sink_index) = chain.get_by_hash(area, sink).optional()? else {
            return Ok(None);
        };

        let mut candidate = None;
        for index in current_index + 1..=sink_index {
            let hash = self.selected_chain.get_by_index(area, index)?;
            if self.ghostdag_store.get_blue_score(area, hash)? + self.pruning_depth > sink_score {
                break;
            }
            candidate = Some(hash);
        }
        Ok(candidate)
    }

    /// Moves the pruning point if the sink got far enough ahead of it
    pub fn advance_pruning_point(&self, area: &mut StagingArea) -> ConsensusResult<()> {
        let info = self.pruning_store.get_pruning_point_info(area)?;
        let sink = self.consensus_state.get_virtual_state(area)?.sink;
        let current = info.pruning_point;
        let Some(new_pruning_point) = self.next_pruning_point(area, current, sink)? else {
            return Ok(());
        };

        let mut diff = UtxoDiff::new();
        let moved = self.topology.chain_down_to(area, new_pruning_point, info.pruning_point)?;
        for hash in moved.into_iter().rev() {
            let block_diff = self.utxo_diffs_store.get(area, hash)?;
            diff = diff.with_diff(&block_diff).map_err(|err| {
                ConsensusError::DataIntegrity(format!("utxo diff of {hash}: {err}"))
            })?;
        }
        self.pruning_store.pruning_point_utxo_set.stage_diff(area, &diff)?;
        let index = info.index + 1;
        let new_info = PruningPointInfo { pruning_point: new_pruning_point, index };
        self.pruning_store.set_pruning_point(area, new_info)?;

        let past = self.prune_past(area, new_pruning_point)?;
        let history = self.prune_history(area, new_pruning_point)?;
        info!(
            old_pruning_point = %info.pruning_point,
            new_pruning_point = %new_pruning_point,
            index,
            stripped = past.stripped,
            deleted = past.deleted + history,
            "pruning point moved"
        );
        Ok(())
    }

    /// Prunes everything in the past of `pruning_point` that an earlier move left alone.
    /// Chain blocks are stripped to their header, the rest is deleted.
    fn prune_past(
        &self,
        area: &mut StagingArea,
        pruning_point: Hash,
    ) -> ConsensusResult<PruneCounts> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<Hash> =
            self.relations.get_parents(area, pruning_point)?.iter().copied().collect();
        let mut counts = PruneCounts::default();
        while let Some(hash) = queue.pop_front() {
            if hash.is_sentinel() || !visited.insert(hash) {
                continue;
            }
            match self.statuses.get_status_opt(area, hash)? {
                None | Some(BlockStatus::HeaderOnly) => continue,
                Some(_) => {}
            }
            let parents = self.relations.get_parents(area, hash)?;
            if self.selected_chain.get_by_hash(area, hash).optional()?.is_some() {
                self.block_transactions.delete_transactions(area, hash)?;
                self.acceptance_data_store.delete(area, hash)?;
                self.utxo_diffs_store.delete(area, hash)?;
                self.statuses.set_status(area, hash, BlockStatus::HeaderOnly)?;
                counts.stripped += 1;
                trace!(block = %hash, "stripped chain block to its header");
            } else {
                self.delete_block(area, hash)?;
                counts.deleted += 1;
                trace!(block = %hash, "deleted block");
            }
            queue.extend(parents.iter().copied());
        }
        Ok(counts)
    }

    /// Deletes the chain blocks more than `pruning_depth` blue score below `pruning_point`
    /// and moves the history root up to the lowest chain block left. Returns how many were deleted.
    fn prune_history(&self, area: &mut StagingArea, pruning_point: Hash) -> ConsensusResult<usize> {
        let root = self.pruning_store.get_history_root(area)?;
        let root_index = self.selected_chain.get_by_hash(area, root)?;
        let pruning_point_index = self.selected_chain.get_by_hash(area, pruning_point)?;
        let pruning_point_score = self.ghostdag_store.get_blue_score(area, pruning_point)?;

        let mut new_root = (root_index, root);
        for index in root_index + 1..=pruning_point_index {
            let hash = self.selected_chain.get_by_index(area, index)?;
            let blue_score = self.ghostdag_store.get_blue_score(area, hash)?;
            if blue_score + self.pruning_depth > pruning_point_score {
                break;
            }
            new_root = (index, hash);
        }
        if new_root.0 == root_index {
            return Ok(0);
        }

        for index in root_index..new_root.0 {
            let hash = self.selected_chain.get_by_index(area, index)?;
            self.delete_block(area, hash)?;
        }
        self.selected_chain.prune_below(area, new_root.0)?;
        self.pruning_store.set_history_root(area, new_root.1)?;
        debug!(old_root = %root, new_root = %new_root.1, "history root moved");
        Ok((new_root.0 - root_index) as usize)
    }

    fn delete_block(&self, area: &mut StagingArea, hash: Hash) -> ConsensusResult<()> {
        self.headers.delete_header(area, hash)?;
        self.relations.delete(area, hash)?;
        self.ghostdag_store.delete(area, hash)?;
        self.daa_store.delete(area, hash)?;
        self.block_transactions.delete_transactions(area, hash)?;
        self.acceptance_data_store.delete(area, hash)?;
        self.utxo_diffs_store.delete(area, hash)?;
        self.statuses.delete_status(area, hash)?;
        Ok(())
    }

    /// Starts a pruning-point UTXO set import, dropping whatever an earlier attempt left behind.
    /// Every write goes through `commit`.
    pub fn begin_pruning_point_utxo_import(
        &self,
        mut commit: impl FnMut(StagingArea) -> DbResult<()>,
    ) -> ConsensusResult<()> {
        let mut area = StagingArea::new();
        self.consensus_state.set_importing_pruning_point_utxo_set(&mut area, true)?;
        commit(area)?;
        let dropped = self
            .consensus_state
            .imported_pruning_point_utxos
            .clear_committed(ITERATION_PAGE, &mut commit)?;
        debug!(dropped, "began pruning point utxo set import");
        Ok(())
    }

    pub fn append_imported_pruning_point_utxos(
        &self,
        area: &mut StagingArea,
        chunk: &PruningPointUtxoChunk,
    ) -> ConsensusResult<()> {
        if !self.consensus_state.is_importing_pruning_point_utxo_set(area)? {
            return Err(RuleError::NoUtxoImportInProgress.into());
        }
        self.consensus_state.imported_pruning_point_utxos.stage_entries(area, chunk)?;
        trace!(entries = chunk.len(), "staged imported utxo chunk");
        Ok(())
    }

    /// Makes the imported set the UTXO set of both `pruning_point` and the virtual.
    /// The pruning point becomes the only tip, the sink and the history root.
    ///
    /// The sets are rewritten a page per commit while the import flag is still set.
    /// Clearing the flag, the pruning point and the virtual state go in one commit.
    pub fn commit_pruning_point_utxo_import(
        &self,
        pruning_point: Hash,
        mut commit: impl FnMut(StagingArea) -> DbResult<()>,
    ) -> ConsensusResult<()> {
        {
            let area = StagingArea::new();
            if !self.consensus_state.is_importing_pruning_point_utxo_set(&area)? {
                return Err(RuleError::NoUtxoImportInProgress.into());
            }
            if !self.headers.has_header(&area, pruning_point)?
                || !self.ghostdag_store.has(&area, pruning_point)?
            {
                return Err(RuleError::UnknownPruningPoint(pruning_point).into());
            }
        }

        let virtual_set = &self.consensus_state.virtual_utxo_set;
        let pruning_point_set = &self.pruning_store.pruning_point_utxo_set;
        let imported_set = &self.consensus_state.imported_pruning_point_utxos;
        virtual_set.clear_committed(ITERATION_PAGE, &mut commit)?;
        pruning_point_set.clear_committed(ITERATION_PAGE, &mut commit)?;
        let imported = imported_set.copy_committed_into(
            &[virtual_set, pruning_point_set],
            ITERATION_PAGE,
            &mut commit,
        )?;

        let mut area = StagingArea::new();
        let info = self.pruning_store.get_pruning_point_info(&area)?;
        if info.pruning_point != pruning_point {
            let new_info = PruningPointInfo { pruning_point, index: info.index + 1 };
            self.pruning_store.set_pruning_point(&mut area, new_info)?;
        }
        self.pruning_store.set_history_root(&mut area, pruning_point)?;
        self.selected_chain.init_with(&mut area, pruning_point)?;
        self.consensus_state.set_tips(&mut area, Arc::new(vec![pruning_point]))?;
        let state = self.virtual_processor.calc_virtual_state(
            &area,
            pruning_point,
            vec![pruning_point],
            UtxoDiff::new(),
        )?;
        self.consensus_state.set_virtual_state(&mut area, Arc::new(state))?;
        self.statuses.set_status(&mut area, pruning_point, BlockStatus::UtxoValid)?;
        self.consensus_state.set_importing_pruning_point_utxo_set(&mut area, false)?;
        commit(area)?;

        imported_set.clear_committed(ITERATION_PAGE, &mut commit)?;
        info!(pruning_point = %pruning_point, imported, "imported pruning point utxo set");
        Ok(())
    }
}
