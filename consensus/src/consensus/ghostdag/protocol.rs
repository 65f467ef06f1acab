//! GHOSTDAG coloring and ordering
//!
//! A new block's selected parent is its parent with the most blue work. Every
//! other block in its past that is not in the selected parent's past forms the
//! mergeset, which is colored in ascending `(blue_work, hash)` order under the
//! k-cluster rule.

use super::stores::{DbGhostdagStore, GhostdagStoreReader};
use crate::consensus::dag::relations::{DbRelationsStore, RelationsStoreReader};
use crate::consensus::dag::topology::DagTopology;
use crate::consensus::difficulty::calc_work;
use crate::consensus::storage::block_store::{BlockHeaderStoreReader, DbHeadersStore};
use crate::errors::{ConsensusError, ConsensusResult};
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::{GhostdagData, SortableBlock};
use consensus_core::{BlueWorkType, Hash, KType};
use database::StagingArea;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

enum ColoringOutput {
    Blue(KType, HashMap<Hash, KType>),
    Red,
}

enum ColoringState {
    Blue,
    Red,
    Pending,
}

pub struct GhostdagProtocol {
    k: KType,
    ghostdag_store: Arc<DbGhostdagStore>,
    relations: Arc<DbRelationsStore>,
    headers: Arc<DbHeadersStore>,
    topology: DagTopology,
}

impl GhostdagProtocol {
    pub fn new(
        k: KType,
        ghostdag_store: Arc<DbGhostdagStore>,
        relations: Arc<DbRelationsStore>,
        headers: Arc<DbHeadersStore>,
        topology: DagTopology,
    ) -> Self {
        Self { k, ghostdag_store, relations, headers, topology }
    }

    pub fn k(&self) -> KType {
        self.k
    }

    pub fn genesis_ghostdag_data(&self) -> GhostdagData {
        GhostdagData::genesis()
    }

    /// The block with the most blue work. Equal work goes to the smaller hash.
    pub fn find_selected_parent(
        &self,
        area: &StagingArea,
        blocks: impl IntoIterator<Item = Hash>,
    ) -> ConsensusResult<Hash> {
        let mut best: Option<(BlueWorkType, Reverse<Hash>)> = None;
        for hash in blocks {
            let key = (self.ghostdag_store.get_blue_work(area, hash)?, Reverse(hash));
            if best.map_or(true, |b| key > b) {
                best = Some(key);
            }
        }
        best.map(|(_, Reverse(hash))| hash).ok_or(ConsensusError::Rule(RuleError::NoParents))
    }

    /// Sorts ascending in consensus order
    pub fn sort_blocks(
        &self,
        area: &StagingArea,
        blocks: impl IntoIterator<Item = Hash>,
    ) -> ConsensusResult<Vec<Hash>> {
        let mut sortable = blocks
            .into_iter()
            .map(|hash| -> ConsensusResult<SortableBlock> {
                Ok(SortableBlock::new(hash, self.ghostdag_store.get_blue_work(area, hash)?))
            })
            .collect::<ConsensusResult<Vec<_>>>()?;
        sortable.sort();
        Ok(sortable.into_iter().map(|s| s.hash).collect())
    }

    /// The selected parent followed by the rest of the mergeset ascending in consensus order
    pub fn consensus_ordered_mergeset(
        &self,
        area: &StagingArea,
        data: &GhostdagData,
    ) -> ConsensusResult<Vec<Hash>> {
        if data.selected_parent.is_sentinel() {
            return Ok(Vec::new());
        }
        let mut ordered = vec![data.selected_parent];
        ordered.extend(self.sort_blocks(area, data.unordered_mergeset_without_selected_parent())?);
        Ok(ordered)
    }

    /// Computes the GHOSTDAG data of a block with the given parents. Parent
    /// data must be stored or staged.
    pub fn ghostdag(&self, area: &StagingArea, parents: &[Hash]) -> ConsensusResult<GhostdagData> {
        let selected_parent = self.find_selected_parent(area, parents.iter().copied())?;
        let mut new_block_data = GhostdagData::new_with_selected_parent(selected_parent, self.k);

        let candidates =
            self.ordered_mergeset_without_selected_parent(area, selected_parent, parents)?;
        for blue_candidate in candidates {
            match self.check_blue_candidate(area, &new_block_data, blue_candidate)? {
                ColoringOutput::Blue(anticone_size, blues_anticone_sizes) => {
                    new_block_data.add_blue(blue_candidate, anticone_size, &blues_anticone_sizes)
                }
                ColoringOutput::Red => new_block_data.add_red(blue_candidate),
            }
        }

        let selected_parent_data = self.ghostdag_store.get_compact_data(area, selected_parent)?;
        let blue_score =
            selected_parent_data.blue_score + new_block_data.mergeset_blues.len() as u64;
        let mut added_work = BlueWorkType::ZERO;
        for &blue in new_block_data.mergeset_blues.iter() {
            let bits = self.headers.get_header(area, blue)?.bits;
            added_work = added_work.saturating_add(calc_work(bits));
        }
        let blue_work = selected_parent_data.blue_work.saturating_add(added_work);
        new_block_data.finalize_score_and_work(blue_score, blue_work);
        Ok(new_block_data)
    }

    fn ordered_mergeset_without_selected_parent(
        &self,
        area: &StagingArea,
        selected_parent: Hash,
        parents: &[Hash],
    ) -> ConsensusResult<Vec<Hash>> {
        let mut queue: VecDeque<Hash> =
            parents.iter().copied().filter(|&p| p != selected_parent).collect();
        let mut mergeset: HashSet<Hash> = queue.iter().copied().collect();
        let mut selected_parent_past = HashSet::new();

        while let Some(current) = queue.pop_front() {
            let current_parents = self.relations.get_parents(area, current)?;
            for &parent in current_parents.iter() {
                if parent.is_sentinel()
                    || mergeset.contains(&parent)
                    || selected_parent_past.contains(&parent)
                {
                    continue;
                }
                if self.topology.is_dag_ancestor_of(area, parent, selected_parent)? {
                    selected_parent_past.insert(parent);
                    continue;
                }
                mergeset.insert(parent);
                queue.push_back(parent);
            }
        }
        self.sort_blocks(area, mergeset)
    }

    fn check_blue_candidate(
        &self,
        area: &StagingArea,
        new_block_data: &GhostdagData,
        blue_candidate: Hash,
    ) -> ConsensusResult<ColoringOutput> {
        // The mergeset can hold at most k + 1 blues, the selected parent included
        if new_block_data.mergeset_blues.len() == self.k as usize + 1 {
            return Ok(ColoringOutput::Red);
        }

        let mut candidate_blues_anticone_sizes = HashMap::with_capacity(self.k as usize);
        let mut candidate_blue_anticone_size: KType = 0;
        let mut chain_block_hash: Option<Hash> = None;
        let mut chain_block_data: Arc<GhostdagData> = Arc::new(new_block_data.clone());

        loop {
            let state = self.check_blue_candidate_with_chain_block(
                area,
                new_block_data,
                chain_block_hash,
                &chain_block_data,
                blue_candidate,
                &mut candidate_blues_anticone_sizes,
                &mut candidate_blue_anticone_size,
            )?;
            match state {
                ColoringState::Blue => {
                    return Ok(ColoringOutput::Blue(
                        candidate_blue_anticone_size,
                        candidate_blues_anticone_sizes,
                    ))
                }
                ColoringState::Red => return Ok(ColoringOutput::Red),
                ColoringState::Pending => {
                    let next = chain_block_data.selected_parent;
                    // Nothing below the chain start is known, so nothing more is in the anticone
                    if next.is_virtual_genesis() {
                        return Ok(ColoringOutput::Blue(
                            candidate_blue_anticone_size,
                            candidate_blues_anticone_sizes,
                        ));
                    }
                    chain_block_data = self.ghostdag_store.get_data(area, next)?;
                    chain_block_hash = Some(next);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_blue_candidate_with_chain_block(
        &self,
        area: &StagingArea,
        new_block_data: &GhostdagData,
        chain_block_hash: Option<Hash>,
        chain_block_data: &GhostdagData,
        blue_candidate: Hash,
        candidate_blues_anticone_sizes: &mut HashMap<Hash, KType>,
        candidate_blue_anticone_size: &mut KType,
    ) -> ConsensusResult<ColoringState> {
        // A candidate in the future of the chain block has every remaining blue in its past
        if let Some(hash) = chain_block_hash {
            if self.topology.is_dag_ancestor_of(area, hash, blue_candidate)? {
                return Ok(ColoringState::Blue);
            }
        }

        for &block in chain_block_data.mergeset_blues.iter() {
            if self.topology.is_dag_ancestor_of(area, block, blue_candidate)? {
                continue;
            }
            let block_anticone_size = self.blue_anticone_size(area, block, new_block_data)?;
            candidate_blues_anticone_sizes.insert(block, block_anticone_size);

            *candidate_blue_anticone_size += 1;
            if *candidate_blue_anticone_size > self.k {
                return Ok(ColoringState::Red);
            }
            if block_anticone_size == self.k {
                return Ok(ColoringState::Red);
            }
            if block_anticone_size > self.k {
                return Err(ConsensusError::DataIntegrity(format!(
                    "blue block {block} has a blue anticone of {block_anticone_size}, above k = {}",
                    self.k
                )));
            }
        }
        Ok(ColoringState::Pending)
    }

    /// Blue anticone size of `block` as seen from `context`, found by walking the context's chain
    fn blue_anticone_size(
        &self,
        area: &StagingArea,
        block: Hash,
        context: &GhostdagData,
    ) -> ConsensusResult<KType> {
        if let Some(size) = context.blues_anticone_sizes.get(&block) {
            return Ok(*size);
        }
        let mut current = context.selected_parent;
        loop {
            if current.is_sentinel() {
                return Err(ConsensusError::DataIntegrity(format!(
                    "block {block} is not in the blue set of the given context"
                )));
            }
            let data = self.ghostdag_store.get_data(area, current)?;
            if let Some(size) = data.blues_anticone_sizes.get(&block) {
                return Ok(*size);
            }
            current = data.selected_parent;
        }
    }
}
