use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{blockhash::VIRTUAL_GENESIS, BlueWorkType, Hash, KType};

/// Which copy of a block's GHOSTDAG data is meant.
///
/// `Trusted` data arrives with a pruning-point proof and keeps the untrimmed
/// mergeset. `Local` data is computed by this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GhostdagDataVariant {
    Trusted,
    Local,
}

/// GHOSTDAG data of a single block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
    /// Blue blocks of the mergeset. The selected parent comes first,
    /// the rest ascend in consensus order.
    pub mergeset_blues: Vec<Hash>,
    /// Red blocks of the mergeset in ascending consensus order
    pub mergeset_reds: Vec<Hash>,
    /// Anticone size of every blue in this block's blue anticone, as seen from this block
    pub blues_anticone_sizes: HashMap<Hash, KType>,
}

/// The three fields needed to order blocks and walk chains
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(borsh::BorshSerialize, borsh::BorshDeserialize)]
pub struct CompactGhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
}

impl GhostdagData {
    pub fn new(
        blue_score: u64,
        blue_work: BlueWorkType,
        selected_parent: Hash,
        mergeset_blues: Vec<Hash>,
        mergeset_reds: Vec<Hash>,
        blues_anticone_sizes: HashMap<Hash, KType>,
    ) -> Self {
        Self {
            blue_score,
            blue_work,
            selected_parent,
            mergeset_blues,
            mergeset_reds,
            blues_anticone_sizes,
        }
    }

    /// Starts the data of a new block whose selected parent is already colored blue
    pub fn new_with_selected_parent(selected_parent: Hash, k: KType) -> Self {
        let mut mergeset_blues = Vec::with_capacity(k as usize + 1);
        let mut blues_anticone_sizes = HashMap::with_capacity(k as usize);
        mergeset_blues.push(selected_parent);
        blues_anticone_sizes.insert(selected_parent, 0);
        Self { selected_parent, mergeset_blues, blues_anticone_sizes, ..Default::default() }
    }

    /// GHOSTDAG data of the genesis block
    pub fn genesis() -> Self {
        Self { selected_parent: VIRTUAL_GENESIS, ..Default::default() }
    }

    pub fn add_blue(
        &mut self,
        block: Hash,
        blue_anticone_size: KType,
        blues_anticone_sizes: &HashMap<Hash, KType>,
    ) {
        self.mergeset_blues.push(block);
        self.blues_anticone_sizes.insert(block, blue_anticone_size);
        for (blue, size) in blues_anticone_sizes {
            self.blues_anticone_sizes.insert(*blue, size + 1);
        }
    }

    pub fn add_red(&mut self, block: Hash) {
        self.mergeset_reds.push(block);
    }

    pub fn finalize_score_and_work(&mut self, blue_score: u64, blue_work: BlueWorkType) {
        self.blue_score = blue_score;
        self.blue_work = blue_work;
    }

    pub fn mergeset_size(&self) -> usize {
        self.mergeset_blues.len() + self.mergeset_reds.len()
    }

    /// Mergeset without the selected parent, blues then reds (not consensus ordered)
    pub fn unordered_mergeset_without_selected_parent(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().skip(1).chain(self.mergeset_reds.iter()).copied()
    }

    pub fn unordered_mergeset(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().chain(self.mergeset_reds.iter()).copied()
    }

    pub fn to_compact(&self) -> CompactGhostdagData {
        CompactGhostdagData {
            blue_score: self.blue_score,
            blue_work: self.blue_work,
            selected_parent: self.selected_parent,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.selected_parent == VIRTUAL_GENESIS && self.mergeset_blues.is_empty()
    }
}

/// Orders blocks by blue work, then by hash. This is the consensus order of a mergeset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortableBlock {
    pub hash: Hash,
    pub blue_work: BlueWorkType,
}

impl SortableBlock {
    pub fn new(hash: Hash, blue_work: BlueWorkType) -> Self {
        Self { hash, blue_work }
    }
}

impl PartialOrd for SortableBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.blue_work.cmp(&other.blue_work).then_with(|| self.hash.cmp(&other.hash))
    }
}
