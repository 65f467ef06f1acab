use borsh::{BorshDeserialize, BorshSerialize};

use crate::ghostdag::CompactGhostdagData;
use crate::header::Header;
use crate::tx::{TransactionOutpoint, UtxoEntry};
use crate::Hash;

/// One block of the selected chain covered by a pruning-point proof
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PruningProofLink {
    pub header: Header,
    pub ghostdag: CompactGhostdagData,
}

/// Headers and GHOSTDAG data of the selected chain from the pruning point
/// (first) down to the first block at least pruning depth below it, or to
/// genesis on a young chain (last). Lets a syncing node check continuity
/// without the bodies below the pruning point.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PruningPointProof {
    pub pruning_point: Hash,
    pub chain: Vec<PruningProofLink>,
}

impl PruningPointProof {
    /// Canonical encoding handed to the network layer
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        Self::try_from_slice(bytes)
    }
}

pub type PruningPointUtxoChunk = Vec<(TransactionOutpoint, UtxoEntry)>;
