use crate::{hashing, BlueWorkType, Hash};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Block header. `hash` caches the header hash and is refreshed by [`Header::finalize`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub hash: Hash,
    pub version: u16,
    /// Direct parents in the order the miner listed them
    pub parents: Vec<Hash>,
    pub hash_merkle_root: Hash,
    /// Milliseconds since the unix epoch
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_work: BlueWorkType,
    pub blue_score: u64,
}

impl Header {
    #[allow(clippy::too_many_arguments)]
    pub fn new_finalized(
        version: u16,
        parents: Vec<Hash>,
        hash_merkle_root: Hash,
        timestamp: u64,
        bits: u32,
        nonce: u64,
        daa_score: u64,
        blue_work: BlueWorkType,
        blue_score: u64,
    ) -> Self {
        let mut header = Self {
            hash: Default::default(),
            version,
            parents,
            hash_merkle_root,
            timestamp,
            bits,
            nonce,
            daa_score,
            blue_work,
            blue_score,
        };
        header.finalize();
        header
    }

    /// Recomputes and caches the header hash
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }

    pub fn direct_parents(&self) -> &[Hash] {
        &self.parents
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }
}
