//! Pruning point proofs
//!
//! A proof is the selected chain below the pruning point, one header and its
//! compact GHOSTDAG data per link. It ends at the first chain block at least
//! `pruning_depth` blue score below the pruning point, or at genesis on a
//! young chain, so it never outgrows the kept history.

use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStoreReader};
use crate::consensus::storage::block_store::{BlockHeaderStoreReader, DbHeadersStore};
use crate::consensus::storage::pruning::{DbPruningStore, PruningStoreReader};
use crate::errors::ConsensusResult;
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::errors::RuleError;
use consensus_core::hashing;
use consensus_core::header::Header;
use consensus_core::pruning::{PruningPointProof, PruningProofLink};
use consensus_core::Hash;
use database::StagingArea;
use std::sync::Arc;
use tracing::debug;

pub struct PruningProofManager {
    genesis_hash: Hash,
    pruning_depth: u64,
    headers: Arc<DbHeadersStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    pruning_store: Arc<DbPruningStore>,
}

impl PruningProofManager {
    pub fn new(
        genesis_hash: Hash,
        pruning_depth: u64,
        headers: Arc<DbHeadersStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        pruning_store: Arc<DbPruningStore>,
    ) -> Self {
        Self { genesis_hash, pruning_depth, headers, ghostdag_store, pruning_store }
    }

    /// Proof of the current pruning point
    pub fn get_pruning_point_proof(
        &self,
        area: &StagingArea,
    ) -> ConsensusResult<PruningPointProof> {
        let pruning_point = self.pruning_store.get_pruning_point(area)?;
        self.build_pruning_point_proof(area, pruning_point)
    }

    pub fn build_pruning_point_proof(
        &self,
        area: &StagingArea,
        pruning_point: Hash,
    ) -> ConsensusResult<PruningPointProof> {
        let pruning_point_score = self.ghostdag_store.get_blue_score(area, pruning_point)?;
        let mut chain = Vec::new();
        let mut current = pruning_point;
        while !current.is_sentinel() {
            let header = self.headers.get_header(area, current)?;
            let ghostdag = self.ghostdag_store.get_compact_data(area, current)?;
            current = ghostdag.selected_parent;
            let deep_enough = ghostdag.blue_score + self.pruning_depth <= pruning_point_score;
            chain.push(PruningProofLink { header: Header::clone(&header), ghostdag });
            if deep_enough {
                break;
            }
        }
        debug!(pruning_point = %pruning_point, links = chain.len(), "built pruning point proof");
        Ok(PruningPointProof { pruning_point, chain })
    }

    pub fn validate_pruning_point_proof(&self, proof: &PruningPointProof) -> ConsensusResult<()> {
        validate_proof(proof, self.genesis_hash, self.pruning_depth)
            .map_err(|reason| RuleError::InvalidPruningPointProof(reason).into())
    }
}

fn validate_proof(
    proof: &PruningPointProof,
    genesis_hash: Hash,
    pruning_depth: u64,
) -> Result<(), String> {
    let first = proof.chain.first().ok_or("empty chain")?;
    if first.header.hash != proof.pruning_point {
        return Err(format!(
            "chain starts at {}, not at the pruning point {}",
            first.header.hash, proof.pruning_point
        ));
    }
    let top_score = first.ghostdag.blue_score;
    let is_deep = |link: &PruningProofLink| link.ghostdag.blue_score + pruning_depth <= top_score;
    let (last, body) = proof.chain.split_last().ok_or("empty chain")?;
    if let Some(link) = body.iter().find(|link| is_deep(*link)) {
        return Err(format!(
            "chain continues past {}, already pruning depth below the pruning point",
            link.header.hash
        ));
    }

    for link in proof.chain.iter() {
        let header = &link.header;
        let recomputed = hashing::header::hash(header);
        if recomputed != header.hash {
            return Err(format!("header {} hashes to {recomputed}", header.hash));
        }
        if header.blue_score != link.ghostdag.blue_score
            || header.blue_work != link.ghostdag.blue_work
        {
            return Err(format!("header {} disagrees with its ghostdag data", header.hash));
        }
    }

    for pair in proof.chain.windows(2) {
        let (child, parent) = (&pair[0], &pair[1]);
        if child.ghostdag.selected_parent != parent.header.hash {
            return Err(format!(
                "selected parent of {} is {}, not {}",
                child.header.hash, child.ghostdag.selected_parent, parent.header.hash
            ));
        }
        if !child.header.direct_parents().contains(&parent.header.hash) {
            return Err(format!("{} is not a parent of {}", parent.header.hash, child.header.hash));
        }
        if parent.ghostdag.blue_score >= child.ghostdag.blue_score {
            return Err(format!(
                "blue score does not decrease from {} to {}",
                child.header.hash, parent.header.hash
            ));
        }
    }

    let is_genesis =
        last.header.hash == genesis_hash && last.ghostdag.selected_parent.is_virtual_genesis();
    if !is_genesis && !is_deep(last) {
        return Err(format!(
            "chain ends at {}, neither genesis nor pruning depth below the pruning point",
            last.header.hash
        ));
    }
    Ok(())
}
