//! Block processor for consensus
//!
//! This module provides the main block processing logic that orchestrates
//! header processing, body processing, virtual resolution and pruning. Each
//! block is processed in its own staging area, committed in one write.

use super::body_processor::BodyProcessor;
use super::header_processor::HeaderProcessor;
use super::virtual_processor::VirtualStateProcessor;
use crate::consensus::dag::relations::{RelationsStore, RelationsStoreReader};
use crate::consensus::ghostdag::stores::GhostdagStore;
use crate::consensus::storage::block_store::{BlockHeaderStore, BlockStore};
use crate::consensus::storage::consensus_state::{ConsensusStateStore, ConsensusStateStoreReader};
use crate::consensus::storage::daa::{BlockDaaData, DaaStore};
use crate::consensus::storage::statuses::{StatusesStore, StatusesStoreReader};
use crate::consensus::storage::ConsensusStorage;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::process::pruning::PruningManager;
use consensus_core::block::Block;
use consensus_core::blockhash::VIRTUAL_GENESIS;
use consensus_core::blockstatus::BlockStatus;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::GhostdagDataVariant;
use consensus_core::trusted::TrustedBlock;
use consensus_core::Hash;
use database::StagingArea;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Block processor for consensus
pub struct BlockProcessor {
    storage: Arc<ConsensusStorage>,
    header_processor: HeaderProcessor,
    body_processor: BodyProcessor,
    virtual_processor: Arc<VirtualStateProcessor>,
    pruning_manager: Arc<PruningManager>,
}

impl BlockProcessor {
    /// Create a new block processor
    pub fn new(
        storage: Arc<ConsensusStorage>,
        header_processor: HeaderProcessor,
        body_processor: BodyProcessor,
        virtual_processor: Arc<VirtualStateProcessor>,
        pruning_manager: Arc<PruningManager>,
    ) -> Self {
        Self { storage, header_processor, body_processor, virtual_processor, pruning_manager }
    }

    /// Validates `block`, inserts it and resolves the virtual, all in one commit.
    ///
    /// A block breaking a rule of its own is remembered as invalid. Blocks with
    /// missing parents are not remembered at all. A block whose coinbase fails
    /// chain verification is stored and disqualified from the chain, whichever
    /// block's arrival moved the chain onto it.
    pub fn validate_and_insert_block(&self, block: &Block) -> ConsensusResult<BlockStatus> {
        let hash = block.hash();
        let mut area = StagingArea::new();
        match self.stage_block(&mut area, block) {
            Ok(status) => {
                self.storage.commit(area)?;
                let header = &block.header;
                info!(
                    block = %hash,
                    blue_score = header.blue_score,
                    daa_score = header.daa_score,
                    ?status,
                    "accepted block"
                );
                Ok(status)
            }
            Err(err) => {
                drop(area);
                if let Some(status) = status_after_rejection(&err) {
                    let mut area = StagingArea::new();
                    self.storage.statuses.set_status(&mut area, hash, status)?;
                    self.storage.commit(area)?;
                }
                warn!(block = %hash, %err, "rejected block");
                Err(err)
            }
        }
    }

    /// Runs every step of block insertion against `area` without committing it
    pub(crate) fn stage_block(
        &self,
        area: &mut StagingArea,
        block: &Block,
    ) -> ConsensusResult<BlockStatus> {
        let hash = block.hash();
        if let Some(status) = self.known_status(area, hash)? {
            return Ok(status);
        }
        if self.storage.consensus_state.is_importing_pruning_point_utxo_set(area)? {
            return Err(RuleError::UtxoImportInProgress.into());
        }

        let header = Arc::new(block.header.clone());
        self.header_processor.process_header(area, &header)?;
        self.body_processor.process_body(area, block)?;
        self.update_tips(area, hash, header.direct_parents())?;
        self.virtual_processor.resolve_virtual(area)?;
        self.pruning_manager.advance_pruning_point(area)?;
        Ok(self.storage.statuses.get_status(area, hash)?)
    }

    fn known_status(&self, area: &StagingArea, hash: Hash) -> ConsensusResult<Option<BlockStatus>> {
        match self.storage.statuses.get_status_opt(area, hash)? {
            Some(BlockStatus::Invalid) => Err(RuleError::KnownInvalid(hash).into()),
            status => Ok(status),
        }
    }

    fn update_tips(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        parents: &[Hash],
    ) -> ConsensusResult<()> {
        let tips = self.storage.consensus_state.get_tips(area)?;
        let mut new_tips: Vec<Hash> =
            tips.iter().copied().filter(|tip| !parents.contains(tip)).collect();
        new_tips.push(hash);
        self.storage.consensus_state.set_tips(area, Arc::new(new_tips))?;
        Ok(())
    }

    /// Stores a block received with a pruning-point proof. Its GHOSTDAG data is
    /// taken as given, its UTXO state stays unverified until a chain block merges it.
    pub fn import_trusted_block(&self, trusted: &TrustedBlock) -> ConsensusResult<BlockStatus> {
        let block = &trusted.block;
        let hash = block.hash();
        let mut area = StagingArea::new();
        if let Some(status) = self.known_status(&area, hash)? {
            return Ok(status);
        }
        self.body_processor.validate_body(block)?;

        let storage = &self.storage;
        let mut parents = Vec::with_capacity(block.header.parents.len());
        for &parent in block.header.direct_parents() {
            if storage.relations.has(&area, parent)? {
                parents.push(parent);
            }
        }
        if parents.is_empty() {
            parents.push(VIRTUAL_GENESIS);
        }

        storage.headers.insert_header(&mut area, Arc::new(block.header.clone()))?;
        let transactions = Arc::new(block.transactions.clone());
        storage.block_transactions.insert_transactions(&mut area, hash, transactions)?;
        storage.relations.insert(&mut area, hash, Arc::new(parents))?;
        let ghostdag = Arc::new(trusted.ghostdag.clone());
        storage.ghostdag.insert(&mut area, hash, ghostdag, GhostdagDataVariant::Trusted)?;
        let daa_data =
            BlockDaaData { daa_score: block.header.daa_score, added_blocks: Default::default() };
        storage.daa.insert(&mut area, hash, daa_data)?;
        storage.statuses.set_status(&mut area, hash, BlockStatus::UtxoPendingVerification)?;
        storage.commit(area)?;
        debug!(block = %hash, blue_score = trusted.ghostdag.blue_score, "imported trusted block");
        Ok(BlockStatus::UtxoPendingVerification)
    }
}

/// The status to record after a rejection. A rule broken by the block itself makes it
/// invalid. Missing context, a timestamp that local time has yet to reach and the
/// state of this node record nothing.
fn status_after_rejection(err: &ConsensusError) -> Option<BlockStatus> {
    match err {
        ConsensusError::Rule(
            RuleError::MissingParents(_)
            | RuleError::KnownInvalid(_)
            | RuleError::TimeTooFarIntoTheFuture(..)
            | RuleError::UtxoImportInProgress
            | RuleError::ReorgBelowPruningPoint(..),
        ) => None,
        ConsensusError::Rule(_) => Some(BlockStatus::Invalid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_after_rejection() {
        let own = Hash::from_u64_word(1);
        let other = Hash::from_u64_word(2);
        let status = |err: RuleError| status_after_rejection(&err.into());
        let invalid = Some(BlockStatus::Invalid);
        assert_eq!(status(RuleError::NoParents), invalid);
        assert_eq!(status(RuleError::DuplicateParent(other)), invalid);
        assert_eq!(status(RuleError::MissingParents(vec![other])), None);
        assert_eq!(status(RuleError::KnownInvalid(own)), None);
        assert_eq!(status(RuleError::TimeTooFarIntoTheFuture(10, 5)), None);
        assert_eq!(status(RuleError::UtxoImportInProgress), None);
        assert_eq!(status(RuleError::InvalidDifficultyBits(0)), invalid);
        assert_eq!(status(RuleError::InvalidProofOfWork(own)), invalid);
        assert_eq!(status_after_rejection(&ConsensusError::DataIntegrity("x".into())), None);
    }
}
