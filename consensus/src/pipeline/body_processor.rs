//! Body processor for consensus
//!
//! Validates a block body in isolation and against its header, then stages it.
//! UTXO validity is decided later, once the block is on the selected chain.

use crate::consensus::storage::block_store::{BlockStore, DbBlockTransactionsStore};
use crate::consensus::storage::statuses::{DbStatusesStore, StatusesStore};
use crate::consensus::validation::BlockValidator;
use crate::errors::ConsensusResult;
use consensus_core::block::Block;
use consensus_core::blockstatus::BlockStatus;
use database::StagingArea;
use std::sync::Arc;

pub struct BodyProcessor {
    block_validator: BlockValidator,
    block_transactions: Arc<DbBlockTransactionsStore>,
    statuses: Arc<DbStatusesStore>,
}

impl BodyProcessor {
    pub fn new(
        block_validator: BlockValidator,
        block_transactions: Arc<DbBlockTransactionsStore>,
        statuses: Arc<DbStatusesStore>,
    ) -> Self {
        Self { block_validator, block_transactions, statuses }
    }

    pub fn validate_body(&self, block: &Block) -> ConsensusResult<()> {
        self.block_validator.validate_body_in_isolation(block)?;
        self.block_validator.validate_body_in_context(block)?;
        Ok(())
    }

    /// Validates the body and stages it with a pending UTXO status
    pub fn process_body(&self, area: &mut StagingArea, block: &Block) -> ConsensusResult<()> {
        self.validate_body(block)?;
        let hash = block.hash();
        let transactions = Arc::new(block.transactions.clone());
        self.block_transactions.insert_transactions(area, hash, transactions)?;
        self.statuses.set_status(area, hash, BlockStatus::UtxoPendingVerification)?;
        Ok(())
    }
}
