//! Block body validation for consensus
//!
//! This module validates block bodies:
//! - Coinbase placement and shape
//! - Every other transaction in isolation
//! - Duplicate transactions and the merkle root
//! - Total mass against the network limit
//! - The coinbase payload against the block's blue score

use super::transaction_validator::TransactionValidator;
use consensus_core::block::Block;
use consensus_core::coinbase::{deserialize_coinbase_payload, CoinbasePayload};
use consensus_core::constants::COINBASE_TRANSACTION_INDEX;
use consensus_core::errors::{BlockProcessResult, RuleError};
use consensus_core::mass::MassCalculator;
use lumen_hashes::calc_merkle_root;
use std::collections::HashSet;
use std::sync::Arc;

/// Block validator for consensus rules
pub struct BlockValidator {
    transaction_validator: Arc<TransactionValidator>,
    max_coinbase_payload_len: usize,
    coinbase_payload_script_public_key_max_length: u8,
    mass_calculator: MassCalculator,
    max_block_mass: u64,
}

impl BlockValidator {
    pub fn new(
        transaction_validator: Arc<TransactionValidator>,
        max_coinbase_payload_len: usize,
        coinbase_payload_script_public_key_max_length: u8,
        mass_calculator: MassCalculator,
        max_block_mass: u64,
    ) -> Self {
        Self {
            transaction_validator,
            max_coinbase_payload_len,
            coinbase_payload_script_public_key_max_length,
            mass_calculator,
            max_block_mass,
        }
    }

    pub fn validate_body_in_isolation(&self, block: &Block) -> BlockProcessResult<()> {
        self.check_coinbase_in_isolation(block)?;
        let transactions = block.transactions.iter().enumerate();
        for (index, tx) in transactions.skip(COINBASE_TRANSACTION_INDEX + 1) {
            if tx.is_coinbase() {
                return Err(RuleError::MultipleCoinbases(index));
            }
            self.transaction_validator
                .validate_tx_in_isolation(tx)
                .map_err(|err| RuleError::TxInIsolationValidationFailed(tx.id(), err))?;
        }
        self.check_block_mass(block)?;
        self.check_duplicate_transactions(block)?;
        self.check_merkle_root(block)
    }

    fn check_block_mass(&self, block: &Block) -> BlockProcessResult<()> {
        let mass = self.mass_calculator.calc_block_mass(&block.transactions);
        if mass > self.max_block_mass {
            return Err(RuleError::ExceedsMassLimit(mass, self.max_block_mass));
        }
        Ok(())
    }

    fn check_coinbase_in_isolation(&self, block: &Block) -> BlockProcessResult<()> {
        let coinbase = block.coinbase().ok_or(RuleError::NoTransactions)?;
        if !coinbase.is_coinbase() {
            return Err(RuleError::FirstTxNotCoinbase);
        }
        if !coinbase.inputs.is_empty() {
            return Err(RuleError::CoinbaseHasInputs(coinbase.inputs.len()));
        }
        if coinbase.payload.len() > self.max_coinbase_payload_len {
            return Err(RuleError::CoinbasePayloadTooLong(
                coinbase.payload.len(),
                self.max_coinbase_payload_len,
            ));
        }
        self.transaction_validator
            .validate_tx_in_isolation(coinbase)
            .map_err(|err| RuleError::TxInIsolationValidationFailed(coinbase.id(), err))
    }

    fn check_duplicate_transactions(&self, block: &Block) -> BlockProcessResult<()> {
        let mut ids = HashSet::with_capacity(block.transactions.len());
        for tx in block.transactions.iter() {
            if !ids.insert(tx.id()) {
                return Err(RuleError::DuplicateTransaction(tx.id()));
            }
        }
        Ok(())
    }

    fn check_merkle_root(&self, block: &Block) -> BlockProcessResult<()> {
        let expected = calc_merkle_root(block.transactions.iter().map(|tx| tx.id()));
        if expected != block.header.hash_merkle_root {
            return Err(RuleError::BadMerkleRoot(expected, block.header.hash_merkle_root));
        }
        Ok(())
    }

    /// Decodes the coinbase payload and checks it commits to the block's blue score
    pub fn validate_body_in_context(&self, block: &Block) -> BlockProcessResult<CoinbasePayload> {
        let coinbase = block.coinbase().ok_or(RuleError::NoTransactions)?;
        let payload = deserialize_coinbase_payload(
            &coinbase.payload,
            self.coinbase_payload_script_public_key_max_length,
        )?;
        if payload.blue_score != block.header.blue_score {
            return Err(RuleError::BadCoinbasePayloadBlueScore(
                payload.blue_score,
                block.header.blue_score,
            ));
        }
        Ok(payload)
    }
}
