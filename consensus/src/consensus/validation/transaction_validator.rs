//! Transaction validation for consensus
//!
//! This module validates transactions in two stages:
//! - In isolation: structure, amounts, duplicate inputs
//! - In context: the UTXO entries spent, coinbase maturity and the fee

use crate::errors::{ConsensusError, ConsensusResult};
use consensus_core::constants::MAX_SOMPI;
use consensus_core::errors::{TxResult, TxRuleError};
use consensus_core::tx::{PopulatedTransaction, Transaction};
use consensus_core::utxo::UtxoView;
use std::collections::HashSet;

/// Transaction validator for consensus rules
pub struct TransactionValidator {
    coinbase_maturity: u64,
}

impl TransactionValidator {
    pub fn new(coinbase_maturity: u64) -> Self {
        Self { coinbase_maturity }
    }

    /// Context-free checks. Coinbase transactions only get the output checks, the
    /// rest of their rules live in block validation.
    pub fn validate_tx_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        if !tx.subnetwork_id.is_builtin_or_native() {
            return Err(TxRuleError::UnknownSubnetwork);
        }
        self.check_outputs_value(tx)?;
        if tx.is_coinbase() {
            return Ok(());
        }

        if tx.inputs.is_empty() {
            return Err(TxRuleError::NoInputs);
        }
        if tx.outputs.is_empty() {
            return Err(TxRuleError::NoOutputs);
        }
        if let Some(index) = tx.outputs.iter().position(|output| output.value == 0) {
            return Err(TxRuleError::ZeroValueOutput(index));
        }

        let mut spent = HashSet::with_capacity(tx.inputs.len());
        for input in tx.inputs.iter() {
            if !spent.insert(input.previous_outpoint) {
                return Err(TxRuleError::DuplicateInput(input.previous_outpoint));
            }
        }
        Ok(())
    }

    fn check_outputs_value(&self, tx: &Transaction) -> TxResult<()> {
        match tx.total_output_value() {
            Some(total) if total <= MAX_SOMPI => Ok(()),
            _ => Err(TxRuleError::OutputValueOverflow),
        }
    }

    /// Looks up the entry spent by every input of `tx` in `view`
    pub fn populate_transaction<'a, V>(
        &self,
        tx: &'a Transaction,
        view: &V,
    ) -> ConsensusResult<PopulatedTransaction<'a>>
    where
        V: UtxoView,
        ConsensusError: From<V::Error>,
    {
        let mut entries = Vec::with_capacity(tx.inputs.len());
        for input in tx.inputs.iter() {
            match view.get(&input.previous_outpoint)? {
                Some(entry) => entries.push(entry),
                None => return Err(TxRuleError::MissingTxOutpoint(input.previous_outpoint).into()),
            }
        }
        Ok(PopulatedTransaction::new(tx, entries))
    }

    /// Checks a populated transaction as accepted at `pov_daa_score` and returns its fee
    pub fn validate_populated_transaction_and_get_fee(
        &self,
        tx: &PopulatedTransaction,
        pov_daa_score: u64,
    ) -> TxResult<u64> {
        let mut total_in: u64 = 0;
        for (input, entry) in tx.populated_inputs() {
            if entry.is_coinbase {
                let mature_at = entry.block_daa_score.saturating_add(self.coinbase_maturity);
                if pov_daa_score < mature_at {
                    let outpoint = input.previous_outpoint;
                    return Err(TxRuleError::ImmatureCoinbaseSpend(outpoint, mature_at));
                }
            }
            total_in = total_in.checked_add(entry.amount).ok_or(TxRuleError::InputValueOverflow)?;
        }
        if total_in > MAX_SOMPI {
            return Err(TxRuleError::InputValueOverflow);
        }

        let total_out = tx.tx.total_output_value().ok_or(TxRuleError::OutputValueOverflow)?;
        if total_in < total_out {
            return Err(TxRuleError::SpendTooHigh(total_in, total_out));
        }
        Ok(total_in - total_out)
    }

    /// Full validation of a standalone transaction against `view`. Returns the populated
    /// transaction and its fee. Used for mempool checks and block templates.
    pub fn validate_transaction_in_context<'a, V>(
        &self,
        tx: &'a Transaction,
        view: &V,
        pov_daa_score: u64,
    ) -> ConsensusResult<(PopulatedTransaction<'a>, u64)>
    where
        V: UtxoView,
        ConsensusError: From<V::Error>,
    {
        if tx.is_coinbase() {
            return Err(TxRuleError::UnexpectedCoinbase.into());
        }
        self.validate_tx_in_isolation(tx)?;
        let populated = self.populate_transaction(tx, view)?;
        let fee = self.validate_populated_transaction_and_get_fee(&populated, pov_daa_score)?;
        Ok((populated, fee))
    }
}
