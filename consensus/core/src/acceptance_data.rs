use serde::{Deserialize, Serialize};

use crate::tx::{TransactionId, TransactionIndexType};
use crate::Hash;

/// Acceptance outcome of every transaction a chain block merged, one entry per
/// mergeset block in consensus order (selected parent first).
pub type AcceptanceData = Vec<MergesetBlockAcceptanceData>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergesetBlockAcceptanceData {
    pub block_hash: Hash,
    pub accepted_transactions: Vec<AcceptedTxEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedTxEntry {
    pub transaction_id: TransactionId,
    pub index_within_block: TransactionIndexType,
    pub is_accepted: bool,
    /// Fee paid to the merging block. Zero when not accepted and for coinbases.
    pub fee: u64,
}

impl MergesetBlockAcceptanceData {
    /// Sum of the fees of the accepted transactions
    pub fn total_fees(&self) -> u64 {
        self.accepted_transactions
            .iter()
            .filter(|entry| entry.is_accepted)
            .fold(0u64, |total, entry| total.saturating_add(entry.fee))
    }
}
