use crate::tx::{TransactionOutpoint, UtxoEntry};
use std::collections::HashMap;

pub type UtxoCollection = HashMap<TransactionOutpoint, UtxoEntry>;

pub trait UtxoCollectionExtensions {
    /// True if `outpoint` is present with exactly `entry`
    fn contains_entry(&self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> bool;

    fn total_amount(&self) -> u128;
}

impl UtxoCollectionExtensions for UtxoCollection {
    fn contains_entry(&self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> bool {
        self.get(outpoint).is_some_and(|e| e == entry)
    }

    fn total_amount(&self) -> u128 {
        self.values().map(|e| e.amount as u128).sum()
    }
}
