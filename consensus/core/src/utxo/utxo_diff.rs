use serde::{Deserialize, Serialize};

use super::utxo_collection::{UtxoCollection, UtxoCollectionExtensions};
use super::utxo_error::{UtxoAlgebraError, UtxoResult};
use crate::tx::{PopulatedTransaction, TransactionOutpoint, UtxoEntry};

/// The change a chain block applies to the UTXO state of its selected parent.
///
/// An outpoint may sit in both collections when an entry is replaced by another
/// entry with the same outpoint. Applying a diff removes first, then adds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UtxoDiff {
    pub add: UtxoCollection,
    pub remove: UtxoCollection,
}

impl UtxoDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// The diff that undoes this one
    pub fn reversed(&self) -> Self {
        Self { add: self.remove.clone(), remove: self.add.clone() }
    }

    pub fn add_entry(&mut self, outpoint: TransactionOutpoint, entry: UtxoEntry) -> UtxoResult<()> {
        if self.remove.contains_entry(&outpoint, &entry) {
            self.remove.remove(&outpoint);
        } else if self.add.insert(outpoint, entry).is_some() {
            return Err(UtxoAlgebraError::DuplicateAddPoint(outpoint));
        }
        Ok(())
    }

    pub fn remove_entry(
        &mut self,
        outpoint: TransactionOutpoint,
        entry: UtxoEntry,
    ) -> UtxoResult<()> {
        if self.add.contains_entry(&outpoint, &entry) {
            self.add.remove(&outpoint);
        } else if self.remove.insert(outpoint, entry).is_some() {
            return Err(UtxoAlgebraError::DuplicateRemovePoint(outpoint));
        }
        Ok(())
    }

    /// Records the spend of every populated input and the creation of every output
    pub fn add_transaction(
        &mut self,
        tx: &PopulatedTransaction,
        block_daa_score: u64,
    ) -> UtxoResult<()> {
        for (input, entry) in tx.populated_inputs() {
            self.remove_entry(input.previous_outpoint, entry.clone())?;
        }
        let is_coinbase = tx.tx.is_coinbase();
        for (outpoint, output) in tx.outputs() {
            let script = output.script_public_key.clone();
            let entry = UtxoEntry::new(output.value, script, block_daa_score, is_coinbase);
            self.add_entry(outpoint, entry)?;
        }
        Ok(())
    }

    /// Composes `other` on top of `self`
    pub fn with_diff(&self, other: &UtxoDiff) -> UtxoResult<UtxoDiff> {
        let mut result = self.clone();
        for (outpoint, entry) in other.remove.iter() {
            result.remove_entry(*outpoint, entry.clone())?;
        }
        for (outpoint, entry) in other.add.iter() {
            result.add_entry(*outpoint, entry.clone())?;
        }
        Ok(result)
    }

    /// Applies the diff to an in-memory collection
    pub fn apply_to(&self, collection: &mut UtxoCollection) {
        for outpoint in self.remove.keys() {
            collection.remove(outpoint);
        }
        collection.extend(self.add.iter().map(|(k, v)| (*k, v.clone())));
    }
}
