use super::{UtxoCollection, UtxoDiff};
use crate::tx::{TransactionOutpoint, UtxoEntry};
use std::convert::Infallible;

/// Read access to some UTXO state
pub trait UtxoView {
    type Error;

    fn get(&self, outpoint: &TransactionOutpoint) -> Result<Option<UtxoEntry>, Self::Error>;
}

impl UtxoView for UtxoCollection {
    type Error = Infallible;

    fn get(&self, outpoint: &TransactionOutpoint) -> Result<Option<UtxoEntry>, Self::Error> {
        Ok(std::collections::HashMap::get(self, outpoint).cloned())
    }
}

/// A base view with a diff layered on top
pub struct ComposedUtxoView<'a, V> {
    base: &'a V,
    diff: &'a UtxoDiff,
}

impl<'a, V> ComposedUtxoView<'a, V> {
    pub fn new(base: &'a V, diff: &'a UtxoDiff) -> Self {
        Self { base, diff }
    }
}

impl<V: UtxoView> UtxoView for ComposedUtxoView<'_, V> {
    type Error = V::Error;

    fn get(&self, outpoint: &TransactionOutpoint) -> Result<Option<UtxoEntry>, Self::Error> {
        if let Some(entry) = self.diff.add.get(outpoint) {
            return Ok(Some(entry.clone()));
        }
        if self.diff.remove.contains_key(outpoint) {
            return Ok(None);
        }
        self.base.get(outpoint)
    }
}
