//! Transactions, the outpoints they spend and the UTXO entries behind them

mod script_public_key;

use crate::hashing;
use crate::subnets::{SubnetworkId, SUBNETWORK_ID_COINBASE};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use script_public_key::ScriptPublicKey;

pub type TransactionId = crate::Hash;

/// Position of a transaction or output inside its container
pub type TransactionIndexType = u32;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[derive(Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    #[serde(with = "lumen_utils::serde_bytes")]
    pub payload: Vec<u8>,

    /// Set by `finalize`. Field edits leave it stale until the next call.
    id: TransactionId,
}

impl Transaction {
    pub fn new(
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u64,
        subnetwork_id: SubnetworkId,
        gas: u64,
        payload: Vec<u8>,
    ) -> Self {
        let id = TransactionId::default();
        let mut tx = Self { version, inputs, outputs, lock_time, subnetwork_id, gas, payload, id };
        tx.finalize();
        tx
    }

    pub fn finalize(&mut self) {
        self.id = hashing::tx::id(self);
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Coinbase transactions are recognized by subnetwork alone. They have no inputs and pay
    /// the rewards of the blocks merged by the block carrying them.
    pub fn is_coinbase(&self) -> bool {
        self.subnetwork_id == SUBNETWORK_ID_COINBASE
    }

    /// `None` on u64 overflow
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs.iter().try_fold(0u64, |total, output| total.checked_add(output.value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    #[serde(with = "lumen_utils::serde_bytes")]
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
}

impl TransactionInput {
    pub fn new(
        previous_outpoint: TransactionOutpoint,
        signature_script: Vec<u8>,
        sequence: u64,
        sig_op_count: u8,
    ) -> Self {
        Self { previous_outpoint, signature_script, sequence, sig_op_count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// Output `index` of transaction `transaction_id`. Orders by id first, so a
/// set keyed by outpoints iterates transaction by transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: TransactionIndexType) -> Self {
        Self { transaction_id, index }
    }
}

impl fmt::Display for TransactionOutpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.index)
    }
}

/// An unspent output as the UTXO set stores it. `block_daa_score` is the DAA
/// score of the chain block that accepted the creating transaction and drives
/// coinbase maturity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    pub fn new(
        amount: u64,
        script_public_key: ScriptPublicKey,
        block_daa_score: u64,
        is_coinbase: bool,
    ) -> Self {
        Self { amount, script_public_key, block_daa_score, is_coinbase }
    }
}

/// A transaction with the UTXO entries its inputs spend, in input order
#[derive(Debug)]
pub struct PopulatedTransaction<'a> {
    pub tx: &'a Transaction,
    pub entries: Vec<UtxoEntry>,
}

impl<'a> PopulatedTransaction<'a> {
    /// `entries[i]` must be the entry spent by `tx.inputs[i]`
    pub fn new(tx: &'a Transaction, entries: Vec<UtxoEntry>) -> Self {
        Self { tx, entries }
    }

    pub fn populated_inputs(
        &self,
    ) -> impl ExactSizeIterator<Item = (&TransactionInput, &UtxoEntry)> {
        self.tx.inputs.iter().zip(self.entries.iter())
    }

    /// Outputs with the outpoints that will spend them
    pub fn outputs(
        &self,
    ) -> impl ExactSizeIterator<Item = (TransactionOutpoint, &TransactionOutput)> {
        let id = self.tx.id();
        self.tx
            .outputs
            .iter()
            .enumerate()
            .map(move |(index, output)| (TransactionOutpoint::new(id, index as u32), output))
    }
}
