use crate::constants::COINBASE_TRANSACTION_INDEX;
use crate::header::Header;
use crate::tx::Transaction;
use crate::Hash;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// A header and its transactions, coinbase first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    /// The hash cached in the header. Header edits need `header.finalize()` first.
    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    /// The first transaction, whether or not it is a valid coinbase
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.get(COINBASE_TRANSACTION_INDEX)
    }
}

/// Output of the template builder. Built in a scratch staging area, so none of it is persisted.
#[derive(Clone, Debug)]
pub struct BlockTemplate {
    pub block: Block,
    /// Whether the coinbase pays out rewards of red merged blocks
    pub coinbase_has_red_reward: bool,
    pub selected_parent_hash: Hash,
}
