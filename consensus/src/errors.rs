//! Consensus error taxonomy
//!
//! Rule and transaction violations are permanent for the offending block or
//! transaction. Storage errors are passed through unchanged. A data integrity
//! error means stored data contradicts itself and is fatal to the operation.

use consensus_core::errors::{CoinbaseError, RuleError, TxRuleError};
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Tx(#[from] TxRuleError),

    #[error(transparent)]
    Coinbase(#[from] CoinbaseError),

    #[error("database: {0}")]
    Db(#[from] DbError),

    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
}

impl From<std::convert::Infallible> for ConsensusError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl ConsensusError {
    pub fn is_rule_error(&self) -> bool {
        matches!(self, Self::Rule(_) | Self::Tx(_) | Self::Coinbase(_))
    }
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
