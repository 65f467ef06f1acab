//! Validation module for consensus
//!
//! Header, body and transaction rules. Checks in isolation need only the
//! object itself; checks in context read the DAG or a UTXO view.

pub mod block_validator;
pub mod header_validator;
pub mod transaction_validator;

pub use block_validator::BlockValidator;
pub use header_validator::HeaderValidator;
pub use transaction_validator::TransactionValidator;
