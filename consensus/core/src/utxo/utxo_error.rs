use crate::tx::TransactionOutpoint;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoAlgebraError {
    #[error("outpoint {0} is added twice")]
    DuplicateAddPoint(TransactionOutpoint),

    #[error("outpoint {0} is removed twice")]
    DuplicateRemovePoint(TransactionOutpoint),
}

pub type UtxoResult<T> = std::result::Result<T, UtxoAlgebraError>;
