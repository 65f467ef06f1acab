use thiserror::Error;

use crate::tx::{TransactionId, TransactionOutpoint};
use crate::utxo::UtxoAlgebraError;
use crate::{BlueWorkType, Hash};

/// Consensus rule violations. Fatal to the block or transaction being processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("wrong block version: got {0}, expected {1}")]
    WrongBlockVersion(u16, u16),

    #[error("block has no parents")]
    NoParents,

    #[error("block has {0} parents, above the maximum of {1}")]
    TooManyParents(usize, usize),

    #[error("parent {0} is listed more than once")]
    DuplicateParent(Hash),

    #[error("difficulty bits {0:#010x} do not encode a target within the network range")]
    InvalidDifficultyBits(u32),

    #[error("block {0} hashes above its target")]
    InvalidProofOfWork(Hash),

    #[error("timestamp {0} is past the latest allowed timestamp {1}")]
    TimeTooFarIntoTheFuture(u64, u64),

    #[error("timestamp {0} is not after the median parent timestamp {1}")]
    TimeTooOld(u64, u64),

    #[error("expected difficulty bits {0:#010x}, header has {1:#010x}")]
    UnexpectedDifficulty(u32, u32),

    #[error("missing parents: {0:?}")]
    MissingParents(Vec<Hash>),

    #[error("parent {0} is invalid")]
    InvalidParent(Hash),

    #[error("parent {0} is an ancestor of parent {1}")]
    InvalidParentsRelation(Hash, Hash),

    #[error("block {0} was previously marked invalid")]
    KnownInvalid(Hash),

    #[error("parents {0:?} are in the past of the pruning point")]
    PruningViolation(Vec<Hash>),

    #[error("expected header blue score {0}, got {1}")]
    UnexpectedBlueScore(u64, u64),

    #[error("expected header blue work {0}, got {1}")]
    UnexpectedBlueWork(BlueWorkType, BlueWorkType),

    #[error("expected header daa score {0}, got {1}")]
    UnexpectedDaaScore(u64, u64),

    #[error("block has no transactions")]
    NoTransactions,

    #[error("first transaction is not a coinbase")]
    FirstTxNotCoinbase,

    #[error("transaction at index {0} is a second coinbase")]
    MultipleCoinbases(usize),

    #[error("coinbase transaction has {0} inputs")]
    CoinbaseHasInputs(usize),

    #[error("coinbase payload is {0} bytes, above the maximum of {1}")]
    CoinbasePayloadTooLong(usize, usize),

    #[error("expected merkle root {0}, header has {1}")]
    BadMerkleRoot(Hash, Hash),

    #[error("block mass {0} exceeds the limit of {1}")]
    ExceedsMassLimit(u64, u64),

    #[error("transaction {0} appears twice in the block")]
    DuplicateTransaction(TransactionId),

    #[error("coinbase payload blue score is {0}, block blue score is {1}")]
    BadCoinbasePayloadBlueScore(u64, u64),

    #[error("bad coinbase payload: {0}")]
    BadCoinbasePayload(#[from] CoinbaseError),

    #[error("coinbase transaction of block {0} differs from the expected coinbase")]
    BadCoinbaseTransaction(Hash),

    #[error("transaction {0} failed validation in isolation: {1}")]
    TxInIsolationValidationFailed(TransactionId, TxRuleError),

    #[error("block {0} is not on any known chain")]
    UnknownChainBlock(Hash),

    #[error("invalid pruning point proof: {0}")]
    InvalidPruningPointProof(String),

    #[error("no pruning point utxo set import is in progress")]
    NoUtxoImportInProgress,

    #[error("a pruning point utxo set import is in progress")]
    UtxoImportInProgress,

    #[error("moving the chain from {0} to {1} would unwind blocks below the pruning point {2}")]
    ReorgBelowPruningPoint(Hash, Hash, Hash),

    #[error("pruning point {0} is unknown")]
    UnknownPruningPoint(Hash),
}

/// Transaction-level rule violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRuleError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("output {0} has zero value")]
    ZeroValueOutput(usize),

    #[error("outpoint {0} is spent twice")]
    DuplicateInput(TransactionOutpoint),

    #[error("transaction is on an unknown subnetwork")]
    UnknownSubnetwork,

    #[error("coinbase transaction in a non-coinbase position")]
    UnexpectedCoinbase,

    #[error("output value overflows or exceeds max supply")]
    OutputValueOverflow,

    #[error("outpoint {0} is missing from the utxo set")]
    MissingTxOutpoint(TransactionOutpoint),

    #[error("outpoint {0} is an immature coinbase output, matures at daa score {1}")]
    ImmatureCoinbaseSpend(TransactionOutpoint, u64),

    #[error("input value overflows")]
    InputValueOverflow,

    #[error("total input {0} is lower than total output {1}")]
    SpendTooHigh(u64, u64),

    #[error("utxo algebra: {0}")]
    UtxoAlgebra(#[from] UtxoAlgebraError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinbaseError {
    #[error("coinbase payload length is {0} while the minimum allowed length is {1}")]
    PayloadLenBelowMin(usize, usize),

    #[error("coinbase payload script public key length is {0}, above the maximum of {1}")]
    PayloadScriptPublicKeyLenAboveMax(usize, u8),

    #[error("coinbase payload of {0} bytes is too short for its script public key, needs {1}")]
    PayloadCantContainScriptPublicKey(usize, usize),
}

pub type BlockProcessResult<T> = std::result::Result<T, RuleError>;
pub type TxResult<T> = std::result::Result<T, TxRuleError>;
