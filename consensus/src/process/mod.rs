//! Consensus processes built on top of the block pipeline: coinbase rewards,
//! block templates, pruning and pruning point proofs.

pub mod coinbase;
pub mod mining;
pub mod pruning;
pub mod pruning_proof;
#[cfg(test)]
mod integration_test;

pub use coinbase::CoinbaseManager;
pub use mining::BlockTemplateBuilder;
pub use pruning::PruningManager;
pub use pruning_proof::PruningProofManager;
