//! Typed consensus stores
//!
//! Every store reads through an LRU cache and writes through a staging area.

pub mod acceptance_data;
pub mod block_store;
pub mod consensus_db;
pub mod consensus_state;
pub mod daa;
pub mod pruning;
pub mod selected_chain;
pub mod statuses;
pub mod utxo_diffs;
pub mod utxo_set;

pub use consensus_db::ConsensusStorage;
