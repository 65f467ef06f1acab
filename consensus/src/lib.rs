//! Consensus engine for a GHOSTDAG block DAG
//!
//! Blocks are validated and inserted through a staged pipeline over typed,
//! cached stores. The engine keeps the virtual UTXO set in line with the
//! selected chain, pays merged blocks through the coinbase, and prunes block
//! data below a trailing pruning point.

pub mod api;
pub mod config;
pub mod consensus;
pub mod errors;
pub mod pipeline;
pub mod process;

pub use api::ConsensusApi;
pub use config::Config;
pub use consensus::Consensus;
pub use consensus_core::Hash;
pub use errors::{ConsensusError, ConsensusResult};
