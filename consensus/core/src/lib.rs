//! Core consensus types shared by the store layer and the consensus engine:
//! headers, blocks, transactions, UTXO algebra, GHOSTDAG and acceptance data,
//! coinbase payloads, network parameters and rule errors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub mod acceptance_data;
pub mod block;
pub mod blockhash;
pub mod blockstatus;
pub mod coinbase;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ghostdag;
pub mod hashing;
pub mod header;
pub mod mass;
pub mod network;
pub mod pruning;
pub mod subnets;
pub mod trusted;
pub mod tx;
pub mod utxo;

pub use lumen_hashes::Hash;

/// Accumulated proof-of-work of the blue blocks in a block's past
pub type BlueWorkType = lumen_math::Uint192;

/// The GHOSTDAG `k` parameter type
pub type KType = u16;

pub type BlockHashSet = HashSet<Hash>;
pub type BlockHashMap<V> = HashMap<Hash, V>;
pub type BlockHashes = Arc<Vec<Hash>>;

pub const ZERO_HASH: Hash = Hash::zeroed();
