//! GHOSTDAG consensus implementation
//!
//! Blue/red coloring of mergesets, selected-parent choice and the stores
//! holding per-block GHOSTDAG data.

pub mod protocol;
pub mod stores;
#[cfg(test)]
mod integration_test;

pub use protocol::GhostdagProtocol;
pub use stores::{DbGhostdagStore, GhostdagStore, GhostdagStoreReader};
