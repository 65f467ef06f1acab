//! Block relations and ancestry queries

pub mod relations;
pub mod topology;

pub use relations::{DbRelationsStore, RelationsStore, RelationsStoreReader};
pub use topology::DagTopology;
