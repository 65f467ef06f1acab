//! Difficulty: compact targets, DAA scores, window membership and retargeting

pub mod manager;
pub mod target;

pub use manager::DaaManager;
pub use target::{calc_work, compact_to_target, target_to_compact};
