//! Block processing pipeline
//!
//! A block goes through header processing, body processing and virtual
//! resolution, all staged in one area and committed together.

pub mod block_processor;
pub mod body_processor;
pub mod header_processor;
pub mod virtual_processor;

pub use block_processor::BlockProcessor;
pub use body_processor::BodyProcessor;
pub use header_processor::HeaderProcessor;
pub use virtual_processor::VirtualStateProcessor;
