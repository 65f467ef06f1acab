use serde::{Deserialize, Serialize};

use crate::{block::Block, ghostdag::GhostdagData};

/// A block shipped with a pruning-point proof together with the GHOSTDAG data
/// the sender computed for it. The receiver cannot recompute that data since
/// the block's past is not available locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedBlock {
    pub block: Block,
    pub ghostdag: GhostdagData,
}

impl TrustedBlock {
    pub fn new(block: Block, ghostdag: GhostdagData) -> Self {
        Self { block, ghostdag }
    }
}
