use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// Failed validation. Kept so it is not processed again.
    Invalid,
    /// Header known (e.g. imported with a pruning proof), body missing or pruned
    HeaderOnly,
    /// Body validated in isolation, UTXO state not yet verified (not on the selected chain)
    UtxoPendingVerification,
    /// UTXO state verified as part of the selected chain
    UtxoValid,
    /// Was on the chain once and failed UTXO verification
    DisqualifiedFromChain,
}

impl BlockStatus {
    pub fn has_block_body(self) -> bool {
        matches!(
            self,
            Self::UtxoPendingVerification | Self::UtxoValid | Self::DisqualifiedFromChain
        )
    }

    pub fn is_utxo_valid_or_pending(self) -> bool {
        matches!(self, Self::UtxoPendingVerification | Self::UtxoValid)
    }

    pub fn is_invalid(self) -> bool {
        self == Self::Invalid
    }
}
