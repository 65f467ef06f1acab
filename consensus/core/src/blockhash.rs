use crate::Hash;

/// Hash of the virtual block. Never mined, never stored as a real block.
pub const VIRTUAL: Hash = Hash::from_bytes([0xff; 32]);

/// Sentinel parent of genesis and of trusted blocks whose past is unknown.
/// It is never an ancestor for reward or relation purposes.
pub const VIRTUAL_GENESIS: Hash = Hash::from_bytes([0xfe; 32]);

pub trait BlockHashExtensions {
    fn is_virtual(&self) -> bool;
    fn is_virtual_genesis(&self) -> bool;
    /// True for either sentinel
    fn is_sentinel(&self) -> bool {
        self.is_virtual() || self.is_virtual_genesis()
    }
}

impl BlockHashExtensions for Hash {
    fn is_virtual(&self) -> bool {
        *self == VIRTUAL
    }

    fn is_virtual_genesis(&self) -> bool {
        *self == VIRTUAL_GENESIS
    }
}

/// Returns true iff `hashes` is exactly the virtual genesis sentinel
pub fn contains_only_virtual_genesis(hashes: &[Hash]) -> bool {
    matches!(hashes, [single] if single.is_virtual_genesis())
}
