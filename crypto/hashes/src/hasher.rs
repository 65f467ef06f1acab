//! SHA-256 primitives behind block, transaction and merkle hashing.
//! Every consensus hash is a double SHA-256.

use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Incremental hasher. Header and transaction fields are fed one by one
/// instead of being encoded into a buffer first.
#[derive(Clone, Default)]
pub struct HashWriter {
    state: Sha256,
}

impl HashWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.state.update(data.as_ref());
        self
    }

    pub fn finalize(self) -> [u8; 32] {
        self.state.finalize().into()
    }

    pub fn finalize_double(self) -> [u8; 32] {
        sha256(&self.finalize())
    }
}
