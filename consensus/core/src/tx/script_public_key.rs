use borsh::{BorshDeserialize, BorshSerialize};
use lumen_utils::hex::ToHex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Locking script of an output, tagged with the script engine version it targets.
///
/// Scripts up to 36 bytes live inline, which covers pay-to-pubkey.
#[derive(Debug, Default, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScriptPublicKey {
    version: u16,
    script: SmallVec<[u8; 36]>,
}

impl ScriptPublicKey {
    pub fn from_slice(version: u16, script: &[u8]) -> Self {
        Self { version, script: SmallVec::from_slice(script) }
    }

    pub fn from_vec(version: u16, script: Vec<u8>) -> Self {
        Self { version, script: SmallVec::from_vec(script) }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }
}

/// Version as four hex digits, then the script
impl fmt::Display for ScriptPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}{}", self.version, self.script.to_hex())
    }
}

// Same encoding as a (u16, Vec<u8>) pair
impl BorshSerialize for ScriptPublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.version, writer)?;
        BorshSerialize::serialize(self.script(), writer)
    }
}

impl BorshDeserialize for ScriptPublicKey {
    fn deserialize(buf: &mut &[u8]) -> std::io::Result<Self> {
        let (version, script) = <(u16, Vec<u8>) as BorshDeserialize>::deserialize(buf)?;
        Ok(Self::from_vec(version, script))
    }
}
