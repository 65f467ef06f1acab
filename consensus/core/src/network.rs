use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network type identifies the network a node is operating on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Devnet,
    /// Local simulation network, used by tests
    Simnet,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "mainnet"),
            NetworkType::Testnet => write!(f, "testnet"),
            NetworkType::Devnet => write!(f, "devnet"),
            NetworkType::Simnet => write!(f, "simnet"),
        }
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        Self::iter()
            .find(|net| net.to_string() == name)
            .ok_or_else(|| format!("unknown network type: {s}"))
    }
}

impl NetworkType {
    pub fn iter() -> impl Iterator<Item = NetworkType> {
        [Self::Mainnet, Self::Testnet, Self::Devnet, Self::Simnet].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for net in NetworkType::iter() {
            assert_eq!(net.to_string().parse::<NetworkType>().unwrap(), net);
        }
        assert_eq!("SimNet".parse::<NetworkType>().unwrap(), NetworkType::Simnet);
        assert!("regtest".parse::<NetworkType>().is_err());
    }
}
