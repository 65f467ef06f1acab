//! Engine configuration
//!
//! Network parameters come from the selected [`NetworkType`] preset. The rest
//! tunes store caches and may be loaded from a TOML file.

use consensus_core::config::params::Params;
use consensus_core::network::NetworkType;
use consensus_core::KType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-store LRU cache capacities, in entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub headers: usize,
    pub blocks: usize,
    pub relations: usize,
    pub ghostdag: usize,
    pub statuses: usize,
    pub daa: usize,
    pub acceptance_data: usize,
    pub utxo_diffs: usize,
    pub utxo_set: usize,
    /// Allocate the UTXO cache up front
    pub preallocate_utxo_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            headers: 10_000,
            blocks: 1_000,
            relations: 10_000,
            ghostdag: 10_000,
            statuses: 10_000,
            daa: 10_000,
            acceptance_data: 1_000,
            utxo_diffs: 1_000,
            utxo_set: 100_000,
            preallocate_utxo_cache: false,
        }
    }
}

/// Optional overrides of the network preset, mostly for tests and private networks
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParamsOverrides {
    pub ghostdag_k: Option<KType>,
    pub max_block_parents: Option<u8>,
    pub difficulty_window_size: Option<u64>,
    pub pruning_depth: Option<u64>,
    pub coinbase_maturity: Option<u64>,
    pub halving_phase_daa_score: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub network: NetworkType,
    pub cache: CacheConfig,
    pub overrides: ParamsOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_network(NetworkType::Mainnet)
    }
}

impl Config {
    pub fn for_network(network: NetworkType) -> Self {
        Self { network, cache: CacheConfig::default(), overrides: ParamsOverrides::default() }
    }

    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The network preset with overrides applied
    pub fn params(&self) -> Params {
        let mut params = Params::from(self.network);
        let o = &self.overrides;
        if let Some(k) = o.ghostdag_k {
            params.ghostdag_k = k;
        }
        if let Some(v) = o.max_block_parents {
            params.max_block_parents = v;
        }
        if let Some(v) = o.difficulty_window_size {
            params.difficulty_window_size = v;
        }
        if let Some(v) = o.pruning_depth {
            params.pruning_depth = v;
        }
        if let Some(v) = o.coinbase_maturity {
            params.coinbase_maturity = v;
        }
        if let Some(v) = o.halving_phase_daa_score {
            params.halving_phase_daa_score = v;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml(
            r#"
            network = "simnet"

            [cache]
            utxo_set = 42

            [overrides]
            pruning_depth = 30
            ghostdag_k = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.network, NetworkType::Simnet);
        assert_eq!(config.cache.utxo_set, 42);
        assert_eq!(config.cache.headers, CacheConfig::default().headers);
        let params = config.params();
        assert_eq!(params.pruning_depth, 30);
        assert_eq!(params.ghostdag_k, 3);
        assert_eq!(params.coinbase_maturity, Params::from(NetworkType::Simnet).coinbase_maturity);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
