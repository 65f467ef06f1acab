use super::constants::{consensus::*, mass::*, subsidy::*};
use super::genesis::{GenesisBlock, DEVNET_GENESIS, GENESIS, SIMNET_GENESIS, TESTNET_GENESIS};
use crate::block::Block;
use crate::network::NetworkType;
use crate::KType;

/// Consensus parameters of a network
#[derive(Clone, Debug)]
pub struct Params {
    pub net: NetworkType,
    pub genesis: GenesisBlock,
    pub ghostdag_k: KType,
    pub max_block_parents: u8,
    /// Merged blocks whose blue score is within this distance of the merging block are DAA-added
    pub difficulty_window_size: u64,
    pub pruning_depth: u64,
    pub coinbase_maturity: u64,
    pub max_coinbase_payload_len: usize,
    pub coinbase_payload_script_public_key_max_length: u8,

    /// Compact bits of the easiest target a header may carry
    pub pow_max_bits: u32,
    /// Accept headers without checking their hash against the target
    pub skip_proof_of_work: bool,
    pub target_time_per_block: u64,
    pub max_future_timestamp_offset: u64,

    pub max_block_mass: u64,
    pub mass_per_tx_byte: u64,
    pub mass_per_script_pub_key_byte: u64,
    pub mass_per_sig_op: u64,

    pub subsidy_genesis_reward: u64,
    pub pre_halving_phase_base_subsidy: u64,
    pub halving_phase_daa_score: u64,
}

impl Params {
    pub fn genesis_block(&self) -> Block {
        self.genesis.build_block(self.subsidy_genesis_reward)
    }
}

impl From<NetworkType> for Params {
    fn from(net: NetworkType) -> Self {
        match net {
            NetworkType::Mainnet => MAINNET_PARAMS,
            NetworkType::Testnet => TESTNET_PARAMS,
            NetworkType::Devnet => DEVNET_PARAMS,
            NetworkType::Simnet => SIMNET_PARAMS,
        }
    }
}

pub const MAINNET_PARAMS: Params = Params {
    net: NetworkType::Mainnet,
    genesis: GENESIS,
    ghostdag_k: DEFAULT_GHOSTDAG_K,
    max_block_parents: DEFAULT_MAX_BLOCK_PARENTS,
    difficulty_window_size: DEFAULT_DIFFICULTY_WINDOW_SIZE,
    pruning_depth: DEFAULT_PRUNING_DEPTH,
    coinbase_maturity: DEFAULT_COINBASE_MATURITY,
    max_coinbase_payload_len: DEFAULT_MAX_COINBASE_PAYLOAD_LEN,
    coinbase_payload_script_public_key_max_length: DEFAULT_COINBASE_SCRIPT_PUBLIC_KEY_MAX_LEN,
    pow_max_bits: 0x1e7fffff,
    skip_proof_of_work: false,
    target_time_per_block: DEFAULT_TARGET_TIME_PER_BLOCK,
    max_future_timestamp_offset: DEFAULT_MAX_FUTURE_TIMESTAMP_OFFSET,
    max_block_mass: DEFAULT_MAX_BLOCK_MASS,
    mass_per_tx_byte: DEFAULT_MASS_PER_TX_BYTE,
    mass_per_script_pub_key_byte: DEFAULT_MASS_PER_SCRIPT_PUB_KEY_BYTE,
    mass_per_sig_op: DEFAULT_MASS_PER_SIG_OP,
    subsidy_genesis_reward: SUBSIDY_GENESIS_REWARD,
    pre_halving_phase_base_subsidy: PRE_HALVING_PHASE_BASE_SUBSIDY,
    halving_phase_daa_score: MAINNET_HALVING_PHASE_DAA_SCORE,
};

pub const TESTNET_PARAMS: Params = Params {
    net: NetworkType::Testnet,
    genesis: TESTNET_GENESIS,
    halving_phase_daa_score: MAINNET_HALVING_PHASE_DAA_SCORE / 10,
    ..MAINNET_PARAMS
};

pub const DEVNET_PARAMS: Params = Params {
    net: NetworkType::Devnet,
    genesis: DEVNET_GENESIS,
    pruning_depth: 10_000,
    pow_max_bits: 0x1f7fffff,
    halving_phase_daa_score: 100_000,
    ..MAINNET_PARAMS
};

pub const SIMNET_PARAMS: Params = Params {
    net: NetworkType::Simnet,
    genesis: SIMNET_GENESIS,
    difficulty_window_size: 263,
    pruning_depth: 1_000,
    coinbase_maturity: 10,
    pow_max_bits: 0x207fffff,
    skip_proof_of_work: true,
    halving_phase_daa_score: 0,
    ..MAINNET_PARAMS
};
