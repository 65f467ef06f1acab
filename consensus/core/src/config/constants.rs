//! Protocol defaults shared by the network presets

pub mod consensus {
    use crate::KType;

    /// GHOSTDAG `k` for one block per second
    pub const DEFAULT_GHOSTDAG_K: KType = 18;

    pub const DEFAULT_MAX_BLOCK_PARENTS: u8 = 10;

    /// Blue score distance within which merged blocks join the DAA window
    pub const DEFAULT_DIFFICULTY_WINDOW_SIZE: u64 = 2641;

    /// Blue score distance kept below the sink before data is pruned
    pub const DEFAULT_PRUNING_DEPTH: u64 = 185_798;

    pub const DEFAULT_COINBASE_MATURITY: u64 = 100;

    pub const DEFAULT_MAX_COINBASE_PAYLOAD_LEN: usize = 204;

    pub const DEFAULT_COINBASE_SCRIPT_PUBLIC_KEY_MAX_LEN: u8 = 150;

    /// Milliseconds
    pub const DEFAULT_TARGET_TIME_PER_BLOCK: u64 = 1000;

    /// How far ahead of the local clock a header timestamp may be, in milliseconds
    pub const DEFAULT_MAX_FUTURE_TIMESTAMP_OFFSET: u64 = 132_000;
}

pub mod mass {
    pub const DEFAULT_MAX_BLOCK_MASS: u64 = 500_000;

    pub const DEFAULT_MASS_PER_TX_BYTE: u64 = 1;

    pub const DEFAULT_MASS_PER_SCRIPT_PUB_KEY_BYTE: u64 = 10;

    pub const DEFAULT_MASS_PER_SIG_OP: u64 = 1000;
}

pub mod subsidy {
    use crate::constants::SOMPI_PER_LUMEN;

    pub const SUBSIDY_GENESIS_REWARD: u64 = 50 * SOMPI_PER_LUMEN;

    /// Flat subsidy paid before the halving phase starts
    pub const PRE_HALVING_PHASE_BASE_SUBSIDY: u64 = 6 * SOMPI_PER_LUMEN;

    /// DAA score at which the halving table takes over (half a year at one block per second)
    pub const MAINNET_HALVING_PHASE_DAA_SCORE: u64 = 15_778_800;
}
