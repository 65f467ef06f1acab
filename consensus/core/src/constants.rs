/// Number of sompi in one lumen
pub const SOMPI_PER_LUMEN: u64 = 100_000_000;

/// Maximum amount of sompi that can ever exist
pub const MAX_SOMPI: u64 = 29_000_000_000 * SOMPI_PER_LUMEN;

pub const BLOCK_VERSION: u16 = 1;
pub const TX_VERSION: u16 = 0;

/// Max value of `sequence` for a transaction input
pub const MAX_TX_IN_SEQUENCE_NUM: u64 = u64::MAX;

/// Index of the coinbase transaction in every block
pub const COINBASE_TRANSACTION_INDEX: usize = 0;
