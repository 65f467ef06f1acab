use crate::block::Block;
use crate::coinbase::{encode_payload, CoinbaseData};
use crate::constants::{BLOCK_VERSION, TX_VERSION};
use crate::header::Header;
use crate::subnets::SUBNETWORK_ID_COINBASE;
use crate::tx::Transaction;
use lumen_hashes::calc_merkle_root;

/// The constants uniquely representing the genesis block of a network
#[derive(Clone, Debug)]
pub struct GenesisBlock {
    pub version: u16,
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub coinbase_extra_data: &'static [u8],
}

impl GenesisBlock {
    /// The genesis coinbase has no outputs. Its reward is paid by the first block merging it.
    pub fn coinbase_transaction(&self, subsidy: u64) -> Transaction {
        let data = CoinbaseData::new(Default::default(), self.coinbase_extra_data.to_vec());
        let payload = encode_payload(0, subsidy, &data);
        Transaction::new(TX_VERSION, vec![], vec![], 0, SUBNETWORK_ID_COINBASE, 0, payload)
    }

    pub fn build_block(&self, subsidy: u64) -> Block {
        let coinbase = self.coinbase_transaction(subsidy);
        let header = Header::new_finalized(
            self.version,
            vec![],
            calc_merkle_root([coinbase.id()]),
            self.timestamp,
            self.bits,
            self.nonce,
            self.daa_score,
            Default::default(),
            0,
        );
        Block::new(header, vec![coinbase])
    }
}

pub const GENESIS: GenesisBlock = GenesisBlock {
    version: BLOCK_VERSION,
    timestamp: 1_760_572_800_000,
    bits: 0x1e7fffff,
    nonce: 0x3392c,
    daa_score: 0,
    coinbase_extra_data: b"lumen mainnet genesis",
};

pub const TESTNET_GENESIS: GenesisBlock = GenesisBlock {
    version: BLOCK_VERSION,
    timestamp: 1_760_572_800_000,
    bits: 0x1e7fffff,
    nonce: 0x14582,
    daa_score: 0,
    coinbase_extra_data: b"lumen testnet genesis",
};

pub const DEVNET_GENESIS: GenesisBlock = GenesisBlock {
    version: BLOCK_VERSION,
    timestamp: 1_760_572_800_000,
    bits: 0x1f7fffff,
    nonce: 0x48e5e,
    daa_score: 0,
    coinbase_extra_data: b"lumen devnet genesis",
};

pub const SIMNET_GENESIS: GenesisBlock = GenesisBlock {
    version: BLOCK_VERSION,
    timestamp: 1_760_572_800_000,
    bits: 0x207fffff,
    nonce: 0x2,
    daa_score: 0,
    coinbase_extra_data: b"lumen simnet genesis",
};
