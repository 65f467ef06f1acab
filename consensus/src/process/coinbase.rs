//! Coinbase transaction processing
//!
//! This module derives the coinbase a block must carry from its mergeset and
//! acceptance data, and the subsidy schedule every reward is based on.

use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStoreReader};
use crate::consensus::storage::acceptance_data::{AcceptanceDataStoreReader, DbAcceptanceDataStore};
use crate::consensus::storage::block_store::{BlockStoreReader, DbBlockTransactionsStore};
use crate::consensus::storage::daa::{DaaStoreReader, DbDaaStore};
use crate::errors::{ConsensusError, ConsensusResult};
use consensus_core::acceptance_data::MergesetBlockAcceptanceData;
use consensus_core::coinbase::{
    deserialize_coinbase_payload, serialize_coinbase_payload, CoinbaseData, CoinbasePayload,
};
use consensus_core::config::params::Params;
use consensus_core::constants::{COINBASE_TRANSACTION_INDEX, TX_VERSION};
use consensus_core::errors::CoinbaseError;
use consensus_core::ghostdag::GhostdagDataVariant;
use consensus_core::subnets::SUBNETWORK_ID_COINBASE;
use consensus_core::tx::{Transaction, TransactionOutput};
use consensus_core::{BlockHashSet, Hash};
use database::{DbResultExt, StagingArea};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// DAA score covered by one row of the subsidy table: a 365.25-day year,
/// counting one DAA score unit per second.
pub const SECONDS_PER_HALVING: u64 = 31_557_600;

/// Subsidy by row since the halving phase started, in sompi. Halves every
/// 12 rows, rounding down, and stays at zero after the last entry.
#[rustfmt::skip]
pub const SUBSIDY_BY_MONTH_TABLE: [u64; 361] = [
    600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000, 600000000,
    300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000, 300000000,
    150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000, 150000000,
    75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000, 75000000,
    37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000, 37500000,
    18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000, 18750000,
    9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000, 9375000,
    4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500, 4687500,
    2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750, 2343750,
    1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875, 1171875,
    585937, 585937, 585937, 585937, 585937, 585937, 585937, 585937, 585937, 585937, 585937, 585937,
    292968, 292968, 292968, 292968, 292968, 292968, 292968, 292968, 292968, 292968, 292968, 292968,
    146484, 146484, 146484, 146484, 146484, 146484, 146484, 146484, 146484, 146484, 146484, 146484,
    73242, 73242, 73242, 73242, 73242, 73242, 73242, 73242, 73242, 73242, 73242, 73242,
    36621, 36621, 36621, 36621, 36621, 36621, 36621, 36621, 36621, 36621, 36621, 36621,
    18310, 18310, 18310, 18310, 18310, 18310, 18310, 18310, 18310, 18310, 18310, 18310,
    9155, 9155, 9155, 9155, 9155, 9155, 9155, 9155, 9155, 9155, 9155, 9155,
    4577, 4577, 4577, 4577, 4577, 4577, 4577, 4577, 4577, 4577, 4577, 4577,
    2288, 2288, 2288, 2288, 2288, 2288, 2288, 2288, 2288, 2288, 2288, 2288,
    1144, 1144, 1144, 1144, 1144, 1144, 1144, 1144, 1144, 1144, 1144, 1144,
    572, 572, 572, 572, 572, 572, 572, 572, 572, 572, 572, 572,
    286, 286, 286, 286, 286, 286, 286, 286, 286, 286, 286, 286,
    143, 143, 143, 143, 143, 143, 143, 143, 143, 143, 143, 143,
    71, 71, 71, 71, 71, 71, 71, 71, 71, 71, 71, 71,
    35, 35, 35, 35, 35, 35, 35, 35, 35, 35, 35, 35,
    17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17, 17,
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    0,
];

pub struct CoinbaseManager {
    genesis_hash: Hash,
    subsidy_genesis_reward: u64,
    pre_halving_phase_base_subsidy: u64,
    halving_phase_daa_score: u64,
    coinbase_payload_script_public_key_max_length: u8,

    ghostdag_store: Arc<DbGhostdagStore>,
    acceptance_data_store: Arc<DbAcceptanceDataStore>,
    daa_store: Arc<DbDaaStore>,
    block_transactions_store: Arc<DbBlockTransactionsStore>,
}

impl CoinbaseManager {
    pub fn new(
        params: &Params,
        genesis_hash: Hash,
        ghostdag_store: Arc<DbGhostdagStore>,
        acceptance_data_store: Arc<DbAcceptanceDataStore>,
        daa_store: Arc<DbDaaStore>,
        block_transactions_store: Arc<DbBlockTransactionsStore>,
    ) -> Self {
        Self {
            genesis_hash,
            subsidy_genesis_reward: params.subsidy_genesis_reward,
            pre_halving_phase_base_subsidy: params.pre_halving_phase_base_subsidy,
            halving_phase_daa_score: params.halving_phase_daa_score,
            coinbase_payload_script_public_key_max_length: params
                .coinbase_payload_script_public_key_max_length,
            ghostdag_store,
            acceptance_data_store,
            daa_store,
            block_transactions_store,
        }
    }

    /// Builds the coinbase `block_hash` must carry. The flag tells whether the
    /// outputs include the aggregated reward of red blocks.
    ///
    /// Expects the block's GHOSTDAG data, DAA data and acceptance data to be stored or staged.
    pub fn expected_coinbase_transaction(
        &self,
        area: &StagingArea,
        block_hash: Hash,
        coinbase_data: &CoinbaseData,
    ) -> ConsensusResult<(Transaction, bool)> {
        // Trusted data keeps the mergeset untrimmed, so it wins when present
        let store = &self.ghostdag_store;
        let trusted =
            store.get_data_variant(area, block_hash, GhostdagDataVariant::Trusted).optional()?;
        let ghostdag_data = match trusted {
            Some(data) => data,
            None => store.get_data_variant(area, block_hash, GhostdagDataVariant::Local)?,
        };
        let acceptance_data = self.acceptance_data_store.get(area, block_hash)?;
        let daa_added_blocks: BlockHashSet =
            self.daa_store.get_daa_added_blocks(area, block_hash)?.iter().copied().collect();

        let acceptance_by_block: HashMap<Hash, &MergesetBlockAcceptanceData> =
            acceptance_data.iter().map(|entry| (entry.block_hash, entry)).collect();
        let mut outputs = Vec::with_capacity(ghostdag_data.mergeset_blues.len() + 1);
        for &blue in ghostdag_data.mergeset_blues.iter() {
            let acceptance = acceptance_by_block
                .get(&blue)
                .copied()
                .ok_or_else(|| missing_acceptance(block_hash, blue))?;
            let reward = self.calc_merged_block_reward(area, blue, acceptance, &daa_added_blocks)?;
            if reward == 0 {
                continue;
            }
            // A blue block is paid to the script it declared in its own coinbase
            let payload = self.merged_block_coinbase_payload(area, blue)?;
            outputs.push(TransactionOutput::new(reward, payload.coinbase_data.script_public_key));
        }

        let mut red_reward: u64 = 0;
        for &red in ghostdag_data.mergeset_reds.iter() {
            let acceptance = acceptance_by_block
                .get(&red)
                .copied()
                .ok_or_else(|| missing_acceptance(block_hash, red))?;
            let reward = self.calc_merged_block_reward(area, red, acceptance, &daa_added_blocks)?;
            red_reward = red_reward.saturating_add(reward);
        }
        let has_red_reward = red_reward > 0;
        if has_red_reward {
            let script_public_key = coinbase_data.script_public_key.clone();
            outputs.push(TransactionOutput::new(red_reward, script_public_key));
        }

        let subsidy = self.calc_block_subsidy(area, block_hash)?;
        let tx = self.build_coinbase_from_parts(
            ghostdag_data.blue_score,
            subsidy,
            coinbase_data,
            outputs,
        )?;
        trace!(
            block = %block_hash,
            outputs = tx.outputs.len(),
            subsidy,
            has_red_reward,
            "expected coinbase"
        );
        Ok((tx, has_red_reward))
    }

    /// Assembles a coinbase transaction from precomputed reward outputs
    pub fn build_coinbase_from_parts(
        &self,
        blue_score: u64,
        subsidy: u64,
        coinbase_data: &CoinbaseData,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Transaction, CoinbaseError> {
        let payload = serialize_coinbase_payload(
            blue_score,
            subsidy,
            coinbase_data,
            self.coinbase_payload_script_public_key_max_length,
        )?;
        Ok(Transaction::new(TX_VERSION, vec![], outputs, 0, SUBNETWORK_ID_COINBASE, 0, payload))
    }

    pub fn extract_coinbase_payload(
        &self,
        coinbase: &Transaction,
    ) -> Result<CoinbasePayload, CoinbaseError> {
        deserialize_coinbase_payload(
            &coinbase.payload,
            self.coinbase_payload_script_public_key_max_length,
        )
    }

    fn merged_block_coinbase_payload(
        &self,
        area: &StagingArea,
        merged: Hash,
    ) -> ConsensusResult<CoinbasePayload> {
        let transactions = self.block_transactions_store.get_transactions(area, merged)?;
        let coinbase = transactions.get(COINBASE_TRANSACTION_INDEX).ok_or_else(|| {
            ConsensusError::DataIntegrity(format!("stored body of {merged} has no coinbase"))
        })?;
        Ok(self.extract_coinbase_payload(coinbase)?)
    }

    /// Subsidy plus accepted fees of `merged`. Zero unless the merging block
    /// added `merged` to its DAA window, so each block is paid exactly once.
    fn calc_merged_block_reward(
        &self,
        area: &StagingArea,
        merged: Hash,
        acceptance: &MergesetBlockAcceptanceData,
        merging_daa_added_blocks: &BlockHashSet,
    ) -> ConsensusResult<u64> {
        if acceptance.block_hash != merged {
            return Err(ConsensusError::DataIntegrity(format!(
                "acceptance data is expected to be of block {merged} but is of {}",
                acceptance.block_hash
            )));
        }
        if !merging_daa_added_blocks.contains(&merged) {
            return Ok(0);
        }
        let subsidy = self.calc_block_subsidy(area, merged)?;
        Ok(subsidy.saturating_add(acceptance.total_fees()))
    }

    /// The subsidy `block_hash` mints: the genesis reward for genesis, otherwise set by its
    /// DAA score
    pub fn calc_block_subsidy(&self, area: &StagingArea, block_hash: Hash) -> ConsensusResult<u64> {
        if block_hash == self.genesis_hash {
            return Ok(self.subsidy_genesis_reward);
        }
        let daa_score = self.daa_store.get_daa_score(area, block_hash)?;
        Ok(self.calc_subsidy_at_daa_score(daa_score))
    }

    pub fn calc_subsidy_at_daa_score(&self, daa_score: u64) -> u64 {
        if daa_score < self.halving_phase_daa_score {
            return self.pre_halving_phase_base_subsidy;
        }
        let rows_since_halving_phase_started =
            (daa_score - self.halving_phase_daa_score) / SECONDS_PER_HALVING;
        let last_row = SUBSIDY_BY_MONTH_TABLE.len() as u64 - 1;
        let index = rows_since_halving_phase_started.min(last_row) as usize;
        SUBSIDY_BY_MONTH_TABLE[index]
    }
}

fn missing_acceptance(block_hash: Hash, merged: Hash) -> ConsensusError {
    ConsensusError::DataIntegrity(format!(
        "acceptance data of {block_hash} has no entry for merged block {merged}"
    ))
}
