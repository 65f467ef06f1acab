//! DAA score calculation and difficulty retargeting
//!
//! A merged block is added to the difficulty window of the merging block when
//! their blue scores are at most `difficulty_window_size` apart. The DAA score
//! of a block counts every window addition along its selected chain.
//!
//! The required difficulty of a block is derived from the last
//! `difficulty_window_size` blocks of its selected chain: their average target,
//! scaled by how far their timestamp span strays from the expected one.

use super::target::{compact_to_target, target_to_compact};
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStoreReader};
use crate::consensus::storage::block_store::{BlockHeaderStoreReader, DbHeadersStore};
use crate::consensus::storage::daa::{DaaStoreReader, DbDaaStore};
use crate::errors::ConsensusResult;
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::ghostdag::GhostdagData;
use consensus_core::Hash;
use database::{DbResultExt, StagingArea};
use primitive_types::{U256, U512};
use std::sync::Arc;

/// A window's timestamp span is clamped to this factor around the expected span
const MAX_ADJUSTMENT_FACTOR: u64 = 4;

pub struct DaaManager {
    difficulty_window_size: u64,
    target_time_per_block: u64,
    pow_max_bits: u32,
    ghostdag_store: Arc<DbGhostdagStore>,
    daa_store: Arc<DbDaaStore>,
    headers: Arc<DbHeadersStore>,
}

impl DaaManager {
    pub fn new(
        difficulty_window_size: u64,
        target_time_per_block: u64,
        pow_max_bits: u32,
        ghostdag_store: Arc<DbGhostdagStore>,
        daa_store: Arc<DbDaaStore>,
        headers: Arc<DbHeadersStore>,
    ) -> Self {
        Self {
            difficulty_window_size,
            target_time_per_block,
            pow_max_bits,
            ghostdag_store,
            daa_store,
            headers,
        }
    }

    /// Returns the DAA score of a block with `ghostdag_data`, and the mergeset
    /// blocks it adds to the window
    pub fn calc_daa_score_and_added_blocks(
        &self,
        area: &StagingArea,
        ghostdag_data: &GhostdagData,
    ) -> ConsensusResult<(u64, Vec<Hash>)> {
        let selected_parent_daa_score =
            self.daa_store.get_daa_score(area, ghostdag_data.selected_parent)?;
        let mut added = Vec::with_capacity(ghostdag_data.mergeset_size());
        for block in ghostdag_data.unordered_mergeset() {
            let blue_score = self.ghostdag_store.get_blue_score(area, block)?;
            if self.is_in_window(ghostdag_data.blue_score, blue_score) {
                added.push(block);
            }
        }
        Ok((selected_parent_daa_score + added.len() as u64, added))
    }

    pub fn is_in_window(&self, merging_blue_score: u64, merged_blue_score: u64) -> bool {
        merging_blue_score.saturating_sub(merged_blue_score) <= self.difficulty_window_size
    }

    /// Difficulty bits a block whose selected parent is `selected_parent` must carry.
    ///
    /// Until the chain holds a full window the selected parent's bits carry
    /// over. This covers young chains, whose bits all descend from genesis, and
    /// chains whose older headers were never imported.
    pub fn calc_required_bits(
        &self,
        area: &StagingArea,
        selected_parent: Hash,
    ) -> ConsensusResult<u32> {
        let window_size = self.difficulty_window_size as usize;
        let mut window = Vec::with_capacity(window_size);
        let mut current = selected_parent;
        while window.len() < window_size && !current.is_sentinel() {
            let Some(header) = self.headers.get_header(area, current).optional()? else { break };
            window.push((header.timestamp, header.bits));
            let Some(next) = self.ghostdag_store.get_selected_parent(area, current).optional()?
            else {
                break;
            };
            current = next;
        }
        if window.len() < window_size.max(2) {
            return Ok(self.headers.get_header(area, selected_parent)?.bits);
        }

        let (min_ts, max_ts) =
            window.iter().fold((u64::MAX, 0), |(lo, hi), &(ts, _)| (lo.min(ts), hi.max(ts)));
        let expected_span = self.target_time_per_block * (window.len() as u64 - 1);
        let span = (max_ts - min_ts)
            .clamp(expected_span / MAX_ADJUSTMENT_FACTOR, expected_span * MAX_ADJUSTMENT_FACTOR)
            .max(1);

        let sum = window
            .iter()
            .fold(U512::zero(), |sum, &(_, bits)| sum + U512::from(compact_to_target(bits)));
        let average = sum / U512::from(window.len() as u64);
        let next = average * U512::from(span) / U512::from(expected_span.max(1));
        let next = next.min(U512::from(compact_to_target(self.pow_max_bits))).max(U512::one());
        Ok(target_to_compact(U256([next.0[0], next.0[1], next.0[2], next.0[3]])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::ghostdag::stores::GhostdagStore;
    use crate::consensus::storage::block_store::BlockHeaderStore;
    use consensus_core::blockhash::VIRTUAL_GENESIS;
    use consensus_core::constants::BLOCK_VERSION;
    use consensus_core::ghostdag::GhostdagDataVariant;
    use consensus_core::header::Header;
    use database::Database;
    use tempfile::TempDir;

    const MAX_BITS: u32 = 0x207fffff;
    const BITS: u32 = 0x1e7fffff;

    fn manager(db: &Arc<Database>, window: u64) -> DaaManager {
        DaaManager::new(
            window,
            1000,
            MAX_BITS,
            Arc::new(DbGhostdagStore::new(db.clone(), 0)),
            Arc::new(DbDaaStore::new(db.clone(), 0)),
            Arc::new(DbHeadersStore::new(db.clone(), 0)),
        )
    }

    /// Stages a chain whose blocks carry `bits` and are `spacing` ms apart, returning its tip
    fn chain(
        manager: &DaaManager,
        area: &mut StagingArea,
        len: u64,
        spacing: u64,
        bits: u32,
    ) -> Hash {
        let mut tip = VIRTUAL_GENESIS;
        for i in 0..len {
            let parents = if tip.is_sentinel() { vec![] } else { vec![tip] };
            let timestamp = 1_000_000 + i * spacing;
            let header = Header::new_finalized(
                BLOCK_VERSION,
                parents,
                Hash::from_u64_word(i),
                timestamp,
                bits,
                0,
                i,
                Default::default(),
                i,
            );
            let mut data = GhostdagData::new_with_selected_parent(tip, 18);
            data.blue_score = i;
            manager.headers.insert_header(area, Arc::new(header.clone())).unwrap();
            let variant = GhostdagDataVariant::Local;
            manager.ghostdag_store.insert(area, header.hash, Arc::new(data), variant).unwrap();
            tip = header.hash;
        }
        tip
    }

    #[test]
    fn test_window_membership() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let manager = manager(&db, 10);
        assert!(manager.is_in_window(20, 10));
        assert!(!manager.is_in_window(21, 10));
        assert!(manager.is_in_window(5, 9));
    }

    #[test]
    fn test_required_bits_carry_over_until_window_fills() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let manager = manager(&db, 4);
        let mut area = StagingArea::new();
        let tip = chain(&manager, &mut area, 3, 1, BITS);
        assert_eq!(manager.calc_required_bits(&area, tip).unwrap(), BITS);
    }

    #[test]
    fn test_required_bits_follow_block_rate() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let manager = manager(&db, 4);

        let mut area = StagingArea::new();
        let on_time = chain(&manager, &mut area, 5, 1000, BITS);
        assert_eq!(manager.calc_required_bits(&area, on_time).unwrap(), BITS);

        // blocks far too fast: the target shrinks by the clamped factor
        let mut area = StagingArea::new();
        let fast = chain(&manager, &mut area, 5, 1, BITS);
        let harder = target_to_compact(compact_to_target(BITS) / 4);
        assert_eq!(manager.calc_required_bits(&area, fast).unwrap(), harder);

        // blocks far too slow: the target grows by the clamped factor
        let mut area = StagingArea::new();
        let slow = chain(&manager, &mut area, 5, 100_000, BITS);
        let easier = target_to_compact(compact_to_target(BITS) * 4);
        assert_eq!(manager.calc_required_bits(&area, slow).unwrap(), easier);

        // but never past the network maximum
        let mut area = StagingArea::new();
        let easiest = chain(&manager, &mut area, 5, 100_000, MAX_BITS);
        assert_eq!(manager.calc_required_bits(&area, easiest).unwrap(), MAX_BITS);
    }
}
