//! Header validation for consensus
//!
//! This module validates block headers:
//! - Version, parent list shape, difficulty bits, proof of work and the
//!   future timestamp bound, in isolation
//! - Parent existence, validity and mutual relation, against the DAG
//! - Timestamp against the parents' median, required difficulty, GHOSTDAG
//!   and DAA fields, against the values computed for the block

use crate::consensus::dag::topology::DagTopology;
use crate::consensus::difficulty::target::{compact_to_target, is_valid_bits};
use crate::consensus::storage::block_store::{BlockHeaderStoreReader, DbHeadersStore};
use crate::consensus::storage::pruning::{DbPruningStore, PruningStoreReader};
use crate::consensus::storage::statuses::{DbStatusesStore, StatusesStoreReader};
use crate::errors::ConsensusResult;
use consensus_core::constants::BLOCK_VERSION;
use consensus_core::errors::{BlockProcessResult, RuleError};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::Hash;
use database::StagingArea;
use primitive_types::U256;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header validator for consensus rules
pub struct HeaderValidator {
    max_block_parents: usize,
    genesis_hash: Hash,
    pow_max_target: U256,
    skip_proof_of_work: bool,
    max_future_timestamp_offset: u64,

    headers: Arc<DbHeadersStore>,
    statuses: Arc<DbStatusesStore>,
    pruning_store: Arc<DbPruningStore>,
    topology: DagTopology,
}

impl HeaderValidator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_block_parents: usize,
        genesis_hash: Hash,
        pow_max_bits: u32,
        skip_proof_of_work: bool,
        max_future_timestamp_offset: u64,
        headers: Arc<DbHeadersStore>,
        statuses: Arc<DbStatusesStore>,
        pruning_store: Arc<DbPruningStore>,
        topology: DagTopology,
    ) -> Self {
        Self {
            max_block_parents,
            genesis_hash,
            pow_max_target: compact_to_target(pow_max_bits),
            skip_proof_of_work,
            max_future_timestamp_offset,
            headers,
            statuses,
            pruning_store,
            topology,
        }
    }

    /// Context-free checks of a non-genesis header
    pub fn validate_header_in_isolation(&self, header: &Header) -> BlockProcessResult<()> {
        if header.version != BLOCK_VERSION {
            return Err(RuleError::WrongBlockVersion(header.version, BLOCK_VERSION));
        }

        let parents = header.direct_parents();
        if parents.is_empty() {
            return Err(RuleError::NoParents);
        }
        if parents.len() > self.max_block_parents {
            return Err(RuleError::TooManyParents(parents.len(), self.max_block_parents));
        }

        let mut seen = HashSet::with_capacity(parents.len());
        for parent in parents {
            if !seen.insert(*parent) {
                return Err(RuleError::DuplicateParent(*parent));
            }
        }

        self.check_difficulty_bits(header)?;
        self.check_pow(header)?;
        self.check_timestamp_in_isolation(header, unix_now_millis())
    }

    /// Blue work is summed from `bits`, so an encoding with a zero or
    /// out-of-range target must never reach GHOSTDAG
    fn check_difficulty_bits(&self, header: &Header) -> BlockProcessResult<()> {
        if !is_valid_bits(header.bits, self.pow_max_target) {
            return Err(RuleError::InvalidDifficultyBits(header.bits));
        }
        Ok(())
    }

    /// The header hash, read as a big-endian number, must not exceed the target
    pub fn check_pow(&self, header: &Header) -> BlockProcessResult<()> {
        if self.skip_proof_of_work {
            return Ok(());
        }
        let pow = U256::from_big_endian(header.hash.as_bytes());
        if pow > compact_to_target(header.bits) {
            return Err(RuleError::InvalidProofOfWork(header.hash));
        }
        Ok(())
    }

    fn check_timestamp_in_isolation(&self, header: &Header, now: u64) -> BlockProcessResult<()> {
        let max_allowed = now.saturating_add(self.max_future_timestamp_offset);
        if header.timestamp > max_allowed {
            return Err(RuleError::TimeTooFarIntoTheFuture(header.timestamp, max_allowed));
        }
        Ok(())
    }

    /// The timestamp must be above the median timestamp of the direct parents
    pub fn check_timestamp_against_parents(
        &self,
        area: &StagingArea,
        header: &Header,
    ) -> ConsensusResult<()> {
        let mut timestamps = Vec::with_capacity(header.direct_parents().len());
        for &parent in header.direct_parents() {
            timestamps.push(self.headers.get_header(area, parent)?.timestamp);
        }
        let median = median_timestamp(timestamps);
        if header.timestamp <= median {
            return Err(RuleError::TimeTooOld(header.timestamp, median).into());
        }
        Ok(())
    }

    /// Every parent must be known and valid, no parent may be in the past of another,
    /// and at least one parent must be in the future of the pruning point.
    pub fn validate_parents(&self, area: &StagingArea, header: &Header) -> ConsensusResult<()> {
        let parents = header.direct_parents();

        let mut missing = Vec::new();
        for &parent in parents {
            match self.statuses.get_status_opt(area, parent)? {
                None => missing.push(parent),
                Some(status) if status.is_invalid() => {
                    return Err(RuleError::InvalidParent(parent).into())
                }
                Some(_) => {}
            }
        }
        if !missing.is_empty() {
            return Err(RuleError::MissingParents(missing).into());
        }

        for &a in parents {
            for &b in parents {
                if a != b && self.topology.is_dag_ancestor_of(area, a, b)? {
                    return Err(RuleError::InvalidParentsRelation(a, b).into());
                }
            }
        }

        let pruning_point = self.pruning_store.get_pruning_point(area)?;
        if pruning_point == self.genesis_hash {
            return Ok(());
        }
        for &parent in parents {
            if self.topology.is_chain_ancestor_of(area, pruning_point, parent)?
                || self.topology.is_dag_ancestor_of(area, pruning_point, parent)?
            {
                return Ok(());
            }
        }
        Err(RuleError::PruningViolation(parents.to_vec()).into())
    }

    /// The header must commit to the difficulty, GHOSTDAG and DAA values computed for it
    pub fn validate_header_in_context(
        &self,
        header: &Header,
        ghostdag_data: &GhostdagData,
        daa_score: u64,
        required_bits: u32,
    ) -> BlockProcessResult<()> {
        if header.bits != required_bits {
            return Err(RuleError::UnexpectedDifficulty(required_bits, header.bits));
        }
        if header.blue_score != ghostdag_data.blue_score {
            return Err(RuleError::UnexpectedBlueScore(ghostdag_data.blue_score, header.blue_score));
        }
        if header.blue_work != ghostdag_data.blue_work {
            return Err(RuleError::UnexpectedBlueWork(ghostdag_data.blue_work, header.blue_work));
        }
        if header.daa_score != daa_score {
            return Err(RuleError::UnexpectedDaaScore(daa_score, header.daa_score));
        }
        Ok(())
    }
}

fn median_timestamp(mut timestamps: Vec<u64>) -> u64 {
    if timestamps.is_empty() {
        return 0;
    }
    timestamps.sort_unstable();
    timestamps[timestamps.len() / 2]
}

fn unix_now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::dag::relations::DbRelationsStore;
    use crate::consensus::ghostdag::stores::DbGhostdagStore;
    use crate::consensus::storage::block_store::BlockHeaderStore;
    use crate::consensus::storage::selected_chain::DbSelectedChainStore;
    use database::Database;
    use tempfile::TempDir;

    const MAX_BITS: u32 = 0x207fffff;

    fn header(version: u16, parents: Vec<Hash>) -> Header {
        header_with(version, parents, 1, MAX_BITS, 0)
    }

    fn header_with(
        version: u16,
        parents: Vec<Hash>,
        timestamp: u64,
        bits: u32,
        nonce: u64,
    ) -> Header {
        Header::new_finalized(
            version,
            parents,
            Hash::default(),
            timestamp,
            bits,
            nonce,
            0,
            Default::default(),
            0,
        )
    }

    struct Fixture {
        _tmp: TempDir,
        headers: Arc<DbHeadersStore>,
        validator: HeaderValidator,
    }

    fn fixture(skip_proof_of_work: bool) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let ghostdag = Arc::new(DbGhostdagStore::new(db.clone(), 0));
        let selected_chain = Arc::new(DbSelectedChainStore::new(db.clone(), 0));
        let relations = Arc::new(DbRelationsStore::new(db.clone(), 0));
        let topology = DagTopology::new(relations, ghostdag, selected_chain);
        let headers = Arc::new(DbHeadersStore::new(db.clone(), 0));
        let validator = HeaderValidator::new(
            2,
            Hash::from_u64_word(1),
            MAX_BITS,
            skip_proof_of_work,
            1000,
            headers.clone(),
            Arc::new(DbStatusesStore::new(db.clone(), 0)),
            Arc::new(DbPruningStore::new(db, 0)),
            topology,
        );
        Fixture { _tmp: tmp, headers, validator }
    }

    #[test]
    fn test_header_in_isolation() {
        let validator = fixture(true).validator;

        let (a, b, c) = (Hash::from_u64_word(2), Hash::from_u64_word(3), Hash::from_u64_word(4));
        let check = |version: u16, parents: Vec<Hash>| {
            validator.validate_header_in_isolation(&header(version, parents))
        };
        assert_eq!(check(BLOCK_VERSION, vec![a, b]), Ok(()));
        assert_eq!(check(BLOCK_VERSION + 1, vec![a]), Err(RuleError::WrongBlockVersion(2, 1)));
        assert_eq!(check(BLOCK_VERSION, vec![]), Err(RuleError::NoParents));
        assert_eq!(check(BLOCK_VERSION, vec![a, b, c]), Err(RuleError::TooManyParents(3, 2)));
        assert_eq!(check(BLOCK_VERSION, vec![a, a]), Err(RuleError::DuplicateParent(a)));

        let mut data = GhostdagData::genesis();
        data.blue_score = 7;
        let h = header(BLOCK_VERSION, vec![a]);
        let in_context = |data: &GhostdagData, daa_score: u64, bits: u32| {
            validator.validate_header_in_context(&h, data, daa_score, bits)
        };
        assert_eq!(in_context(&data, 0, MAX_BITS), Err(RuleError::UnexpectedBlueScore(7, 0)));
        data.blue_score = 0;
        assert_eq!(in_context(&data, 3, MAX_BITS), Err(RuleError::UnexpectedDaaScore(3, 0)));
        assert_eq!(in_context(&data, 0, MAX_BITS), Ok(()));
        assert_eq!(
            in_context(&data, 0, 0x1f7fffff),
            Err(RuleError::UnexpectedDifficulty(0x1f7fffff, MAX_BITS))
        );
    }

    #[test]
    fn test_degenerate_bits_rejected() {
        let validator = fixture(true).validator;
        let parent = Hash::from_u64_word(2);
        for bits in [0, 0x01000001, 0x02000000, 0x04923456, 0x217fffff] {
            let h = header_with(BLOCK_VERSION, vec![parent], 1, bits, 0);
            assert_eq!(
                validator.validate_header_in_isolation(&h),
                Err(RuleError::InvalidDifficultyBits(bits)),
                "bits {bits:#x}"
            );
        }
        let harder = header_with(BLOCK_VERSION, vec![parent], 1, 0x1f7fffff, 0);
        assert_eq!(validator.validate_header_in_isolation(&harder), Ok(()));
    }

    #[test]
    fn test_proof_of_work() {
        let validator = fixture(false).validator;
        let parent = Hash::from_u64_word(2);
        // about half of all hashes meet the easiest target
        let (mut met, mut missed) = (None, None);
        for nonce in 0..64 {
            let h = header_with(BLOCK_VERSION, vec![parent], 1, MAX_BITS, nonce);
            if U256::from_big_endian(h.hash.as_bytes()) <= compact_to_target(MAX_BITS) {
                met.get_or_insert(h);
            } else {
                missed.get_or_insert(h);
            }
        }
        let (met, missed) = (met.unwrap(), missed.unwrap());
        assert_eq!(validator.check_pow(&met), Ok(()));
        assert_eq!(validator.check_pow(&missed), Err(RuleError::InvalidProofOfWork(missed.hash)));
        assert_eq!(fixture(true).validator.check_pow(&missed), Ok(()));
    }

    #[test]
    fn test_timestamp_rules() {
        let f = fixture(true);
        let now = 1_000_000;
        let parent = Hash::from_u64_word(2);
        let h = header_with(BLOCK_VERSION, vec![parent], now + 1000, MAX_BITS, 0);
        assert_eq!(f.validator.check_timestamp_in_isolation(&h, now), Ok(()));
        let h = header_with(BLOCK_VERSION, vec![parent], now + 1001, MAX_BITS, 0);
        assert_eq!(
            f.validator.check_timestamp_in_isolation(&h, now),
            Err(RuleError::TimeTooFarIntoTheFuture(now + 1001, now + 1000))
        );

        let mut area = StagingArea::new();
        let parents: Vec<Header> = [100, 300, 200]
            .iter()
            .map(|&ts| header_with(BLOCK_VERSION, vec![], ts, MAX_BITS, ts))
            .collect();
        for parent in parents.iter() {
            f.headers.insert_header(&mut area, Arc::new(parent.clone())).unwrap();
        }
        let hashes: Vec<Hash> = parents.iter().map(|p| p.hash).collect();
        let late = header_with(BLOCK_VERSION, hashes.clone(), 201, MAX_BITS, 0);
        assert!(f.validator.check_timestamp_against_parents(&area, &late).is_ok());
        let early = header_with(BLOCK_VERSION, hashes, 200, MAX_BITS, 0);
        assert!(matches!(
            f.validator.check_timestamp_against_parents(&area, &early),
            Err(crate::errors::ConsensusError::Rule(RuleError::TimeTooOld(200, 200)))
        ));
    }

    #[test]
    fn test_median_timestamp() {
        assert_eq!(median_timestamp(vec![]), 0);
        assert_eq!(median_timestamp(vec![5]), 5);
        assert_eq!(median_timestamp(vec![9, 1]), 9);
        assert_eq!(median_timestamp(vec![4, 1, 9]), 4);
    }
}
