//! Ancestry queries over the block DAG
//!
//! Blue work never decreases along a parent edge, so a search from `b` towards
//! `a` can drop any block whose blue work is below `a`'s. Equal work is kept:
//! a zero-work block leaves its parent's blue work unchanged.
//!
//! Chain ancestry is answered from the selected chain index once a walk
//! reaches an indexed block.

use super::relations::{DbRelationsStore, RelationsStoreReader};
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStoreReader};
use crate::consensus::storage::selected_chain::{DbSelectedChainStore, SelectedChainStoreReader};
use consensus_core::blockhash::BlockHashExtensions;
use consensus_core::Hash;
use database::{DbResult, DbResultExt, StagingArea};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Clone)]
pub struct DagTopology {
    relations: Arc<DbRelationsStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    selected_chain: Arc<DbSelectedChainStore>,
}

impl DagTopology {
    pub fn new(
        relations: Arc<DbRelationsStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        selected_chain: Arc<DbSelectedChainStore>,
    ) -> Self {
        Self { relations, ghostdag_store, selected_chain }
    }

    /// True if `a` is in the past of `b` or equals it
    pub fn is_dag_ancestor_of(&self, area: &StagingArea, a: Hash, b: Hash) -> DbResult<bool> {
        if a == b {
            return Ok(true);
        }
        if a.is_sentinel() || b.is_sentinel() {
            return Ok(false);
        }
        let a_work = self.ghostdag_store.get_blue_work(area, a)?;
        if self.ghostdag_store.get_blue_work(area, b)? < a_work {
            return Ok(false);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(current) = queue.pop_front() {
            // Relations of blocks imported without their past may be missing
            let Some(parents) = self.relations.get_parents(area, current).optional()? else {
                continue;
            };
            for &parent in parents.iter() {
                if parent == a {
                    return Ok(true);
                }
                if !visited.insert(parent) {
                    continue;
                }
                match self.ghostdag_store.get_blue_work(area, parent).optional()? {
                    Some(work) if work >= a_work => queue.push_back(parent),
                    _ => {}
                }
            }
        }
        Ok(false)
    }

    pub fn is_dag_ancestor_of_any(
        &self,
        area: &StagingArea,
        a: Hash,
        blocks: impl IntoIterator<Item = Hash>,
    ) -> DbResult<bool> {
        for b in blocks {
            if self.is_dag_ancestor_of(area, a, b)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if `a` is on the selected-parent chain of `b`, `b` included
    pub fn is_chain_ancestor_of(&self, area: &StagingArea, a: Hash, b: Hash) -> DbResult<bool> {
        if a == b {
            return Ok(true);
        }
        let a_index = self.selected_chain.get_by_hash(area, a).optional()?;
        let a_score = self.ghostdag_store.get_blue_score(area, a)?;
        let mut current = b;
        loop {
            if current == a {
                return Ok(true);
            }
            if current.is_sentinel() {
                return Ok(false);
            }
            if let Some(a_index) = a_index {
                if let Some(index) = self.selected_chain.get_by_hash(area, current).optional()? {
                    return Ok(a_index <= index);
                }
            }
            let data = self.ghostdag_store.get_compact_data(area, current)?;
            if data.blue_score < a_score {
                return Ok(false);
            }
            current = data.selected_parent;
        }
    }

    /// Hashes from `high` down its selected chain to `low` exclusive, highest first.
    /// `low` must be a chain ancestor of `high`.
    pub fn chain_down_to(&self, area: &StagingArea, high: Hash, low: Hash) -> DbResult<Vec<Hash>> {
        let mut chain = Vec::new();
        let mut current = high;
        while current != low {
            if current.is_sentinel() {
                let msg = format!("{low} is not a chain ancestor of {high}");
                return Err(database::DbError::InvalidData(msg));
            }
            chain.push(current);
            current = self.ghostdag_store.get_selected_parent(area, current)?;
        }
        Ok(chain)
    }

    /// The latest block on the chains of both `a` and `b`
    pub fn find_common_chain_ancestor(
        &self,
        area: &StagingArea,
        a: Hash,
        b: Hash,
    ) -> DbResult<Hash> {
        let mut a = self.ghostdag_store.get_compact_data(area, a).map(|d| (a, d))?;
        let mut b = self.ghostdag_store.get_compact_data(area, b).map(|d| (b, d))?;
        while a.0 != b.0 {
            // blue score breaks blue work ties, it strictly grows along the chain
            let step_a = (a.1.blue_work, a.1.blue_score) >= (b.1.blue_work, b.1.blue_score);
            let next = if step_a { a.1.selected_parent } else { b.1.selected_parent };
            if next.is_sentinel() {
                let msg = format!("chains of {} and {} do not meet", a.0, b.0);
                return Err(database::DbError::InvalidData(msg));
            }
            let data = self.ghostdag_store.get_compact_data(area, next)?;
            if step_a {
                a = (next, data);
            } else {
                b = (next, data);
            }
        }
        Ok(a.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::dag::relations::RelationsStore;
    use crate::consensus::ghostdag::stores::GhostdagStore;
    use crate::consensus::storage::selected_chain::SelectedChainStore;
    use consensus_core::blockhash::VIRTUAL_GENESIS;
    use consensus_core::ghostdag::{GhostdagData, GhostdagDataVariant};
    use consensus_core::BlueWorkType;
    use database::Database;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn h(i: u64) -> Hash {
        Hash::from_u64_word(i)
    }

    struct Dag {
        _tmp: TempDir,
        relations: Arc<DbRelationsStore>,
        ghostdag: Arc<DbGhostdagStore>,
        selected_chain: Arc<DbSelectedChainStore>,
        area: StagingArea,
    }

    impl Dag {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let db = Arc::new(Database::open(tmp.path()).unwrap());
            let relations = Arc::new(DbRelationsStore::new(db.clone(), 16));
            let ghostdag = Arc::new(DbGhostdagStore::new(db.clone(), 16));
            let selected_chain = Arc::new(DbSelectedChainStore::new(db, 16));
            Self { _tmp: tmp, relations, ghostdag, selected_chain, area: StagingArea::new() }
        }

        fn add(&mut self, hash: Hash, parents: &[Hash], score: u64, work: u64) {
            let selected_parent = parents.first().copied().unwrap_or(VIRTUAL_GENESIS);
            let data = GhostdagData::new(
                score,
                BlueWorkType::from(work),
                selected_parent,
                parents.to_vec(),
                vec![],
                HashMap::new(),
            );
            let area = &mut self.area;
            self.relations.insert(area, hash, Arc::new(parents.to_vec())).unwrap();
            self.ghostdag.insert(area, hash, Arc::new(data), GhostdagDataVariant::Local).unwrap();
        }

        fn topology(&self) -> DagTopology {
            DagTopology::new(
                self.relations.clone(),
                self.ghostdag.clone(),
                self.selected_chain.clone(),
            )
        }

        fn index_chain(&mut self, chain: &[Hash]) {
            self.selected_chain.init_with(&mut self.area, chain[0]).unwrap();
            self.selected_chain.apply_changes(&mut self.area, 0, &chain[1..]).unwrap();
        }
    }

    #[test]
    fn test_ancestry_through_equal_blue_work() {
        // 2 and 3 add no work on top of 1, 4 adds some
        let mut dag = Dag::new();
        dag.add(h(1), &[], 0, 5);
        dag.add(h(2), &[h(1)], 1, 5);
        dag.add(h(3), &[h(2)], 2, 5);
        dag.add(h(4), &[h(3)], 3, 9);
        dag.add(h(5), &[h(1)], 1, 5);
        let topology = dag.topology();

        assert!(topology.is_dag_ancestor_of(&dag.area, h(2), h(3)).unwrap());
        assert!(topology.is_dag_ancestor_of(&dag.area, h(1), h(3)).unwrap());
        assert!(topology.is_dag_ancestor_of(&dag.area, h(2), h(4)).unwrap());
        assert!(!topology.is_dag_ancestor_of(&dag.area, h(3), h(2)).unwrap());
        assert!(!topology.is_dag_ancestor_of(&dag.area, h(5), h(3)).unwrap());
        assert!(!topology.is_dag_ancestor_of(&dag.area, h(4), h(3)).unwrap());
    }

    #[test]
    fn test_common_chain_ancestor_with_equal_blue_work() {
        let mut dag = Dag::new();
        dag.add(h(1), &[], 0, 5);
        dag.add(h(2), &[h(1)], 1, 5);
        dag.add(h(3), &[h(2)], 2, 5);
        dag.add(h(5), &[h(1)], 1, 5);
        let topology = dag.topology();

        assert_eq!(topology.find_common_chain_ancestor(&dag.area, h(2), h(3)).unwrap(), h(2));
        assert_eq!(topology.find_common_chain_ancestor(&dag.area, h(3), h(2)).unwrap(), h(2));
        assert_eq!(topology.find_common_chain_ancestor(&dag.area, h(3), h(5)).unwrap(), h(1));
        assert!(topology.is_chain_ancestor_of(&dag.area, h(1), h(3)).unwrap());
    }

    #[test]
    fn test_chain_ancestry_from_the_index() {
        // 2 and 3 are indexed but their GHOSTDAG data is gone, 6 hangs off the chain at 4
        let mut dag = Dag::new();
        dag.add(h(1), &[], 0, 5);
        dag.add(h(4), &[h(3)], 3, 9);
        dag.add(h(6), &[h(4)], 4, 10);
        dag.add(h(7), &[h(1)], 1, 6);
        dag.index_chain(&[h(1), h(2), h(3), h(4)]);
        let topology = dag.topology();

        assert!(topology.is_chain_ancestor_of(&dag.area, h(1), h(4)).unwrap());
        assert!(topology.is_chain_ancestor_of(&dag.area, h(1), h(6)).unwrap());
        assert!(!topology.is_chain_ancestor_of(&dag.area, h(4), h(1)).unwrap());
        assert!(!topology.is_chain_ancestor_of(&dag.area, h(4), h(7)).unwrap());
    }
}
