#[cfg(test)]
mod integration_tests {
    use super::super::{DbGhostdagStore, GhostdagProtocol, GhostdagStore, GhostdagStoreReader};
    use crate::consensus::dag::{DagTopology, DbRelationsStore, RelationsStore};
    use crate::consensus::difficulty::calc_work;
    use crate::consensus::storage::block_store::{BlockHeaderStore, DbHeadersStore};
    use crate::consensus::storage::selected_chain::DbSelectedChainStore;
    use consensus_core::constants::BLOCK_VERSION;
    use consensus_core::ghostdag::{GhostdagData, GhostdagDataVariant};
    use consensus_core::header::Header;
    use consensus_core::{Hash, KType};
    use database::{Database, StagingArea};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use tempfile::TempDir;

    const BITS: u32 = 0x207fffff;

    /// Adds blocks straight into the stores, one commit per block
    struct DagBuilder {
        _tmp: TempDir,
        db: Arc<Database>,
        headers: Arc<DbHeadersStore>,
        relations: Arc<DbRelationsStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        protocol: GhostdagProtocol,
        counter: u64,
    }

    impl DagBuilder {
        fn new(k: KType) -> (Self, Hash) {
            let tmp = TempDir::new().unwrap();
            let db = Arc::new(Database::open(tmp.path()).unwrap());
            let headers = Arc::new(DbHeadersStore::new(db.clone(), 1000));
            let relations = Arc::new(DbRelationsStore::new(db.clone(), 1000));
            let ghostdag_store = Arc::new(DbGhostdagStore::new(db.clone(), 1000));
            let selected_chain = Arc::new(DbSelectedChainStore::new(db.clone(), 0));
            let topology =
                DagTopology::new(relations.clone(), ghostdag_store.clone(), selected_chain);
            let protocol = GhostdagProtocol::new(
                k,
                ghostdag_store.clone(),
                relations.clone(),
                headers.clone(),
                topology,
            );
            let mut builder =
                Self { _tmp: tmp, db, headers, relations, ghostdag_store, protocol, counter: 0 };
            let genesis = builder.store(vec![], Arc::new(GhostdagData::genesis()));
            (builder, genesis)
        }

        fn store(&mut self, parents: Vec<Hash>, data: Arc<GhostdagData>) -> Hash {
            self.counter += 1;
            let header = Header::new_finalized(
                BLOCK_VERSION,
                parents.clone(),
                Hash::from_u64_word(self.counter),
                self.counter,
                BITS,
                0,
                0,
                data.blue_work,
                data.blue_score,
            );
            let hash = header.hash;
            let mut area = StagingArea::new();
            self.headers.insert_header(&mut area, Arc::new(header)).unwrap();
            self.relations.insert(&mut area, hash, Arc::new(parents)).unwrap();
            self.ghostdag_store.insert(&mut area, hash, data, GhostdagDataVariant::Local).unwrap();
            area.commit(&self.db).unwrap();
            hash
        }

        fn add(&mut self, parents: &[Hash]) -> Hash {
            let data = self.protocol.ghostdag(&StagingArea::new(), parents).unwrap();
            self.store(parents.to_vec(), Arc::new(data))
        }

        fn data(&self, hash: Hash) -> Arc<GhostdagData> {
            self.ghostdag_store.get_data(&StagingArea::new(), hash).unwrap()
        }
    }

    #[test]
    fn test_chain_and_merge() {
        let (mut dag, genesis) = DagBuilder::new(18);
        let a = dag.add(&[genesis]);
        let b = dag.add(&[a]);
        let c = dag.add(&[genesis]);
        let merge = dag.add(&[b, c]);

        assert_eq!(dag.data(a).selected_parent, genesis);
        assert_eq!(dag.data(a).blue_score, 1);
        assert_eq!(dag.data(b).blue_score, 2);
        assert_eq!(dag.data(a).blue_work, calc_work(BITS));

        let merge_data = dag.data(merge);
        assert_eq!(merge_data.selected_parent, b);
        assert_eq!(merge_data.mergeset_blues, vec![b, c]);
        assert!(merge_data.mergeset_reds.is_empty());
        assert_eq!(merge_data.blue_score, 4);
        let area = StagingArea::new();
        let ordered = dag.protocol.consensus_ordered_mergeset(&area, &merge_data).unwrap();
        assert_eq!(ordered, vec![b, c]);
        let genesis_data = dag.data(genesis);
        assert!(dag.protocol.consensus_ordered_mergeset(&area, &genesis_data).unwrap().is_empty());
    }

    #[test]
    fn test_equal_work_tie_goes_to_smaller_hash() {
        for _ in 0..20 {
            let (mut dag, genesis) = DagBuilder::new(18);
            let a = dag.add(&[genesis]);
            let b = dag.add(&[genesis]);
            assert_eq!(dag.data(a).blue_work, dag.data(b).blue_work);

            let smaller = a.min(b);
            let area = StagingArea::new();
            assert_eq!(dag.protocol.find_selected_parent(&area, [a, b]).unwrap(), smaller);
            assert_eq!(dag.protocol.find_selected_parent(&area, [b, a]).unwrap(), smaller);
            let merge = dag.add(&[b, a]);
            assert_eq!(dag.data(merge).selected_parent, smaller);
            assert_eq!(dag.data(merge).mergeset_blues, vec![smaller, a.max(b)]);
        }
    }

    #[test]
    fn test_wide_anticone_turns_red() {
        let k = 2;
        let (mut dag, genesis) = DagBuilder::new(k);
        let siblings: Vec<Hash> = (0..5).map(|_| dag.add(&[genesis])).collect();
        let merge = dag.add(&siblings);
        let data = dag.data(merge);
        assert_eq!(data.mergeset_blues.len(), k as usize + 1);
        assert_eq!(data.mergeset_reds.len(), siblings.len() - (k as usize + 1));
        assert_eq!(data.blue_score, 1 + k as u64 + 1);
        // Reds and blues each ascend in consensus order
        let reds = data.mergeset_reds.iter().copied();
        let sorted = dag.protocol.sort_blocks(&StagingArea::new(), reds).unwrap();
        assert_eq!(sorted, data.mergeset_reds);
    }

    #[test]
    fn test_random_dag_blue_score_invariants() {
        let k = 4;
        let (mut dag, genesis) = DagBuilder::new(k);
        let mut rng = StdRng::seed_from_u64(42);
        let mut tips = vec![genesis];
        let mut blocks = vec![genesis];

        for _ in 0..150 {
            let count = rng.gen_range(1..=tips.len().min(4));
            let parents: Vec<Hash> = tips.choose_multiple(&mut rng, count).copied().collect();
            let block = dag.add(&parents);
            tips.retain(|tip| !parents.contains(tip));
            tips.push(block);
            blocks.push(block);
            // Occasionally fork off an older tip to keep the DAG wide
            if rng.gen_bool(0.3) {
                let parent = *blocks.choose(&mut rng).unwrap();
                // A tip merged this way would sit in the past of another tip
                if tips.contains(&parent) {
                    continue;
                }
                let fork = dag.add(&[parent]);
                tips.push(fork);
                blocks.push(fork);
            }
        }

        for &block in blocks.iter().skip(1) {
            let data = dag.data(block);
            let selected_parent = dag.data(data.selected_parent);
            let blues = data.mergeset_blues.len() as u64;
            assert_eq!(data.blue_score, selected_parent.blue_score + blues);
            assert!(data.blue_score > selected_parent.blue_score);
            assert!(data.blue_work > selected_parent.blue_work);
            assert!(data.mergeset_blues.len() <= k as usize + 1);
            assert_eq!(data.mergeset_blues[0], data.selected_parent);
        }

        // Blue score never decreases walking up any selected chain
        for &tip in tips.iter() {
            let mut current = tip;
            let mut last_score = u64::MAX;
            while current != genesis {
                let data = dag.data(current);
                assert!(data.blue_score <= last_score);
                last_score = data.blue_score;
                current = data.selected_parent;
            }
        }
    }
}
