//! Index of the virtual's selected chain
//!
//! Chain blocks are numbered upwards from the history root. A reorg drops the
//! indices above the split and numbers the new chain from there.

use consensus_core::Hash;
use database::db::CF_CONSENSUS_STATE;
use database::{Database, DbBucket, DbResult, DbResultExt, StagedItem, StagedStore, StagingArea};
use std::sync::Arc;

/// Big-endian so the chain iterates in index order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct IndexKey([u8; 8]);

impl From<u64> for IndexKey {
    fn from(index: u64) -> Self {
        Self(index.to_be_bytes())
    }
}

impl AsRef<[u8]> for IndexKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub trait SelectedChainStoreReader {
    fn get_by_hash(&self, area: &StagingArea, hash: Hash) -> DbResult<u64>;
    fn get_by_index(&self, area: &StagingArea, index: u64) -> DbResult<Hash>;

    /// Index and hash of the sink
    fn get_tip(&self, area: &StagingArea) -> DbResult<(u64, Hash)>;
}

pub trait SelectedChainStore: SelectedChainStoreReader {
    /// Drops every index above `split_index` and appends `added`, lowest first
    fn apply_changes(
        &self,
        area: &mut StagingArea,
        split_index: u64,
        added: &[Hash],
    ) -> DbResult<()>;

    /// Drops the whole index and starts a new one at `root`
    fn init_with(&self, area: &mut StagingArea, root: Hash) -> DbResult<()>;

    /// Forgets the chain blocks below `index`, down to the first one already gone
    fn prune_below(&self, area: &mut StagingArea, index: u64) -> DbResult<()>;
}

pub struct DbSelectedChainStore {
    hashes: StagedStore<IndexKey, Hash>,
    indices: StagedStore<Hash, u64>,
    tip: StagedItem<(u64, Hash)>,
}

impl DbSelectedChainStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let root = DbBucket::root(CF_CONSENSUS_STATE);
        Self {
            hashes: StagedStore::new(
                db.clone(),
                root.bucket(b"selected-chain-hashes"),
                cache_size,
                false,
            ),
            indices: StagedStore::new(
                db.clone(),
                root.bucket(b"selected-chain-indices"),
                cache_size,
                false,
            ),
            tip: StagedItem::new(db, root.item(b"selected-chain-tip")),
        }
    }

    fn remove(&self, area: &mut StagingArea, index: u64) -> DbResult<bool> {
        let Some(hash) = self.hashes.get(area, &index.into()).optional()? else { return Ok(false) };
        self.hashes.stage_delete(area, index.into())?;
        self.indices.stage_delete(area, hash)?;
        Ok(true)
    }
}

impl SelectedChainStoreReader for DbSelectedChainStore {
    fn get_by_hash(&self, area: &StagingArea, hash: Hash) -> DbResult<u64> {
        self.indices.get(area, &hash)
    }

    fn get_by_index(&self, area: &StagingArea, index: u64) -> DbResult<Hash> {
        self.hashes.get(area, &index.into())
    }

    fn get_tip(&self, area: &StagingArea) -> DbResult<(u64, Hash)> {
        self.tip.get(area)
    }
}

impl SelectedChainStore for DbSelectedChainStore {
    fn apply_changes(
        &self,
        area: &mut StagingArea,
        split_index: u64,
        added: &[Hash],
    ) -> DbResult<()> {
        let (tip_index, tip_hash) = self.get_tip(area)?;
        for index in (split_index + 1..=tip_index).rev() {
            self.remove(area, index)?;
        }
        let mut tip = (split_index, self.get_by_index(area, split_index)?);
        for &hash in added {
            tip = (tip.0 + 1, hash);
            self.hashes.stage(area, tip.0.into(), hash)?;
            self.indices.stage(area, hash, tip.0)?;
        }
        if tip != (tip_index, tip_hash) {
            self.tip.stage(area, tip)?;
        }
        Ok(())
    }

    fn init_with(&self, area: &mut StagingArea, root: Hash) -> DbResult<()> {
        if let Some((tip_index, _)) = self.tip.get(area).optional()? {
            for index in (0..=tip_index).rev() {
                if !self.remove(area, index)? {
                    break;
                }
            }
        }
        self.hashes.stage(area, 0.into(), root)?;
        self.indices.stage(area, root, 0)?;
        self.tip.stage(area, (0, root))
    }

    fn prune_below(&self, area: &mut StagingArea, index: u64) -> DbResult<()> {
        for index in (0..index).rev() {
            if !self.remove(area, index)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn h(i: u64) -> Hash {
        Hash::from_u64_word(i)
    }

    #[test]
    fn test_reorg_renumbers_above_split() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = DbSelectedChainStore::new(db.clone(), 16);

        let mut area = StagingArea::new();
        store.init_with(&mut area, h(1)).unwrap();
        store.apply_changes(&mut area, 0, &[h(2), h(3), h(4)]).unwrap();
        area.commit(&db).unwrap();
        let area = StagingArea::new();
        assert_eq!(store.get_tip(&area).unwrap(), (3, h(4)));
        assert_eq!(store.get_by_hash(&area, h(3)).unwrap(), 2);

        let mut area = StagingArea::new();
        store.apply_changes(&mut area, 1, &[h(13), h(14), h(15)]).unwrap();
        assert_eq!(store.get_tip(&area).unwrap(), (4, h(15)));
        assert_eq!(store.get_by_index(&area, 2).unwrap(), h(13));
        assert!(store.get_by_hash(&area, h(3)).unwrap_err().is_not_found());
        assert!(store.get_by_hash(&area, h(4)).unwrap_err().is_not_found());
        assert_eq!(store.get_by_hash(&area, h(2)).unwrap(), 1);
    }

    #[test]
    fn test_pruning_and_reinit() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = DbSelectedChainStore::new(db.clone(), 16);

        let mut area = StagingArea::new();
        store.init_with(&mut area, h(1)).unwrap();
        store.apply_changes(&mut area, 0, &[h(2), h(3), h(4)]).unwrap();
        store.prune_below(&mut area, 2).unwrap();
        area.commit(&db).unwrap();
        let area = StagingArea::new();
        assert!(store.get_by_hash(&area, h(1)).unwrap_err().is_not_found());
        assert!(store.get_by_index(&area, 1).unwrap_err().is_not_found());
        assert_eq!(store.get_by_index(&area, 2).unwrap(), h(3));

        let mut area = StagingArea::new();
        store.init_with(&mut area, h(9)).unwrap();
        area.commit(&db).unwrap();
        let area = StagingArea::new();
        assert_eq!(store.get_tip(&area).unwrap(), (0, h(9)));
        assert!(store.get_by_hash(&area, h(4)).unwrap_err().is_not_found());
        assert!(store.get_by_hash(&area, h(3)).unwrap_err().is_not_found());
    }
}
