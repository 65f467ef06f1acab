//! GHOSTDAG data storage
//!
//! Each block may carry two copies: `Local`, computed by this node, and
//! `Trusted`, received with a pruning-point proof. Plain reads prefer the local copy.

use consensus_core::ghostdag::{CompactGhostdagData, GhostdagData, GhostdagDataVariant};
use consensus_core::{BlueWorkType, Hash};
use database::db::CF_GHOSTDAG;
use database::{Database, DbBucket, DbError, DbResult, StagedStore, StagingArea};
use std::sync::Arc;

pub trait GhostdagStoreReader {
    fn get_data_variant(
        &self,
        area: &StagingArea,
        hash: Hash,
        variant: GhostdagDataVariant,
    ) -> DbResult<Arc<GhostdagData>>;

    /// Local data, falling back to trusted data
    fn get_data(&self, area: &StagingArea, hash: Hash) -> DbResult<Arc<GhostdagData>> {
        match self.get_data_variant(area, hash, GhostdagDataVariant::Local) {
            Err(DbError::NotFound(_)) => {
                self.get_data_variant(area, hash, GhostdagDataVariant::Trusted)
            }
            result => result,
        }
    }

    fn get_compact_data(&self, area: &StagingArea, hash: Hash) -> DbResult<CompactGhostdagData> {
        Ok(self.get_data(area, hash)?.to_compact())
    }

    fn get_blue_work(&self, area: &StagingArea, hash: Hash) -> DbResult<BlueWorkType> {
        Ok(self.get_data(area, hash)?.blue_work)
    }

    fn get_blue_score(&self, area: &StagingArea, hash: Hash) -> DbResult<u64> {
        Ok(self.get_data(area, hash)?.blue_score)
    }

    fn get_selected_parent(&self, area: &StagingArea, hash: Hash) -> DbResult<Hash> {
        Ok(self.get_data(area, hash)?.selected_parent)
    }

    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool>;
}

pub trait GhostdagStore: GhostdagStoreReader {
    fn insert(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        data: Arc<GhostdagData>,
        variant: GhostdagDataVariant,
    ) -> DbResult<()>;

    /// Deletes both variants
    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbGhostdagStore {
    local: StagedStore<Hash, Arc<GhostdagData>>,
    trusted: StagedStore<Hash, Arc<GhostdagData>>,
}

impl DbGhostdagStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let local = DbBucket::new(CF_GHOSTDAG, b"local");
        let trusted = DbBucket::new(CF_GHOSTDAG, b"trusted");
        Self {
            local: StagedStore::new(db.clone(), local, cache_size, false),
            trusted: StagedStore::new(db, trusted, cache_size / 10, false),
        }
    }

    fn access(&self, variant: GhostdagDataVariant) -> &StagedStore<Hash, Arc<GhostdagData>> {
        match variant {
            GhostdagDataVariant::Local => &self.local,
            GhostdagDataVariant::Trusted => &self.trusted,
        }
    }
}

impl GhostdagStoreReader for DbGhostdagStore {
    fn get_data_variant(
        &self,
        area: &StagingArea,
        hash: Hash,
        variant: GhostdagDataVariant,
    ) -> DbResult<Arc<GhostdagData>> {
        self.access(variant).get(area, &hash)
    }

    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool> {
        Ok(self.local.has(area, &hash)? || self.trusted.has(area, &hash)?)
    }
}

impl GhostdagStore for DbGhostdagStore {
    fn insert(
        &self,
        area: &mut StagingArea,
        hash: Hash,
        data: Arc<GhostdagData>,
        variant: GhostdagDataVariant,
    ) -> DbResult<()> {
        self.access(variant).stage(area, hash, data)
    }

    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.local.stage_delete(area, hash)?;
        self.trusted.stage_delete(area, hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_preferred_over_trusted() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = DbGhostdagStore::new(db.clone(), 16);
        let hash = Hash::from_u64_word(5);
        let mut trusted = GhostdagData::genesis();
        trusted.blue_score = 7;
        let mut local = GhostdagData::genesis();
        local.blue_score = 8;

        let mut area = StagingArea::new();
        store.insert(&mut area, hash, Arc::new(trusted), GhostdagDataVariant::Trusted).unwrap();
        assert_eq!(store.get_blue_score(&area, hash).unwrap(), 7);
        store.insert(&mut area, hash, Arc::new(local), GhostdagDataVariant::Local).unwrap();
        area.commit(&db).unwrap();

        let area = StagingArea::new();
        assert_eq!(store.get_blue_score(&area, hash).unwrap(), 8);
        let trusted = store.get_data_variant(&area, hash, GhostdagDataVariant::Trusted).unwrap();
        assert_eq!(trusted.blue_score, 7);
        assert!(store.get_data(&area, Hash::from_u64_word(6)).unwrap_err().is_not_found());
    }
}
