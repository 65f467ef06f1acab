//! UTXO set storage
//!
//! Backs the virtual UTXO set, the pruning-point UTXO set and the staged
//! import bucket. Entries are keyed by the 36-byte outpoint encoding.

use consensus_core::tx::{TransactionId, TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::{UtxoDiff, UtxoView};
use database::{Database, DbBucket, DbError, DbResult, DbResultExt, StagedStore, StagingArea};
use std::sync::Arc;

pub const UTXO_KEY_SIZE: usize = 36;

/// Transaction id followed by the little-endian output index
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtxoKey([u8; UTXO_KEY_SIZE]);

impl UtxoKey {
    pub fn try_from_slice(bytes: &[u8]) -> DbResult<Self> {
        let array: [u8; UTXO_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| DbError::InvalidData(format!("utxo key of {} bytes", bytes.len())))?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for UtxoKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&TransactionOutpoint> for UtxoKey {
    fn from(outpoint: &TransactionOutpoint) -> Self {
        let mut bytes = [0u8; UTXO_KEY_SIZE];
        bytes[..32].copy_from_slice(outpoint.transaction_id.as_bytes());
        bytes[32..].copy_from_slice(&outpoint.index.to_le_bytes());
        Self(bytes)
    }
}

impl From<UtxoKey> for TransactionOutpoint {
    fn from(key: UtxoKey) -> Self {
        let mut id = [0u8; 32];
        id.copy_from_slice(&key.0[..32]);
        let mut index = [0u8; 4];
        index.copy_from_slice(&key.0[32..]);
        TransactionOutpoint::new(TransactionId::from_bytes(id), u32::from_le_bytes(index))
    }
}

pub trait UtxoSetStoreReader {
    fn get(
        &self,
        area: &StagingArea,
        outpoint: &TransactionOutpoint,
    ) -> DbResult<Option<UtxoEntry>>;

    /// Committed entries in key order, starting after `after`
    fn iterate(
        &self,
        after: Option<&TransactionOutpoint>,
        limit: usize,
    ) -> DbResult<Vec<(TransactionOutpoint, UtxoEntry)>>;
}

pub trait UtxoSetStore: UtxoSetStoreReader {
    fn stage_diff(&self, area: &mut StagingArea, diff: &UtxoDiff) -> DbResult<()>;

    fn stage_entries(
        &self,
        area: &mut StagingArea,
        entries: &[(TransactionOutpoint, UtxoEntry)],
    ) -> DbResult<()>;
}

pub struct DbUtxoSetStore {
    access: StagedStore<UtxoKey, UtxoEntry>,
}

/// Page size used when a whole set has to be walked
pub const ITERATION_PAGE: usize = 10_000;

impl DbUtxoSetStore {
    pub fn new(db: Arc<Database>, bucket: DbBucket, cache_size: usize, preallocate: bool) -> Self {
        Self { access: StagedStore::new(db, bucket, cache_size, preallocate) }
    }

    /// A [`UtxoView`] of this set as seen through `area`
    pub fn view<'a>(&'a self, area: &'a StagingArea) -> StagedUtxoView<'a> {
        StagedUtxoView { store: self, area }
    }

    /// Walks the whole committed set page by page
    pub fn for_each_committed(
        &self,
        mut f: impl FnMut(TransactionOutpoint, UtxoEntry) -> DbResult<()>,
    ) -> DbResult<()> {
        let mut after = None;
        loop {
            let page = self.iterate(after.as_ref(), ITERATION_PAGE)?;
            let Some((last, _)) = page.last() else { return Ok(()) };
            after = Some(*last);
            let done = page.len() < ITERATION_PAGE;
            for (outpoint, entry) in page {
                f(outpoint, entry)?;
            }
            if done {
                return Ok(());
            }
        }
    }

    /// Deletes the committed set `page_size` entries at a time, handing each page to `commit`.
    /// Returns how many entries were deleted.
    pub fn clear_committed(
        &self,
        page_size: usize,
        mut commit: impl FnMut(StagingArea) -> DbResult<()>,
    ) -> DbResult<usize> {
        let mut cleared = 0;
        loop {
            let page = self.iterate(None, page_size)?;
            if page.is_empty() {
                return Ok(cleared);
            }
            let mut area = StagingArea::new();
            for (outpoint, _) in page.iter() {
                self.access.stage_delete(&mut area, outpoint.into())?;
            }
            cleared += page.len();
            commit(area)?;
        }
    }

    /// Copies the committed set into each of `targets`, `page_size` entries per commit.
    /// Returns how many entries were copied.
    pub fn copy_committed_into(
        &self,
        targets: &[&DbUtxoSetStore],
        page_size: usize,
        mut commit: impl FnMut(StagingArea) -> DbResult<()>,
    ) -> DbResult<usize> {
        let mut after = None;
        let mut copied = 0;
        loop {
            let page = self.iterate(after.as_ref(), page_size)?;
            let Some(&(last, _)) = page.last() else { return Ok(copied) };
            after = Some(last);
            let mut area = StagingArea::new();
            for target in targets {
                target.stage_entries(&mut area, &page)?;
            }
            copied += page.len();
            commit(area)?;
            if page.len() < page_size {
                return Ok(copied);
            }
        }
    }
}

impl UtxoSetStoreReader for DbUtxoSetStore {
    fn get(
        &self,
        area: &StagingArea,
        outpoint: &TransactionOutpoint,
    ) -> DbResult<Option<UtxoEntry>> {
        self.access.get(area, &outpoint.into()).optional()
    }

    fn iterate(
        &self,
        after: Option<&TransactionOutpoint>,
        limit: usize,
    ) -> DbResult<Vec<(TransactionOutpoint, UtxoEntry)>> {
        let after = after.map(UtxoKey::from);
        self.access
            .iter_committed(after.as_ref().map(|k| k.as_ref()), limit)?
            .into_iter()
            .map(|(key, entry)| -> DbResult<(TransactionOutpoint, UtxoEntry)> {
                Ok((UtxoKey::try_from_slice(&key)?.into(), entry))
            })
            .collect()
    }
}

impl UtxoSetStore for DbUtxoSetStore {
    fn stage_diff(&self, area: &mut StagingArea, diff: &UtxoDiff) -> DbResult<()> {
        for outpoint in diff.remove.keys() {
            self.access.stage_delete(area, outpoint.into())?;
        }
        for (outpoint, entry) in diff.add.iter() {
            self.access.stage(area, outpoint.into(), entry.clone())?;
        }
        Ok(())
    }

    fn stage_entries(
        &self,
        area: &mut StagingArea,
        entries: &[(TransactionOutpoint, UtxoEntry)],
    ) -> DbResult<()> {
        for (outpoint, entry) in entries {
            self.access.stage(area, outpoint.into(), entry.clone())?;
        }
        Ok(())
    }
}

/// Reads a UTXO set through a staging area
pub struct StagedUtxoView<'a> {
    store: &'a DbUtxoSetStore,
    area: &'a StagingArea,
}

impl UtxoView for StagedUtxoView<'_> {
    type Error = DbError;

    fn get(&self, outpoint: &TransactionOutpoint) -> Result<Option<UtxoEntry>, Self::Error> {
        UtxoSetStoreReader::get(self.store, self.area, outpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::tx::ScriptPublicKey;
    use database::db::CF_CONSENSUS_STATE;
    use tempfile::TempDir;

    fn op(i: u64, index: u32) -> TransactionOutpoint {
        TransactionOutpoint::new(TransactionId::from_u64_word(i), index)
    }

    fn entry(amount: u64) -> UtxoEntry {
        UtxoEntry::new(amount, ScriptPublicKey::default(), 0, false)
    }

    fn store(db: &Arc<Database>, name: &[u8], cache_size: usize) -> DbUtxoSetStore {
        DbUtxoSetStore::new(db.clone(), DbBucket::new(CF_CONSENSUS_STATE, name), cache_size, false)
    }

    #[test]
    fn test_key_roundtrip() {
        let outpoint = op(77, 0x01020304);
        let key = UtxoKey::from(&outpoint);
        assert_eq!(&key.as_ref()[32..], &[4, 3, 2, 1]);
        let decoded = UtxoKey::try_from_slice(key.as_ref()).unwrap();
        assert_eq!(TransactionOutpoint::from(decoded), outpoint);
        assert!(UtxoKey::try_from_slice(&[0; 35]).is_err());
    }

    #[test]
    fn test_diff_replacement() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let store = store(&db, b"utxos", 16);

        let mut area = StagingArea::new();
        store.stage_entries(&mut area, &[(op(1, 0), entry(10)), (op(2, 0), entry(20))]).unwrap();
        area.commit(&db).unwrap();

        let mut diff = UtxoDiff::new();
        diff.remove_entry(op(1, 0), entry(10)).unwrap();
        diff.add_entry(op(1, 0), entry(11)).unwrap();
        diff.remove_entry(op(2, 0), entry(20)).unwrap();
        let mut area = StagingArea::new();
        store.stage_diff(&mut area, &diff).unwrap();
        assert_eq!(store.view(&area).get(&op(1, 0)).unwrap(), Some(entry(11)));
        area.commit(&db).unwrap();

        let all = store.iterate(None, 10).unwrap();
        assert_eq!(all, vec![(op(1, 0), entry(11))]);
    }

    #[test]
    fn test_paged_copy_and_clear() {
        let tmp = TempDir::new().unwrap();
        let db = Arc::new(Database::open(tmp.path()).unwrap());
        let source = store(&db, b"source", 0);
        let first = store(&db, b"first", 16);
        let second = store(&db, b"second", 16);

        let entries: Vec<_> = (1..=5).map(|i| (op(i, 0), entry(i))).collect();
        let mut area = StagingArea::new();
        source.stage_entries(&mut area, &entries).unwrap();
        first.stage_entries(&mut area, &[(op(9, 0), entry(9))]).unwrap();
        area.commit(&db).unwrap();

        let mut commits = 0;
        let mut commit = |area: StagingArea| {
            commits += 1;
            area.commit(&db)
        };
        assert_eq!(first.clear_committed(2, &mut commit).unwrap(), 1);
        assert_eq!(source.copy_committed_into(&[&first, &second], 2, &mut commit).unwrap(), 5);
        assert_eq!(source.clear_committed(2, &mut commit).unwrap(), 5);
        // one page for the stale entry, three for the copy and three for the clear
        assert_eq!(commits, 7);

        assert_eq!(first.iterate(None, 10).unwrap(), entries);
        assert_eq!(second.iterate(None, 10).unwrap(), entries);
        assert!(source.iterate(None, 10).unwrap().is_empty());
    }
}
