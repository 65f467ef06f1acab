use crate::errors::{DbError, DbResult};
use crate::key::{DbBucket, DbKey};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const CF_HEADERS: &str = "headers";
pub const CF_BLOCKS: &str = "blocks";
pub const CF_BLOCK_RELATIONS: &str = "block_relations";
pub const CF_GHOSTDAG: &str = "ghostdag";
pub const CF_STATUSES: &str = "statuses";
pub const CF_DAA: &str = "daa";
pub const CF_ACCEPTANCE_DATA: &str = "acceptance_data";
pub const CF_UTXO_DIFFS: &str = "utxo_diffs";
pub const CF_CONSENSUS_STATE: &str = "consensus_state";
pub const CF_PRUNING: &str = "pruning";

pub const ALL_COLUMN_FAMILIES: [&str; 10] = [
    CF_HEADERS,
    CF_BLOCKS,
    CF_BLOCK_RELATIONS,
    CF_GHOSTDAG,
    CF_STATUSES,
    CF_DAA,
    CF_ACCEPTANCE_DATA,
    CF_UTXO_DIFFS,
    CF_CONSENSUS_STATE,
    CF_PRUNING,
];

/// Shared handle to the RocksDB instance. Cloning is cheap and clones share the closed flag.
#[derive(Clone)]
pub struct Database {
    db: Arc<DB>,
    is_closed: Arc<RwLock<bool>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(10000);
        opts.set_keep_log_file_num(10);
        opts.set_max_background_jobs(4);
        opts.set_bytes_per_sync(1048576);
        opts.increase_parallelism(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);

        let cf_descriptors: Vec<_> = ALL_COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)?;
        debug!(path = %path.as_ref().display(), "opened consensus database");
        Ok(Self { db: Arc::new(db), is_closed: Arc::new(RwLock::new(false)) })
    }

    fn check_closed(&self) -> DbResult<()> {
        if *self.is_closed.read() {
            return Err(DbError::DatabaseClosed);
        }
        Ok(())
    }

    fn cf_handle(&self, cf_name: &str) -> DbResult<&rocksdb::ColumnFamily> {
        self.db.cf_handle(cf_name).ok_or_else(|| DbError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    pub fn get(&self, key: &DbKey) -> DbResult<Option<Vec<u8>>> {
        self.check_closed()?;
        let cf = self.cf_handle(key.cf())?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    pub fn has(&self, key: &DbKey) -> DbResult<bool> {
        self.check_closed()?;
        let cf = self.cf_handle(key.cf())?;
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }

    /// Returns up to `limit` `(suffix, value)` pairs of `bucket` in key order.
    /// With `after` set, iteration starts right after that suffix.
    pub fn iter_bucket(
        &self,
        bucket: &DbBucket,
        after: Option<&[u8]>,
        limit: usize,
    ) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_closed()?;
        let cf = self.cf_handle(bucket.cf())?;
        let start = match after {
            Some(suffix) => bucket.key(suffix).as_bytes().to_vec(),
            None => bucket.prefix().to_vec(),
        };
        let prefix_len = bucket.prefix().len();
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(&start, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(bucket.prefix()) || out.len() >= limit {
                break;
            }
            if after.is_some() && *key == *start {
                continue;
            }
            out.push((key[prefix_len..].to_vec(), value.into_vec()));
        }
        Ok(out)
    }

    pub fn begin_transaction(&self) -> DbTransaction<'_> {
        DbTransaction { db: self, batch: WriteBatch::default() }
    }

    /// Marks the database closed. Every later read or write fails with [`DbError::DatabaseClosed`].
    pub fn close(&self) {
        *self.is_closed.write() = true;
    }

    /// The full ordered content of every column family
    pub fn dump(&self) -> DbResult<Vec<(&'static str, Vec<u8>, Vec<u8>)>> {
        self.check_closed()?;
        let mut out = Vec::new();
        for cf_name in ALL_COLUMN_FAMILIES {
            let cf = self.cf_handle(cf_name)?;
            for item in self.db.iterator_cf(cf, IteratorMode::Start) {
                let (key, value) = item?;
                out.push((cf_name, key.into_vec(), value.into_vec()));
            }
        }
        Ok(out)
    }

    pub fn stats(&self) -> String {
        self.db.property_value("rocksdb.stats").ok().flatten().unwrap_or_default()
    }
}

/// A batch of writes applied atomically by [`DbTransaction::commit`].
/// Dropping it discards the writes.
pub struct DbTransaction<'a> {
    db: &'a Database,
    batch: WriteBatch,
}

impl DbTransaction<'_> {
    pub fn put(&mut self, key: &DbKey, value: &[u8]) -> DbResult<()> {
        let cf = self.db.cf_handle(key.cf())?;
        self.batch.put_cf(cf, key.as_bytes(), value);
        Ok(())
    }

    pub fn delete(&mut self, key: &DbKey) -> DbResult<()> {
        let cf = self.db.cf_handle(key.cf())?;
        self.batch.delete_cf(cf, key.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn commit(self) -> DbResult<()> {
        self.db.check_closed()?;
        self.db.db.write(self.batch)?;
        Ok(())
    }
}
