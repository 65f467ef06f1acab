//! Parent and child relations of every known block

use consensus_core::{BlockHashes, Hash};
use database::db::CF_BLOCK_RELATIONS;
use database::{Database, DbBucket, DbResult, DbResultExt, StagedStore, StagingArea};
use std::sync::Arc;

pub trait RelationsStoreReader {
    fn get_parents(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockHashes>;

    /// Empty when the block has no children yet
    fn get_children(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockHashes>;

    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool>;
}

pub trait RelationsStore: RelationsStoreReader {
    /// Stages the parents of a new block and appends it to each known parent's children.
    /// Parents are immutable once staged.
    fn insert(&self, area: &mut StagingArea, hash: Hash, parents: BlockHashes) -> DbResult<()>;

    /// Drops the parents and children of a block whose parents are all gone already
    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()>;
}

pub struct DbRelationsStore {
    parents: StagedStore<Hash, BlockHashes>,
    children: StagedStore<Hash, BlockHashes>,
}

impl DbRelationsStore {
    pub fn new(db: Arc<Database>, cache_size: usize) -> Self {
        let (parents, children) = (
            DbBucket::new(CF_BLOCK_RELATIONS, b"parents"),
            DbBucket::new(CF_BLOCK_RELATIONS, b"children"),
        );
        Self {
            parents: StagedStore::new(db.clone(), parents, cache_size, false),
            children: StagedStore::new(db, children, cache_size, false),
        }
    }
}

impl RelationsStoreReader for DbRelationsStore {
    fn get_parents(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockHashes> {
        self.parents.get(area, &hash)
    }

    fn get_children(&self, area: &StagingArea, hash: Hash) -> DbResult<BlockHashes> {
        Ok(self.children.get(area, &hash).optional()?.unwrap_or_default())
    }

    fn has(&self, area: &StagingArea, hash: Hash) -> DbResult<bool> {
        self.parents.has(area, &hash)
    }
}

impl RelationsStore for DbRelationsStore {
    fn insert(&self, area: &mut StagingArea, hash: Hash, parents: BlockHashes) -> DbResult<()> {
        if self.has(area, hash)? {
            return Ok(());
        }
        for parent in parents.iter().copied() {
            if !self.has(area, parent)? {
                continue;
            }
            let mut children = Vec::clone(&self.get_children(area, parent)?);
            children.push(hash);
            self.children.stage(area, parent, Arc::new(children))?;
        }
        self.parents.stage(area, hash, parents)
    }

    fn delete(&self, area: &mut StagingArea, hash: Hash) -> DbResult<()> {
        self.parents.stage_delete(area, hash)?;
        self.children.stage_delete(area, hash)
    }
}
