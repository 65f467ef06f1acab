//! Header processor for consensus
//!
//! Validates a header against its parents, computes its GHOSTDAG and DAA data
//! and stages everything the header alone determines.

use crate::consensus::dag::relations::{DbRelationsStore, RelationsStore};
use crate::consensus::difficulty::DaaManager;
use crate::consensus::ghostdag::stores::{DbGhostdagStore, GhostdagStore};
use crate::consensus::ghostdag::GhostdagProtocol;
use crate::consensus::storage::block_store::{BlockHeaderStore, DbHeadersStore};
use crate::consensus::storage::daa::{BlockDaaData, DaaStore, DbDaaStore};
use crate::consensus::storage::statuses::{DbStatusesStore, StatusesStoreReader};
use crate::consensus::validation::HeaderValidator;
use crate::errors::{ConsensusError, ConsensusResult};
use consensus_core::blockstatus::BlockStatus;
use consensus_core::errors::RuleError;
use consensus_core::ghostdag::{GhostdagData, GhostdagDataVariant};
use consensus_core::header::Header;
use database::StagingArea;
use std::sync::Arc;
use tracing::trace;

pub struct HeaderProcessor {
    header_validator: HeaderValidator,
    ghostdag_protocol: Arc<GhostdagProtocol>,
    daa_manager: Arc<DaaManager>,

    headers: Arc<DbHeadersStore>,
    relations: Arc<DbRelationsStore>,
    ghostdag_store: Arc<DbGhostdagStore>,
    daa_store: Arc<DbDaaStore>,
    statuses: Arc<DbStatusesStore>,
}

impl HeaderProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        header_validator: HeaderValidator,
        ghostdag_protocol: Arc<GhostdagProtocol>,
        daa_manager: Arc<DaaManager>,
        headers: Arc<DbHeadersStore>,
        relations: Arc<DbRelationsStore>,
        ghostdag_store: Arc<DbGhostdagStore>,
        daa_store: Arc<DbDaaStore>,
        statuses: Arc<DbStatusesStore>,
    ) -> Self {
        Self {
            header_validator,
            ghostdag_protocol,
            daa_manager,
            headers,
            relations,
            ghostdag_store,
            daa_store,
            statuses,
        }
    }

    /// Validates `header` and stages its header, relations, GHOSTDAG and DAA data.
    /// Returns the computed GHOSTDAG data.
    pub fn process_header(
        &self,
        area: &mut StagingArea,
        header: &Arc<Header>,
    ) -> ConsensusResult<Arc<GhostdagData>> {
        self.header_validator.validate_header_in_isolation(header)?;
        self.header_validator.validate_parents(area, header)?;

        let ghostdag_data = match self.ghostdag_protocol.ghostdag(area, header.direct_parents()) {
            Ok(data) => Arc::new(data),
            // the mergeset reaches into deleted history
            Err(ConsensusError::Db(err)) if err.is_not_found() => {
                return Err(RuleError::PruningViolation(header.direct_parents().to_vec()).into())
            }
            Err(err) => return Err(err),
        };
        self.check_mergeset_not_pruned(area, header, &ghostdag_data)?;
        let (daa_score, added_blocks) =
            self.daa_manager.calc_daa_score_and_added_blocks(area, &ghostdag_data)?;
        let required_bits =
            self.daa_manager.calc_required_bits(area, ghostdag_data.selected_parent)?;
        self.header_validator.check_timestamp_against_parents(area, header)?;
        self.header_validator.validate_header_in_context(
            header,
            &ghostdag_data,
            daa_score,
            required_bits,
        )?;

        let hash = header.hash;
        self.headers.insert_header(area, header.clone())?;
        self.relations.insert(area, hash, Arc::new(header.direct_parents().to_vec()))?;
        self.ghostdag_store.insert(area, hash, ghostdag_data.clone(), GhostdagDataVariant::Local)?;
        let daa_data = BlockDaaData { daa_score, added_blocks: Arc::new(added_blocks) };
        self.daa_store.insert(area, hash, daa_data)?;
        trace!(block = %hash, blue_score = ghostdag_data.blue_score, daa_score, "header staged");
        Ok(ghostdag_data)
    }

    /// Merging a block whose body was pruned would leave its transactions unaccounted for
    fn check_mergeset_not_pruned(
        &self,
        area: &StagingArea,
        header: &Header,
        ghostdag_data: &GhostdagData,
    ) -> ConsensusResult<()> {
        for merged in ghostdag_data.unordered_mergeset() {
            if self.statuses.get_status_opt(area, merged)? == Some(BlockStatus::HeaderOnly) {
                return Err(RuleError::PruningViolation(header.direct_parents().to_vec()).into());
            }
        }
        Ok(())
    }
}
