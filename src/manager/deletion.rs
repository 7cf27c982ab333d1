use crate::api::{OpId, TabletId, TabletManagerError};
use crate::commitlog;
use crate::fault::FaultPoint;
use crate::manager::TabletManager;
use crate::metadata::{ConsensusMetadata, DataState, TabletMetadata};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteRequest {
    pub tablet_id: TabletId,
    /// DELETED or TOMBSTONED.
    pub delete_type: DataState,
    /// Rejects the request if the committed config has moved past this opid index.
    pub cas_config_opid_index_less_or_equal: Option<i64>,
    /// Only hide the replica; it keeps serving.
    pub hide_only: bool,
}

impl DeleteRequest {
    pub fn new(tablet_id: TabletId, delete_type: DataState) -> Self {
        DeleteRequest {
            tablet_id,
            delete_type,
            cas_config_opid_index_less_or_equal: None,
            hide_only: false,
        }
    }
}

impl TabletManager {
    pub fn delete_tablet(self: &Arc<Self>, request: &DeleteRequest) -> Result<(), TabletManagerError> {
        let tablet_id = &request.tablet_id;
        if !request.delete_type.is_deleted_or_tombstoned() {
            return Err(TabletManagerError::InvalidArgument(format!(
                "Invalid delete type {}",
                request.delete_type
            )));
        }
        self.check_running()?;

        let handle = self
            .registry
            .lookup(tablet_id)
            .ok_or_else(|| TabletManagerError::NotFound(tablet_id.clone()))?;
        let _token = self
            .transitions
            .begin(tablet_id, format!("deleting tablet ({})", request.delete_type))
            .map_err(|e| TabletManagerError::TabletNotRunning {
                tablet_id: tablet_id.clone(),
                reason: e.to_string(),
            })?;
        let logger = self.tablet_logger(tablet_id);
        let metadata = handle.metadata().clone();

        if let Some(expected) = request.cas_config_opid_index_less_or_equal {
            let committed = match handle.runtime().and_then(|r| r.committed_config_opid_index()) {
                Some(index) => Some(index),
                None => ConsensusMetadata::load(&self.layout, tablet_id)
                    .ok()
                    .map(|cmeta| cmeta.committed_config.opid_index),
            };
            if let Some(actual) = committed {
                if actual > expected {
                    return Err(TabletManagerError::CasFailed { expected, actual });
                }
            }
        }

        if request.hide_only {
            metadata.set_hidden(true);
            metadata.flush()?;
            slog::info!(logger, "Tablet hidden");
            self.registry.mark_dirty(tablet_id, "tablet hidden");
            return Ok(());
        }

        let last_logged_op_id = handle
            .runtime()
            .map(|r| r.last_logged_op_id())
            .filter(OpId::is_valid)
            .or_else(|| metadata.tombstone_last_logged_op_id());
        handle.shutdown();

        self.delete_tablet_data(&metadata, request.delete_type, last_logged_op_id)?;
        slog::info!(logger, "Tablet deleted ({})", request.delete_type);

        // Tombstones hold no data, so neither kind counts against its roots any more.
        self.balancer.unregister(metadata.table_id(), tablet_id);
        if request.delete_type == DataState::Deleted {
            self.registry.erase(tablet_id)?;
            metadata.delete_superblock()?;
        } else {
            self.registry.mark_dirty(tablet_id, "tablet tombstoned");
        }
        Ok(())
    }

    /// Data dir, then WAL, then (DELETED only) consensus metadata. Every step is permanent.
    pub(super) fn delete_tablet_data(
        &self,
        metadata: &TabletMetadata,
        delete_type: DataState,
        last_logged_op_id: Option<OpId>,
    ) -> Result<(), TabletManagerError> {
        metadata.delete_tablet_data(delete_type, last_logged_op_id)?;
        self.faults.maybe_fault(FaultPoint::CrashAfterBlocksDeleted)?;

        commitlog::delete_on_disk_data(&metadata.wal_dir())?;
        self.faults.maybe_fault(FaultPoint::CrashAfterWalDeleted)?;

        if delete_type == DataState::Deleted {
            ConsensusMetadata::delete_on_disk_data(&self.layout, metadata.tablet_id())?;
            self.faults.maybe_fault(FaultPoint::CrashAfterCmetaDeleted)?;
        }
        Ok(())
    }
}
