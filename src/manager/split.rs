use crate::api::{KeyBounds, OpId, Partition, TabletId, TabletManagerError};
use crate::fault::FaultPoint;
use crate::manager::TabletManager;
use crate::metadata::{remove_dir_if_exists, ConsensusMetadata, DataState, FsLayout, Superblock, TabletMetadata};
use crate::placement::AssignedRoots;
use crate::registry::RegisterMode;
use crate::replica::{ReplicaHandle, ReplicaRuntime, RuntimeState};
use std::fs;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A committed SPLIT operation of a parent replica.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitRequest {
    pub parent_id: TabletId,
    pub split_op_id: OpId,
    pub child_ids: [TabletId; 2],
    /// First partition key of the second child.
    pub split_partition_key: Vec<u8>,
    /// First encoded key of the second child.
    pub split_encoded_key: Vec<u8>,
}

/// Layout of one child, derived from the parent.
struct SplitChild {
    tablet_id: TabletId,
    partition: Partition,
    key_bounds: KeyBounds,
}

fn split_children(parent: &Superblock, request: &SplitRequest) -> [SplitChild; 2] {
    let [first, second] = &request.child_ids;
    [
        SplitChild {
            tablet_id: first.clone(),
            partition: Partition {
                partition_key_start: parent.partition.partition_key_start.clone(),
                partition_key_end: request.split_partition_key.clone(),
            },
            key_bounds: KeyBounds {
                lower: parent.key_bounds.lower.clone(),
                upper: request.split_encoded_key.clone(),
            },
        },
        SplitChild {
            tablet_id: second.clone(),
            partition: Partition {
                partition_key_start: request.split_partition_key.clone(),
                partition_key_end: parent.partition.partition_key_end.clone(),
            },
            key_bounds: KeyBounds {
                lower: request.split_encoded_key.clone(),
                upper: parent.key_bounds.upper.clone(),
            },
        },
    ]
}

impl TabletManager {
    /// Runs `apply_split` on the apply pool.
    pub async fn split_tablet(self: &Arc<Self>, request: SplitRequest) -> Result<(), TabletManagerError> {
        let (tx, rx) = oneshot::channel();
        let manager = self.clone();
        self.apply_pool.submit(move || {
            let _ = tx.send(manager.apply_split(&request));
        })?;
        rx.await.map_err(|_| TabletManagerError::ShutdownInProgress)?
    }

    /// Creates both children from the parent's data and log, then marks the parent
    /// SPLIT_COMPLETED. Safe to repeat: children that already reached READY are left alone.
    pub fn apply_split(self: &Arc<Self>, request: &SplitRequest) -> Result<(), TabletManagerError> {
        let parent_id = &request.parent_id;
        if request.child_ids[0] == request.child_ids[1] || request.child_ids.contains(parent_id) {
            return Err(TabletManagerError::InvalidArgument(format!(
                "Split of {} needs two distinct new tablet ids, got {:?}",
                parent_id, request.child_ids
            )));
        }
        if request.split_partition_key.is_empty() || request.split_encoded_key.is_empty() {
            return Err(TabletManagerError::InvalidArgument(format!(
                "Split of {} has an empty split key",
                parent_id
            )));
        }

        let parent = self.get_tablet(parent_id)?;
        let runtime = parent
            .runtime()
            .ok_or_else(|| TabletManagerError::TabletNotRunning {
                tablet_id: parent_id.clone(),
                reason: format!("state {}", parent.state()),
            })?;
        let logger = self.tablet_logger(parent_id);

        // Guard the children before touching disk so a remote bootstrap cannot race us.
        let _tokens = request
            .child_ids
            .iter()
            .map(|child_id| {
                self.transitions
                    .begin(child_id, format!("splitting parent {}", parent_id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let parent_metadata = parent.metadata().clone();
        let parent_superblock = parent_metadata.snapshot();
        let parent_cmeta = ConsensusMetadata::load(&self.layout, parent_id)?;
        runtime.flush_log()?;

        let mut created = Vec::with_capacity(2);
        for child in split_children(&parent_superblock, request).iter() {
            if let Some(handle) = self.create_split_child(&parent_metadata, &parent_cmeta, &*runtime, child, request)? {
                created.push(handle);
            }
        }

        let [first, second] = &request.child_ids;
        parent_metadata.set_split_done(request.split_op_id, first.clone(), second.clone());
        parent_metadata.flush()?;
        slog::info!(logger, "Split applied at {:?} into {} and {}", request.split_op_id, first, second);
        self.registry.mark_dirty(parent_id, "split completed");

        for handle in created {
            if let Err(e) = self.submit_open(handle.clone()) {
                slog::warn!(logger, "Failed to submit open of split child {}: {}", handle.tablet_id(), e);
            }
        }
        Ok(())
    }

    /// Returns the handle to open: a new one, or an existing child an earlier failed attempt never
    /// opened. `None` if the child already exists and needs nothing.
    fn create_split_child(
        self: &Arc<Self>,
        parent_metadata: &TabletMetadata,
        parent_cmeta: &ConsensusMetadata,
        runtime: &dyn ReplicaRuntime,
        child: &SplitChild,
        request: &SplitRequest,
    ) -> Result<Option<Arc<ReplicaHandle>>, TabletManagerError> {
        let child_id = &child.tablet_id;
        let logger = self.tablet_logger(child_id);

        if let Some(existing) = self.registry.lookup(child_id) {
            let data_state = existing.data_state();
            if data_state == DataState::Ready && existing.state() == RuntimeState::NotStarted {
                slog::info!(logger, "Split child created by an earlier attempt was never opened");
                return Ok(Some(existing));
            }
            if data_state != DataState::InitStarted && data_state != DataState::Copying {
                slog::info!(logger, "Split child already present in state {}, skipping", data_state);
                return Ok(None);
            }
        }
        self.remove_split_child_leftovers(parent_metadata, child_id)?;

        // INIT_STARTED until the very end, so a crash anywhere below reads as "never created".
        let child_metadata =
            parent_metadata.create_subtablet(child_id, child.partition.clone(), child.key_bounds.clone(), request.split_op_id)?;
        let data_dir = child_metadata.data_dir();
        fs::create_dir_all(&data_dir)?;
        runtime.create_checkpoint(&data_dir)?;

        parent_cmeta.for_split_child(child_id).flush(&self.layout)?;
        self.faults.maybe_fault(FaultPoint::CrashInSplitBeforeLogFlushed)?;

        runtime.copy_log_to(&child_metadata.wal_dir())?;
        self.faults.maybe_fault(FaultPoint::CrashInSplitAfterLogCopied)?;

        child_metadata.set_data_state(DataState::Ready);
        child_metadata.flush()?;

        self.balancer.register(
            child_metadata.table_id(),
            child_id,
            &AssignedRoots {
                data_root: child_metadata.data_root_dir(),
                wal_root: child_metadata.wal_root_dir(),
            },
        );
        let handle = ReplicaHandle::new(&self.logger, child_metadata, self.registry.state_listener());
        let mode = if self.registry.lookup(child_id).is_some() {
            RegisterMode::Replacement
        } else {
            RegisterMode::New
        };
        self.registry.register(handle.clone(), mode)?;
        self.registry.mark_dirty(child_id, "created by split");
        slog::info!(logger, "Split child created");
        Ok(Some(handle))
    }

    /// Clears whatever an interrupted earlier attempt left for `child_id`.
    fn remove_split_child_leftovers(
        &self,
        parent_metadata: &TabletMetadata,
        child_id: &TabletId,
    ) -> Result<(), TabletManagerError> {
        let mut removed = false;
        if self.layout.superblock_path(child_id).exists() {
            let stale = TabletMetadata::load(self.layout.clone(), child_id)?;
            remove_dir_if_exists(&stale.data_dir())?;
            remove_dir_if_exists(&stale.wal_dir())?;
            stale.set_data_state(DataState::Deleted);
            stale.delete_superblock()?;
            removed = true;
        }
        let superblock = parent_metadata.snapshot();
        removed |= remove_dir_if_exists(&FsLayout::tablet_data_dir(
            &superblock.data_root_dir,
            &superblock.table_id,
            child_id,
        ))?;
        removed |= remove_dir_if_exists(&FsLayout::tablet_wal_dir(
            &superblock.wal_root_dir,
            &superblock.table_id,
            child_id,
        ))?;
        if ConsensusMetadata::exists(&self.layout, child_id) {
            ConsensusMetadata::delete_on_disk_data(&self.layout, child_id)?;
            removed = true;
        }

        if removed {
            slog::warn!(self.logger, "Removed leftovers of an earlier split attempt"; "TabletId" => %child_id);
        }
        Ok(())
    }
}
