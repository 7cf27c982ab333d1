use crate::api::TabletManagerError;
use crate::commitlog;
use crate::manager::TabletManager;
use crate::metadata::{DataState, TabletMetadata};
use crate::placement::AssignedRoots;
use crate::registry::{ManagerState, RegisterMode};
use crate::replica::ReplicaHandle;
use std::sync::Arc;

impl TabletManager {
    /// Loads every replica found on disk, finishes interrupted deletions, and submits the rest
    /// for opening. Opens run in the background; see `wait_for_all_bootstraps_to_finish`.
    pub fn init(self: &Arc<Self>) -> Result<(), TabletManagerError> {
        if self.registry.state() != ManagerState::Initializing {
            return Err(TabletManagerError::IllegalState(format!(
                "Cannot init tablet manager in state {:?}",
                self.registry.state()
            )));
        }

        let removed = self.layout.remove_stale_checkpoints()?;
        if removed > 0 {
            slog::info!(self.logger, "Removed {} stale checkpoint directories", removed);
        }

        // Every superblock is loaded before any open is submitted.
        let tablet_ids = self.layout.list_tablet_ids()?;
        let mut loaded = Vec::with_capacity(tablet_ids.len());
        for tablet_id in tablet_ids.iter() {
            let metadata = TabletMetadata::load(self.layout.clone(), tablet_id).map_err(|e| {
                slog::error!(self.logger, "Failed to load tablet metadata: {}", e; "TabletId" => %tablet_id);
                e
            })?;
            loaded.push(metadata);
        }

        let mut to_open = Vec::with_capacity(loaded.len());
        for metadata in loaded {
            let data_state = metadata.data_state();
            if !data_state.can_serve_tablet_data() {
                if self.handle_non_ready_tablet_on_startup(&metadata)? {
                    let handle = ReplicaHandle::new(&self.logger, metadata, self.registry.state_listener());
                    self.registry.register(handle, RegisterMode::New)?;
                }
                continue;
            }

            self.balancer.register(
                metadata.table_id(),
                metadata.tablet_id(),
                &AssignedRoots {
                    data_root: metadata.data_root_dir(),
                    wal_root: metadata.wal_root_dir(),
                },
            );
            let handle = ReplicaHandle::new(&self.logger, metadata, self.registry.state_listener());
            self.registry.register(handle.clone(), RegisterMode::New)?;
            to_open.push(handle);
        }

        self.registry.advance_state(ManagerState::Running);
        slog::info!(
            self.logger,
            "Loaded {} tablets, opening {}",
            self.registry.len(),
            to_open.len()
        );
        for handle in to_open {
            self.registry.mark_dirty(handle.tablet_id(), "loaded at startup");
            self.submit_open(handle)?;
        }
        Ok(())
    }

    /// Returns whether the replica stays registered as a tombstone.
    ///
    /// COPYING means a remote bootstrap never finished and becomes TOMBSTONED. INIT_STARTED means a
    /// creation never finished and becomes DELETED.
    fn handle_non_ready_tablet_on_startup(&self, metadata: &TabletMetadata) -> Result<bool, TabletManagerError> {
        let tablet_id = metadata.tablet_id();
        let data_state = metadata.data_state();
        let target = match data_state {
            DataState::Copying | DataState::Tombstoned => DataState::Tombstoned,
            DataState::InitStarted | DataState::Deleted => DataState::Deleted,
            DataState::Ready | DataState::SplitCompleted => {
                return Err(TabletManagerError::IllegalState(format!(
                    "Tablet {} is in ready state {}",
                    tablet_id, data_state
                )))
            }
        };
        if target != data_state {
            slog::warn!(
                self.logger,
                "Found tablet in {} state on startup, treating it as {}", data_state, target;
                "TabletId" => %tablet_id
            );
        }

        let already_clean = target == DataState::Tombstoned
            && metadata.is_tombstoned_with_no_data()
            && !commitlog::has_on_disk_data(&metadata.wal_dir())?;
        if !already_clean {
            self.delete_tablet_data(metadata, target, metadata.tombstone_last_logged_op_id())?;
        }

        if target == DataState::Deleted {
            metadata.delete_superblock()?;
            slog::info!(self.logger, "Deleted leftover tablet on startup"; "TabletId" => %tablet_id);
            return Ok(false);
        }
        Ok(true)
    }

    /// Waits for the open pool to drain. Fails with the first replica that failed to open.
    pub async fn wait_for_all_bootstraps_to_finish(&self) -> Result<(), TabletManagerError> {
        self.open_pool.wait_idle().await;
        for handle in self.tablets() {
            if let Some(cause) = handle.error() {
                return Err(TabletManagerError::TabletFailed {
                    tablet_id: handle.tablet_id().clone(),
                    cause,
                });
            }
        }
        Ok(())
    }
}
