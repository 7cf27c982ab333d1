use crate::api::{BootstrapSource, TabletId, TabletManagerError};
use crate::fault::FaultPoint;
use crate::manager::TabletManager;
use crate::metadata::{remove_dir_if_exists, DataState, Superblock, TabletMetadata};
use crate::placement::AssignedRoots;
use crate::registry::RegisterMode;
use crate::remote_bootstrap::{RemoteBootstrapClient, RemoteTabletSnapshot};
use crate::replica::ReplicaHandle;
use crate::util::{fatal, LongOperationTracker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteBootstrapRequest {
    pub tablet_id: TabletId,
    pub source: BootstrapSource,
    /// Term of the leader asking for the copy.
    pub caller_term: u64,
}

/// One of the bounded remote bootstrap slots, given back on drop.
pub(super) struct RemoteBootstrapSlot<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for RemoteBootstrapSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl TabletManager {
    pub(super) fn acquire_remote_bootstrap_slot(&self) -> Result<RemoteBootstrapSlot<'_>, TabletManagerError> {
        let max = self.config.max_concurrent_remote_bootstraps;
        let in_flight = self.remote_bootstraps_in_flight.fetch_add(1, Ordering::AcqRel);
        let slot = RemoteBootstrapSlot {
            in_flight: &self.remote_bootstraps_in_flight,
        };
        if in_flight >= max {
            drop(slot);
            return Err(TabletManagerError::TooManyRemoteBootstraps { in_flight, max });
        }
        Ok(slot)
    }

    /// Replaces (or creates) a local replica with a full copy from `request.source`, then opens it.
    ///
    /// The copy runs on its own task. Dropping the returned future does not abandon it halfway.
    pub async fn start_remote_bootstrap(
        self: &Arc<Self>,
        request: RemoteBootstrapRequest,
    ) -> Result<(), TabletManagerError> {
        let manager = self.clone();
        tokio::spawn(async move { manager.bootstrap_tablet(request).await })
            .await
            .map_err(|e| TabletManagerError::IllegalState(format!("Remote bootstrap task failed: {}", e)))?
    }

    async fn bootstrap_tablet(self: &Arc<Self>, request: RemoteBootstrapRequest) -> Result<(), TabletManagerError> {
        let _slot = self.acquire_remote_bootstrap_slot()?;
        self.check_running()?;

        let tablet_id = &request.tablet_id;
        let logger = self.tablet_logger(tablet_id);
        let _token = self.transitions.begin(
            tablet_id,
            format!("remote bootstrapping from {}", request.source.peer_uuid),
        )?;
        let _tracker = LongOperationTracker::new(
            logger.clone(),
            format!("Remote bootstrap of {}", tablet_id),
            self.config.long_operation_threshold,
        );

        let existing = self.registry.lookup(tablet_id);
        if let Some(old) = &existing {
            let data_state = old.data_state();
            match data_state {
                DataState::Copying => fatal(
                    &logger,
                    "Found tablet in COPYING state while starting a new remote bootstrap",
                ),
                DataState::Tombstoned => {
                    if let Some(last_logged) = old.metadata().tombstone_last_logged_op_id() {
                        if request.caller_term < last_logged.term {
                            return Err(TabletManagerError::InvalidArgument(format!(
                                "Leader has term {} but the last log entry written by the tombstoned replica \
                                 for tablet {} has higher term {}",
                                request.caller_term, tablet_id, last_logged.term
                            )));
                        }
                    }
                    slog::info!(logger, "Replacing tombstoned replica via remote bootstrap");
                }
                // The coordinator raced a local split or an earlier bootstrap. It ignores this.
                _ => {
                    return Err(TabletManagerError::AlreadyPresent(format!(
                        "Tablet {} already exists in state {}",
                        tablet_id, data_state
                    )))
                }
            }
        }
        if self.faults.simulate_already_present_in_remote_bootstrap() {
            return Err(TabletManagerError::AlreadyPresent(format!(
                "Simulated already present tablet {}",
                tablet_id
            )));
        }

        let _source = self.registry.add_bootstrap_source(tablet_id, request.source.dial_addr());
        self.remote_bootstrap(&request, existing, &logger).await
    }

    async fn remote_bootstrap(
        self: &Arc<Self>,
        request: &RemoteBootstrapRequest,
        existing: Option<Arc<ReplicaHandle>>,
        logger: &slog::Logger,
    ) -> Result<(), TabletManagerError> {
        let tablet_id = &request.tablet_id;
        let mut client = self
            .remote_bootstrap_client_factory
            .create(tablet_id, &request.source, self.local_uuid())
            .await?;
        let snapshot = client.start().await?;
        let _being_bootstrapped = self
            .registry
            .mark_being_remote_bootstrapped(tablet_id, &snapshot.superblock.table_id);

        let roots = match &existing {
            Some(old) => {
                let roots = AssignedRoots {
                    data_root: old.metadata().data_root_dir(),
                    wal_root: old.metadata().wal_root_dir(),
                };
                self.balancer.register(&snapshot.superblock.table_id, tablet_id, &roots);
                roots
            }
            None => self.balancer.assign_new(&snapshot.superblock.table_id, tablet_id)?,
        };

        // COPYING hits the disk before any data does.
        let metadata = match TabletMetadata::persist(self.layout.clone(), copying_superblock(&snapshot, roots)) {
            Ok(metadata) => metadata,
            Err(e) => {
                if existing.is_none() {
                    self.balancer.unregister(&snapshot.superblock.table_id, tablet_id);
                }
                client.remove().await;
                return Err(e.into());
            }
        };
        let handle = ReplicaHandle::new(&self.logger, metadata.clone(), self.registry.state_listener());
        let mode = if existing.is_some() {
            RegisterMode::Replacement
        } else {
            RegisterMode::New
        };

        let copied = match self.registry.register(handle.clone(), mode) {
            Ok(()) => self.copy_from_source(&mut *client, &snapshot, &metadata).await,
            Err(e) => Err(e.into()),
        };
        client.remove().await;
        match copied {
            Ok(()) => {}
            // Left exactly as a crash would leave it.
            Err(e @ TabletManagerError::InjectedCrash(_)) => return Err(e),
            Err(e) => {
                slog::error!(logger, "Remote bootstrap failed, tombstoning: {}", e);
                if let Err(tombstone_error) = self.delete_tablet_data(&metadata, DataState::Tombstoned, None) {
                    slog::error!(logger, "Failed to tombstone after failed remote bootstrap: {}", tombstone_error);
                }
                self.balancer.unregister(&snapshot.superblock.table_id, tablet_id);
                self.registry.mark_dirty(tablet_id, "remote bootstrap failed");
                return Err(e);
            }
        }
        slog::info!(logger, "Remote bootstrap copied all files, opening tablet");

        let manager = self.clone();
        let opening = handle.clone();
        tokio::task::spawn_blocking(move || manager.open_tablet(&opening))
            .await
            .map_err(|e| TabletManagerError::IllegalState(format!("Open task failed: {}", e)))??;

        if let Some(runtime) = handle.runtime() {
            let verified = client
                .verify_change_role_succeeded(self.local_uuid(), runtime, self.config.remote_bootstrap_verify_timeout)
                .await;
            if let Err(e) = verified {
                // The coordinator retries the config change on its own.
                slog::warn!(logger, "Could not verify role change after remote bootstrap: {}", e);
            }
        }
        Ok(())
    }

    async fn copy_from_source(
        &self,
        client: &mut dyn RemoteBootstrapClient,
        snapshot: &RemoteTabletSnapshot,
        metadata: &TabletMetadata,
    ) -> Result<(), TabletManagerError> {
        let (data_dir, wal_dir) = (metadata.data_dir(), metadata.wal_dir());
        remove_dir_if_exists(&data_dir)?;
        remove_dir_if_exists(&wal_dir)?;

        client.fetch_all(&data_dir, &wal_dir).await?;
        self.faults.maybe_fault(FaultPoint::CrashAfterRemoteBootstrapFilesFetched)?;

        let mut cmeta = snapshot.consensus.clone();
        cmeta.tablet_id = metadata.tablet_id().clone();
        cmeta.peer_uuid = self.local_uuid().to_string();
        cmeta.flush(&self.layout)?;

        client.finish().await?;
        metadata.set_data_state(DataState::Ready);
        metadata.flush()?;
        Ok(())
    }
}

/// Local superblock for a copy in progress: the source's identity and key ranges, our roots.
fn copying_superblock(snapshot: &RemoteTabletSnapshot, roots: AssignedRoots) -> Superblock {
    let source = &snapshot.superblock;
    Superblock {
        tablet_id: source.tablet_id.clone(),
        table_id: source.table_id.clone(),
        table_name: source.table_name.clone(),
        partition: source.partition.clone(),
        key_bounds: source.key_bounds.clone(),
        data_state: DataState::Copying,
        data_root_dir: roots.data_root,
        wal_root_dir: roots.wal_root,
        hidden: false,
        split_parent_tablet_id: source.split_parent_tablet_id.clone(),
        split_child_tablet_ids: Vec::new(),
        split_op_id: source.split_op_id,
        tombstone_last_logged_op_id: None,
        post_split_compaction_pending: source.post_split_compaction_pending,
    }
}
