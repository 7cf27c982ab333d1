use crate::api::{
    Partition, RaftConfig, TableInfo, TabletId, TabletManagerConfig, TabletManagerError,
};
use crate::fault::FaultInjector;
use crate::metadata::{ConsensusMetadata, DataState, FsLayout, Superblock, TabletMetadata};
use crate::placement::DirectoryBalancer;
use crate::registry::{HeartbeatTrigger, ManagerState, RegisterMode, Registry};
use crate::remote_bootstrap::RemoteBootstrapClientFactory;
use crate::replica::{LeaderStatus, ReplicaHandle, ReplicaRuntimeFactory, RuntimeState};
use crate::transition::TransitionGuard;
use crate::util::{Stopper, WorkerPool};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Collaborators a `TabletManager` is built from.
pub struct TabletManagerParts {
    pub logger: slog::Logger,
    pub config: TabletManagerConfig,
    pub layout: Arc<FsLayout>,
    pub runtime_factory: Arc<dyn ReplicaRuntimeFactory>,
    pub remote_bootstrap_client_factory: Arc<dyn RemoteBootstrapClientFactory>,
    pub faults: FaultInjector,
    pub heartbeat_trigger: HeartbeatTrigger,
}

/// Tracks every local replica through creation, bootstrap, split, remote bootstrap, tombstoning
/// and deletion.
pub struct TabletManager {
    pub(super) logger: slog::Logger,
    pub(super) config: TabletManagerConfig,
    pub(super) layout: Arc<FsLayout>,
    pub(super) registry: Arc<Registry>,
    pub(super) transitions: TransitionGuard,
    pub(super) balancer: DirectoryBalancer,
    pub(super) runtime_factory: Arc<dyn ReplicaRuntimeFactory>,
    pub(super) remote_bootstrap_client_factory: Arc<dyn RemoteBootstrapClientFactory>,
    pub(super) faults: FaultInjector,
    pub(super) open_pool: WorkerPool,
    pub(super) apply_pool: WorkerPool,
    pub(super) compaction_pool: WorkerPool,
    pub(super) remote_bootstraps_in_flight: AtomicUsize,
    pub(super) pollers: Mutex<Vec<Stopper>>,
}

impl TabletManager {
    /// Must be called from within a tokio runtime.
    pub fn new(parts: TabletManagerParts) -> Result<Arc<Self>, TabletManagerError> {
        let TabletManagerParts {
            logger,
            config,
            layout,
            runtime_factory,
            remote_bootstrap_client_factory,
            faults,
            heartbeat_trigger,
        } = parts;

        let num_cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let open_threads = config.open_pool_threads(layout.data_roots().len(), num_cpus);
        let open_pool = WorkerPool::new(logger.clone(), "tablet-open", open_threads)?;
        let apply_pool = WorkerPool::new(logger.clone(), "apply", config.apply_pool_max_threads)?;
        let compaction_pool = WorkerPool::new(
            logger.clone(),
            "post-split-compaction",
            config.post_split_compaction_pool_max_threads,
        )?;

        let balancer = DirectoryBalancer::new(
            logger.clone(),
            layout.data_roots().to_vec(),
            layout.wal_roots().to_vec(),
            config.system_table_id.clone(),
        );

        Ok(Arc::new(TabletManager {
            registry: Registry::new(logger.clone(), heartbeat_trigger),
            transitions: TransitionGuard::new(logger.clone()),
            balancer,
            logger,
            config,
            layout,
            runtime_factory,
            remote_bootstrap_client_factory,
            faults,
            open_pool,
            apply_pool,
            compaction_pool,
            remote_bootstraps_in_flight: AtomicUsize::new(0),
            pollers: Mutex::new(Vec::new()),
        }))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn layout(&self) -> &Arc<FsLayout> {
        &self.layout
    }

    pub fn config(&self) -> &TabletManagerConfig {
        &self.config
    }

    pub fn balancer(&self) -> &DirectoryBalancer {
        &self.balancer
    }

    pub fn local_uuid(&self) -> &str {
        self.layout.uuid()
    }

    pub fn state(&self) -> ManagerState {
        self.registry.state()
    }

    pub(super) fn tablet_logger(&self, tablet_id: &TabletId) -> slog::Logger {
        self.logger.new(slog::o!("TabletId" => tablet_id.to_string()))
    }

    pub(super) fn check_running(&self) -> Result<(), TabletManagerError> {
        match self.registry.state() {
            ManagerState::Running => Ok(()),
            ManagerState::Initializing => Err(TabletManagerError::IllegalState(
                "Tablet manager is not running yet".into(),
            )),
            ManagerState::Quiescing | ManagerState::Shutdown => Err(TabletManagerError::ShutdownInProgress),
        }
    }

    pub fn lookup_tablet(&self, tablet_id: &TabletId) -> Option<Arc<ReplicaHandle>> {
        self.registry.lookup(tablet_id)
    }

    /// Like `lookup_tablet`, but only for replicas whose data can be served.
    pub fn get_tablet(&self, tablet_id: &TabletId) -> Result<Arc<ReplicaHandle>, TabletManagerError> {
        let handle = self
            .registry
            .lookup(tablet_id)
            .ok_or_else(|| TabletManagerError::NotFound(tablet_id.clone()))?;
        let data_state = handle.data_state();
        if !data_state.can_serve_tablet_data() {
            return Err(TabletManagerError::IllegalState(format!(
                "Tablet {} data state not ready: {}",
                tablet_id, data_state
            )));
        }
        Ok(handle)
    }

    pub fn tablets(&self) -> Vec<Arc<ReplicaHandle>> {
        let mut handles = self.registry.handles();
        handles.sort_by(|a, b| a.tablet_id().cmp(b.tablet_id()));
        handles
    }

    pub fn num_tablets_pending_bootstrap(&self) -> usize {
        self.count_in_states(&[RuntimeState::NotStarted, RuntimeState::Bootstrapping])
    }

    pub fn num_live_tablets(&self) -> usize {
        self.count_in_states(&[RuntimeState::Bootstrapping, RuntimeState::Running])
    }

    fn count_in_states(&self, states: &[RuntimeState]) -> usize {
        self.registry
            .handles()
            .iter()
            .filter(|handle| handle.data_state() != DataState::Tombstoned && states.contains(&handle.state()))
            .count()
    }

    pub fn leader_count(&self) -> usize {
        self.registry
            .handles()
            .iter()
            .filter(|handle| handle.leader_status() == LeaderStatus::Leader)
            .count()
    }

    pub fn is_tablet_in_transition(&self, tablet_id: &TabletId) -> bool {
        self.transitions.is_in_transition(tablet_id)
    }

    pub fn num_dirty_tablets(&self) -> usize {
        self.registry.num_dirty()
    }

    pub fn num_remote_bootstraps_in_flight(&self) -> usize {
        self.remote_bootstraps_in_flight.load(Ordering::Acquire)
    }

    /// Persists a brand new replica and opens it in the background.
    pub fn create_new_tablet(
        self: &Arc<Self>,
        table: &TableInfo,
        tablet_id: &TabletId,
        partition: Partition,
        config: RaftConfig,
    ) -> Result<Arc<ReplicaHandle>, TabletManagerError> {
        self.check_running()?;
        if !config.is_member(self.local_uuid()) {
            return Err(TabletManagerError::InvalidArgument(format!(
                "Local peer {} is not a member of the config of tablet {}",
                self.local_uuid(),
                tablet_id
            )));
        }

        let _token = self.transitions.begin(tablet_id, "creating tablet")?;
        if self.registry.lookup(tablet_id).is_some() {
            return Err(TabletManagerError::AlreadyPresent(format!(
                "Tablet {} already registered",
                tablet_id
            )));
        }

        let logger = self.tablet_logger(tablet_id);
        let roots = self.balancer.assign_new(&table.table_id, tablet_id)?;
        let superblock = Superblock {
            tablet_id: tablet_id.clone(),
            table_id: table.table_id.clone(),
            table_name: table.table_name.clone(),
            partition,
            key_bounds: Default::default(),
            data_state: DataState::Ready,
            data_root_dir: roots.data_root,
            wal_root_dir: roots.wal_root,
            hidden: false,
            split_parent_tablet_id: None,
            split_child_tablet_ids: Vec::new(),
            split_op_id: None,
            tombstone_last_logged_op_id: None,
            post_split_compaction_pending: false,
        };

        // Superblock first, then consensus metadata. Nothing can replicate before both exist.
        let metadata = match TabletMetadata::create_new(self.layout.clone(), superblock) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.balancer.unregister(&table.table_id, tablet_id);
                return Err(e.into());
            }
        };
        if let Err(e) = ConsensusMetadata::create(&self.layout, tablet_id, self.local_uuid(), config, 0) {
            slog::error!(logger, "Failed to create consensus metadata: {}", e);
            self.discard_unregistered(&metadata);
            return Err(e.into());
        }

        let handle = ReplicaHandle::new(&self.logger, metadata.clone(), self.registry.state_listener());
        if let Err(e) = self.registry.register(handle.clone(), RegisterMode::New) {
            self.discard_unregistered(&metadata);
            return Err(e.into());
        }
        slog::info!(logger, "Created tablet of table {}", table.table_id);
        self.registry.mark_dirty(tablet_id, "tablet created");

        self.submit_open(handle.clone())?;
        Ok(handle)
    }

    /// Undoes a creation that never made it into the registry.
    fn discard_unregistered(&self, metadata: &Arc<TabletMetadata>) {
        let tablet_id = metadata.tablet_id();
        let result = ConsensusMetadata::delete_on_disk_data(&self.layout, tablet_id)
            .and_then(|_| metadata.delete_tablet_data(DataState::Deleted, None))
            .and_then(|_| metadata.delete_superblock());
        if let Err(e) = result {
            slog::warn!(self.logger, "Failed to clean up after failed creation: {}", e; "TabletId" => %tablet_id);
        }
        self.balancer.unregister(metadata.table_id(), tablet_id);
    }
}
