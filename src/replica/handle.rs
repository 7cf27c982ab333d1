use crate::api::{TableId, TabletId};
use crate::metadata::{DataState, TabletMetadata};
use crate::registry::ReportedTablet;
use crate::replica::{LeaderStatus, ReplicaRuntime, RuntimeError, RuntimeState, StateChangeListener};
use parking_lot::Mutex;
use std::sync::Arc;

struct HandleState {
    state: RuntimeState,
    error: Option<String>,
    runtime: Option<Arc<dyn ReplicaRuntime>>,
    shutdown_started: bool,
}

/// Registry entry for one local replica. Every runtime state change marks the replica dirty
/// through its listener.
pub struct ReplicaHandle {
    logger: slog::Logger,
    tablet_id: TabletId,
    metadata: Arc<TabletMetadata>,
    listener: Arc<dyn StateChangeListener>,
    inner: Mutex<HandleState>,
}

impl ReplicaHandle {
    pub fn new(logger: &slog::Logger, metadata: Arc<TabletMetadata>, listener: Arc<dyn StateChangeListener>) -> Arc<Self> {
        let tablet_id = metadata.tablet_id().clone();
        Arc::new(ReplicaHandle {
            logger: logger.new(slog::o!("TabletId" => tablet_id.to_string())),
            tablet_id,
            metadata,
            listener,
            inner: Mutex::new(HandleState {
                state: RuntimeState::NotStarted,
                error: None,
                runtime: None,
                shutdown_started: false,
            }),
        })
    }

    pub fn tablet_id(&self) -> &TabletId {
        &self.tablet_id
    }

    pub fn table_id(&self) -> &TableId {
        self.metadata.table_id()
    }

    pub fn metadata(&self) -> &Arc<TabletMetadata> {
        &self.metadata
    }

    pub fn data_state(&self) -> DataState {
        self.metadata.data_state()
    }

    pub fn state(&self) -> RuntimeState {
        self.inner.lock().state
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    pub fn runtime(&self) -> Option<Arc<dyn ReplicaRuntime>> {
        self.inner.lock().runtime.clone()
    }

    pub fn leader_status(&self) -> LeaderStatus {
        match (self.state(), self.runtime()) {
            (RuntimeState::Running, Some(runtime)) => runtime.leader_status(),
            _ => LeaderStatus::NotLeader,
        }
    }

    pub fn set_bootstrapping(&self) -> Result<(), RuntimeError> {
        {
            let mut inner = self.inner.lock();
            if inner.shutdown_started {
                return Err(RuntimeError::NotRunning("replica is shutting down".into()));
            }
            if inner.state != RuntimeState::NotStarted {
                return Err(RuntimeError::Failed(format!(
                    "cannot bootstrap a replica in state {}",
                    inner.state
                )));
            }
            inner.state = RuntimeState::Bootstrapping;
        }
        self.listener.state_changed(&self.tablet_id, "bootstrapping");
        Ok(())
    }

    /// Attaches a bootstrapped runtime and starts it.
    pub fn start(&self, runtime: Arc<dyn ReplicaRuntime>) -> Result<(), RuntimeError> {
        {
            let mut inner = self.inner.lock();
            if inner.shutdown_started {
                drop(inner);
                runtime.shutdown();
                return Err(RuntimeError::NotRunning("replica is shutting down".into()));
            }
            inner.runtime = Some(runtime.clone());
        }
        runtime.start()?;
        {
            let mut inner = self.inner.lock();
            if inner.state != RuntimeState::Bootstrapping {
                return Err(RuntimeError::Failed(format!(
                    "replica left bootstrapping while starting, now {}",
                    inner.state
                )));
            }
            inner.state = RuntimeState::Running;
        }
        slog::info!(self.logger, "Replica running");
        self.listener.state_changed(&self.tablet_id, "running");
        Ok(())
    }

    /// Records a fatal replica error. A shut down replica stays shut down.
    pub fn set_failed(&self, cause: String) {
        {
            let mut inner = self.inner.lock();
            if inner.state == RuntimeState::Shutdown {
                return;
            }
            inner.state = RuntimeState::Failed;
            inner.error = Some(cause.clone());
        }
        slog::error!(self.logger, "Replica failed: {}", cause);
        self.listener.state_changed(&self.tablet_id, "failed");
    }

    /// First half of shutdown. Returns false if shutdown already started.
    pub fn start_shutdown(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.shutdown_started || inner.state == RuntimeState::Shutdown {
            return false;
        }
        inner.shutdown_started = true;
        true
    }

    /// Stops the runtime and moves to SHUTDOWN. Failed replicas keep their error.
    pub fn complete_shutdown(&self) {
        let runtime = {
            let mut inner = self.inner.lock();
            inner.shutdown_started = true;
            if inner.state == RuntimeState::Shutdown {
                return;
            }
            inner.state = RuntimeState::Shutdown;
            inner.runtime.clone()
        };
        if let Some(runtime) = runtime {
            runtime.shutdown();
        }
        slog::info!(self.logger, "Replica shut down");
        self.listener.state_changed(&self.tablet_id, "shutdown");
    }

    pub fn shutdown(&self) {
        self.start_shutdown();
        self.complete_shutdown();
    }

    /// Snapshot for a tablet report. May read consensus state.
    pub fn reported_tablet(&self, should_disable_lb_move: bool) -> ReportedTablet {
        let (state, error, runtime) = {
            let inner = self.inner.lock();
            (inner.state, inner.error.clone(), inner.runtime.clone())
        };
        let committed_consensus_state = match state {
            RuntimeState::Running | RuntimeState::Bootstrapping => runtime.and_then(|r| r.consensus_state()),
            _ => None,
        };

        ReportedTablet {
            tablet_id: self.tablet_id.clone(),
            state,
            data_state: self.metadata.data_state(),
            committed_consensus_state,
            error,
            should_disable_lb_move,
            fs_data_dir: self.metadata.data_root_dir(),
            is_hidden: self.metadata.hidden(),
        }
    }
}
