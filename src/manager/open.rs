use crate::api::TabletManagerError;
use crate::manager::TabletManager;
use crate::replica::{BootstrapContext, ReplicaHandle, RuntimeError};
use crate::util::LongOperationTracker;
use std::sync::Arc;

impl TabletManager {
    /// Queues `handle` on the open pool.
    pub(super) fn submit_open(self: &Arc<Self>, handle: Arc<ReplicaHandle>) -> Result<(), TabletManagerError> {
        let manager = self.clone();
        self.open_pool.submit(move || {
            // Failures are recorded on the handle.
            let _ = manager.open_tablet(&handle);
        })?;
        Ok(())
    }

    /// Bootstraps and starts a replica on the calling thread. Any failure leaves the handle FAILED
    /// with its cause.
    pub(super) fn open_tablet(self: &Arc<Self>, handle: &Arc<ReplicaHandle>) -> Result<(), TabletManagerError> {
        let tablet_id = handle.tablet_id().clone();
        let logger = self.tablet_logger(&tablet_id);
        let _tracker = LongOperationTracker::new(
            logger.clone(),
            format!("Opening tablet {}", tablet_id),
            self.config.tablet_start_warn_threshold,
        );

        if self.faults.take_single_tablet_failure() {
            let cause = "Injected single tablet failure".to_string();
            handle.set_failed(cause.clone());
            return Err(TabletManagerError::TabletFailed { tablet_id, cause });
        }

        if let Err(e) = handle.set_bootstrapping() {
            slog::info!(logger, "Not opening tablet: {}", e);
            return Err(e.into());
        }

        let context = BootstrapContext {
            logger: logger.clone(),
            local_uuid: self.local_uuid().to_string(),
            metadata: handle.metadata().clone(),
            listener: self.registry.state_listener(),
        };
        let runtime = match self.runtime_factory.bootstrap(context) {
            Ok(runtime) => runtime,
            Err(e) => {
                let cause = format!("Tablet failed to bootstrap: {}", e);
                handle.set_failed(cause.clone());
                return Err(TabletManagerError::TabletFailed { tablet_id, cause });
            }
        };

        if let Err(e) = handle.start(runtime.clone()) {
            return match e {
                RuntimeError::NotRunning(_) => {
                    slog::info!(logger, "Tablet shut down while starting: {}", e);
                    Err(e.into())
                }
                _ => {
                    let cause = format!("Tablet failed to start: {}", e);
                    handle.set_failed(cause.clone());
                    Err(TabletManagerError::TabletFailed { tablet_id, cause })
                }
            };
        }

        // A report generated before this point still says the replica may be moved.
        if runtime.needs_post_split_compaction() {
            self.registry.mark_blocked_from_lb(&tablet_id);
            self.registry.mark_dirty(&tablet_id, "blocked from load balancer moves");
            if self.faults.skip_post_split_compaction() {
                slog::info!(logger, "Skipping post-split compaction");
            } else {
                self.submit_post_split_compaction(handle.clone());
            }
        }
        Ok(())
    }

    fn submit_post_split_compaction(&self, handle: Arc<ReplicaHandle>) {
        let logger = self.tablet_logger(handle.tablet_id());
        let task_logger = logger.clone();
        let submitted = self.compaction_pool.submit(move || {
            let runtime = match handle.runtime() {
                Some(runtime) => runtime,
                None => return,
            };
            if let Err(e) = runtime.compact() {
                slog::error!(task_logger, "Post-split compaction failed: {}", e);
            }
        });
        if let Err(e) = submitted {
            slog::warn!(logger, "Failed to submit post-split compaction: {}", e);
        }
    }
}
