use crate::heartbeat::CoordinatorProxy;
use crate::manager::TabletManager;
use crate::metadata::DataState;
use crate::replica::RuntimeState;
use crate::util::{stop_signal, StopCheck};
use std::sync::Arc;
use tokio::time::Duration;

impl TabletManager {
    /// Starts the split-parent cleanup and data verification pollers. Shutdown stops them.
    pub fn start_background_tasks(self: &Arc<Self>, coordinator: Arc<dyn CoordinatorProxy>) {
        let mut pollers = self.pollers.lock();

        let interval = self.config.cleanup_split_tablets_interval;
        if interval > Duration::from_secs(0) {
            let (stopper, stop_check) = stop_signal();
            let manager = self.clone();
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                while sleep_unless_stopped(interval, &stop_check).await {
                    manager.cleanup_split_tablets(&*coordinator).await;
                }
            });
            pollers.push(stopper);
        }

        let interval = self.config.verify_tablet_data_interval;
        if interval > Duration::from_secs(0) {
            let (stopper, stop_check) = stop_signal();
            let manager = self.clone();
            tokio::spawn(async move {
                while sleep_unless_stopped(interval, &stop_check).await {
                    manager.verify_tablet_data().await;
                }
            });
            pollers.push(stopper);
        }
    }

    /// Asks the coordinator to drop SPLIT_COMPLETED parents whose children are both running.
    /// Returns how many were handed off.
    pub async fn cleanup_split_tablets(&self, coordinator: &dyn CoordinatorProxy) -> usize {
        let mut deleted = 0;
        for handle in self.tablets() {
            if handle.data_state() != DataState::SplitCompleted {
                continue;
            }
            let children = handle.metadata().snapshot().split_child_tablet_ids;
            let children_running = children.len() == 2
                && children.iter().all(|child_id| {
                    self.registry
                        .lookup(child_id)
                        .map(|child| child.state() == RuntimeState::Running)
                        .unwrap_or(false)
                });
            if !children_running {
                continue;
            }

            match coordinator.delete_not_serving_tablet(handle.tablet_id()).await {
                Ok(()) => {
                    slog::info!(self.logger, "Asked coordinator to delete split parent"; "TabletId" => %handle.tablet_id());
                    deleted += 1;
                }
                Err(e) => {
                    slog::warn!(self.logger, "Failed to delete split parent: {}", e; "TabletId" => %handle.tablet_id());
                }
            }
        }
        deleted
    }

    /// Checks every running replica's on-disk data. Corrupt replicas are marked FAILED.
    /// Returns how many failed verification.
    pub async fn verify_tablet_data(self: &Arc<Self>) -> usize {
        let mut failed = 0;
        for handle in self.tablets() {
            if handle.state() != RuntimeState::Running {
                continue;
            }
            let runtime = match handle.runtime() {
                Some(runtime) => runtime,
                None => continue,
            };
            let verified = tokio::task::spawn_blocking(move || runtime.verify_data_integrity()).await;
            let cause = match verified {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) => format!("verification task failed: {}", e),
            };
            handle.set_failed(format!("Data verification failed: {}", cause));
            failed += 1;
        }
        failed
    }
}

/// Sleeps for `interval`. False if the poller should exit.
async fn sleep_unless_stopped(interval: Duration, stop_check: &StopCheck) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => !stop_check.should_stop(),
        _ = stop_check.stopped() => false,
    }
}
