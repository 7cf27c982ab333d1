use crate::manager::TabletManager;
use crate::registry::ManagerState;
use crate::util::fatal;
use std::sync::Arc;
use tokio::time::Instant;

impl TabletManager {
    /// QUIESCING, wait out remote bootstraps, stop opening, shut every replica down, SHUTDOWN.
    /// Later calls return immediately.
    pub async fn shutdown(self: &Arc<Self>) {
        if !self.registry.advance_state(ManagerState::Quiescing) {
            slog::info!(self.logger, "Tablet manager already shutting down");
            return;
        }
        self.pollers.lock().clear();

        self.wait_for_remote_bootstraps().await;
        self.open_pool.shutdown().await;

        let handles = self.registry.handles();
        for handle in handles.iter() {
            handle.start_shutdown();
        }
        let logger = self.logger.clone();
        let stopped = tokio::task::spawn_blocking(move || {
            for handle in handles.iter() {
                handle.complete_shutdown();
            }
        })
        .await;
        if let Err(e) = stopped {
            slog::error!(logger, "Failed to shut down tablets: {}", e);
        }

        self.apply_pool.shutdown().await;
        self.compaction_pool.shutdown().await;
        self.registry.clear();
        self.balancer.clear();
        self.registry.advance_state(ManagerState::Shutdown);
        slog::info!(self.logger, "Tablet manager shut down");
    }

    async fn wait_for_remote_bootstraps(&self) {
        let started = Instant::now();
        let report_interval = self.config.remote_bootstrap_shutdown_report_interval;
        let mut next_report = report_interval;

        loop {
            let in_flight = self
                .num_remote_bootstraps_in_flight()
                .max(self.registry.num_being_remote_bootstrapped());
            if in_flight == 0 {
                return;
            }

            let waited = started.elapsed();
            if waited >= self.config.remote_bootstrap_shutdown_max_wait {
                fatal(
                    &self.logger,
                    &format!(
                        "Waited {:?} for {} remote bootstraps to finish, sources: {:?}",
                        waited,
                        in_flight,
                        self.registry.bootstrap_sources()
                    ),
                );
            }
            if waited >= next_report {
                slog::warn!(
                    self.logger,
                    "Still waiting for {} remote bootstraps after {:?}, sources: {:?}",
                    in_flight,
                    waited,
                    self.registry.bootstrap_sources()
                );
                next_report += report_interval;
            }
            tokio::time::sleep(self.config.remote_bootstrap_shutdown_single_wait).await;
        }
    }
}
