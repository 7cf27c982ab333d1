use crate::manager::TabletManager;
use crate::server::ServerShutdownHandle;
use crate::util::Stopper;
use std::sync::Arc;

/// A running tablet server: its manager, admin RPC server and heartbeater.
pub struct TabletServer {
    pub(super) logger: slog::Logger,
    pub(super) manager: Arc<TabletManager>,
    pub(super) server_shutdown_handle: ServerShutdownHandle,
    pub(super) heartbeater: Option<Stopper>,
}

impl TabletServer {
    pub fn manager(&self) -> &Arc<TabletManager> {
        &self.manager
    }

    /// Stops heartbeating and serving RPCs, then shuts the manager down.
    pub async fn shutdown(self) {
        drop(self.heartbeater);
        self.server_shutdown_handle.shutdown();
        self.manager.shutdown().await;
        slog::info!(self.logger, "Tablet server stopped");
    }
}
