use crate::api::options::{FaultInjectionOptions, FsOptions, TabletManagerOptions};
use crate::api::{TabletManagerConfig, TabletManagerError, TabletServer};
use crate::fault::FaultInjector;
use crate::heartbeat::{CoordinatorProxy, GrpcCoordinatorProxy, HeartbeatError, Heartbeater, HeartbeaterConfig, ServerRegistration};
use crate::manager::{TabletManager, TabletManagerParts};
use crate::metadata::{FsLayout, MetadataError};
use crate::registry::HeartbeatTrigger;
use crate::remote_bootstrap::GrpcRemoteBootstrapClientFactory;
use crate::replica::LocalReplicaRuntimeFactory;
use crate::server::{self, TabletAdminService};
use std::convert::TryFrom;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Duration;

pub struct TabletServerConfig {
    pub info_logger: slog::Logger,
    pub fs: FsOptions,
    /// Address the admin RPC server listens on.
    pub rpc_bind_addr: SocketAddr,
    /// Address peers and the coordinator should use to reach us.
    pub advertised_host: String,
    /// No heartbeats or background pollers without a coordinator.
    pub coordinator_addr: Option<String>,
    pub heartbeat_interval: Duration,
    pub options: TabletManagerOptions,
    pub fault_injection: FaultInjectionOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum TabletServerCreationError {
    #[error("Illegal options for configuring the tablet server: {0}")]
    IllegalOptions(String),
    #[error("Failed to open fs layout: {0}")]
    FsLayout(#[from] MetadataError),
    #[error("Tablet manager failure: {0}")]
    Manager(#[from] TabletManagerError),
    #[error("Failed to reach the coordinator: {0}")]
    Coordinator(#[from] HeartbeatError),
}

/// Opens the local fs layout, loads every replica found there, starts serving admin RPCs and,
/// when a coordinator is configured, starts heartbeating to it.
pub async fn try_create_tablet_server(config: TabletServerConfig) -> Result<TabletServer, TabletServerCreationError> {
    let root_logger = config.info_logger;

    let manager_config = TabletManagerConfig::try_from(config.options)
        .map_err(|e| TabletServerCreationError::IllegalOptions(e.to_string()))?;
    let initial_report_limit = manager_config.initial_tablet_report_limit;
    let layout = Arc::new(FsLayout::open_or_create(&config.fs)?);
    let ts_uuid = layout.uuid().to_string();
    let logger = root_logger.new(slog::o!("TServer" => ts_uuid.clone()));

    let manager = TabletManager::new(TabletManagerParts {
        logger: logger.clone(),
        config: manager_config,
        layout,
        runtime_factory: Arc::new(LocalReplicaRuntimeFactory),
        remote_bootstrap_client_factory: Arc::new(GrpcRemoteBootstrapClientFactory::new(logger.clone())),
        faults: FaultInjector::new(logger.clone(), config.fault_injection),
        heartbeat_trigger: HeartbeatTrigger::new(),
    })?;

    let init_manager = manager.clone();
    tokio::task::spawn_blocking(move || init_manager.init())
        .await
        .map_err(|e| TabletServerCreationError::IllegalOptions(format!("init task failed: {}", e)))??;

    let (server_shutdown_handle, server_shutdown_signal) = server::shutdown_signal();
    let admin_service = TabletAdminService::new(logger.clone(), manager.clone());
    tokio::spawn(admin_service.run(config.rpc_bind_addr, server_shutdown_signal));

    let heartbeater = match config.coordinator_addr {
        None => None,
        Some(addr) => {
            let coordinator: Arc<dyn CoordinatorProxy> =
                Arc::new(GrpcCoordinatorProxy::connect(logger.clone(), &addr).await?);
            manager.start_background_tasks(coordinator.clone());

            let heartbeater = Heartbeater::new(
                logger.clone(),
                HeartbeaterConfig {
                    ts_uuid,
                    registration: ServerRegistration {
                        host: config.advertised_host,
                        port: config.rpc_bind_addr.port(),
                    },
                    interval: config.heartbeat_interval,
                    initial_report_limit,
                },
                manager.clone(),
                coordinator,
            );
            Some(heartbeater.start())
        }
    };

    Ok(TabletServer {
        logger,
        manager,
        server_shutdown_handle,
        heartbeater,
    })
}
