use crate::api::{BootstrapSource, TableInfo, TableId, TabletId, TabletManagerError};
use crate::grpc::grpc_tablet_admin_server::{GrpcTabletAdmin, GrpcTabletAdminServer};
use crate::grpc::{
    ProtoCreateTabletReq, ProtoCreateTabletResp, ProtoDeleteTabletReq, ProtoDeleteTabletResp, ProtoFetchTabletFilesReq,
    ProtoFetchTabletFilesResp, ProtoStartRemoteBootstrapReq, ProtoStartRemoteBootstrapResp, ProtoTabletFile,
    ProtoTabletServerError,
};
use crate::manager::{DeleteRequest, RemoteBootstrapRequest, TabletManager};
use crate::metadata::{
    consensus_metadata_to_proto, partition_from_proto, raft_config_from_proto, superblock_to_proto,
    ConsensusMetadata, DataState,
};
use crate::remote_bootstrap::collect_tablet_files;
use crate::server::ServerShutdownSignal;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Tablet administration RPCs of one tablet server, served by its `TabletManager`.
pub struct TabletAdminService {
    logger: slog::Logger,
    manager: Arc<TabletManager>,
}

impl TabletAdminService {
    pub fn new(logger: slog::Logger, manager: Arc<TabletManager>) -> Self {
        TabletAdminService { logger, manager }
    }

    pub fn into_server(self) -> GrpcTabletAdminServer<Self> {
        GrpcTabletAdminServer::new(self)
    }

    pub async fn run(self, socket_addr: SocketAddr, shutdown_signal: ServerShutdownSignal) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", socket_addr);

        let result = Server::builder()
            .add_service(self.into_server())
            .serve_with_shutdown(socket_addr, shutdown_signal)
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    async fn handle_create_tablet(&self, rpc_request: ProtoCreateTabletReq) -> Result<ProtoCreateTabletResp, Status> {
        let config = rpc_request
            .config
            .ok_or_else(|| Status::invalid_argument("Missing raft config"))
            .and_then(|config| raft_config_from_proto(config).map_err(Status::invalid_argument))?;
        let table = TableInfo {
            table_id: TableId::parse(rpc_request.table_id).map_err(Status::invalid_argument)?,
            table_name: rpc_request.table_name,
        };
        let tablet_id = TabletId::parse(rpc_request.tablet_id).map_err(Status::invalid_argument)?;
        let partition = partition_from_proto(rpc_request.partition);

        let manager = self.manager.clone();
        let app_result = run_blocking(move || {
            manager
                .create_new_tablet(&table, &tablet_id, partition, config)
                .map(|_| ())
        })
        .await?;

        Ok(ProtoCreateTabletResp {
            error: Self::convert_error(app_result),
        })
    }

    async fn handle_delete_tablet(&self, rpc_request: ProtoDeleteTabletReq) -> Result<ProtoDeleteTabletResp, Status> {
        let app_request = Self::convert_delete_input(rpc_request)?;

        let manager = self.manager.clone();
        let app_result = run_blocking(move || manager.delete_tablet(&app_request)).await?;

        Ok(ProtoDeleteTabletResp {
            error: Self::convert_error(app_result),
        })
    }

    fn convert_delete_input(rpc_request: ProtoDeleteTabletReq) -> Result<DeleteRequest, Status> {
        let delete_type = DataState::from_proto(rpc_request.delete_type)
            .ok_or_else(|| Status::invalid_argument(format!("Unknown delete type {}", rpc_request.delete_type)))?;

        let tablet_id = TabletId::parse(rpc_request.tablet_id).map_err(Status::invalid_argument)?;
        let mut app_request = DeleteRequest::new(tablet_id, delete_type);
        if rpc_request.has_cas_config_opid_index {
            app_request.cas_config_opid_index_less_or_equal = Some(rpc_request.cas_config_opid_index_less_or_equal);
        }
        app_request.hide_only = rpc_request.hide_only;
        Ok(app_request)
    }

    async fn handle_start_remote_bootstrap(
        &self,
        rpc_request: ProtoStartRemoteBootstrapReq,
    ) -> Result<ProtoStartRemoteBootstrapResp, Status> {
        if rpc_request.source_private_addr.is_empty() && rpc_request.source_broadcast_addr.is_empty() {
            return Err(Status::invalid_argument("Missing bootstrap source address"));
        }
        let app_request = RemoteBootstrapRequest {
            tablet_id: TabletId::parse(rpc_request.tablet_id).map_err(Status::invalid_argument)?,
            source: BootstrapSource {
                peer_uuid: rpc_request.bootstrap_peer_uuid,
                private_addr: rpc_request.source_private_addr,
                broadcast_addr: rpc_request.source_broadcast_addr,
            },
            caller_term: rpc_request.caller_term,
        };

        let app_result = self.manager.start_remote_bootstrap(app_request).await;

        Ok(ProtoStartRemoteBootstrapResp {
            error: Self::convert_error(app_result),
        })
    }

    async fn handle_fetch_tablet_files(
        &self,
        rpc_request: ProtoFetchTabletFilesReq,
    ) -> Result<ProtoFetchTabletFilesResp, Status> {
        let tablet_id = TabletId::parse(rpc_request.tablet_id).map_err(Status::invalid_argument)?;
        let manager = self.manager.clone();
        let app_result = run_blocking(move || Self::snapshot_tablet(&manager, &tablet_id)).await?;

        Ok(app_result.unwrap_or_else(|e| ProtoFetchTabletFilesResp {
            error: Self::convert_error(Err(e)),
            ..Default::default()
        }))
    }

    /// Everything a peer needs to rebuild this replica: superblock, consensus metadata, files.
    fn snapshot_tablet(
        manager: &TabletManager,
        tablet_id: &TabletId,
    ) -> Result<ProtoFetchTabletFilesResp, TabletManagerError> {
        let handle = manager.get_tablet(tablet_id)?;
        let runtime = handle.runtime().ok_or_else(|| TabletManagerError::TabletNotRunning {
            tablet_id: tablet_id.clone(),
            reason: format!("state {:?}", handle.state()),
        })?;
        runtime.flush_log()?;

        let metadata = handle.metadata();
        let superblock = metadata.snapshot();
        let cmeta = ConsensusMetadata::load(manager.layout(), tablet_id)?;
        let files = collect_tablet_files(&metadata.data_dir(), &metadata.wal_dir())?;

        Ok(ProtoFetchTabletFilesResp {
            error: None,
            superblock: Some(superblock_to_proto(&superblock)),
            consensus_metadata: Some(consensus_metadata_to_proto(&cmeta)),
            files: files
                .into_iter()
                .map(|f| ProtoTabletFile {
                    is_wal: f.is_wal,
                    relative_path: f.relative_path.to_string_lossy().into_owned(),
                    data: f.data.to_vec(),
                })
                .collect(),
        })
    }

    fn convert_error(app_result: Result<(), TabletManagerError>) -> Option<ProtoTabletServerError> {
        match app_result {
            Ok(()) => None,
            Err(e) => Some(ProtoTabletServerError {
                code: e.error_code().to_proto(),
                message: e.to_string(),
            }),
        }
    }
}

async fn run_blocking<F, T>(f: F) -> Result<T, Status>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Status::internal(format!("Handler task failed: {}", e)))
}

#[async_trait::async_trait]
impl GrpcTabletAdmin for TabletAdminService {
    async fn create_tablet(
        &self,
        rpc_request_wrapped: Request<ProtoCreateTabletReq>,
    ) -> Result<Response<ProtoCreateTabletResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_create_tablet(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn delete_tablet(
        &self,
        rpc_request_wrapped: Request<ProtoDeleteTabletReq>,
    ) -> Result<Response<ProtoDeleteTabletResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_delete_tablet(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn start_remote_bootstrap(
        &self,
        rpc_request_wrapped: Request<ProtoStartRemoteBootstrapReq>,
    ) -> Result<Response<ProtoStartRemoteBootstrapResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_start_remote_bootstrap(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn fetch_tablet_files(
        &self,
        rpc_request_wrapped: Request<ProtoFetchTabletFilesReq>,
    ) -> Result<Response<ProtoFetchTabletFilesResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        // File contents are too large for the wire log.
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_fetch_tablet_files(rpc_request).await;
        if let Ok(reply) = &rpc_result {
            slog::debug!(self.logger, "ServerWire - {} files, error {:?}", reply.files.len(), reply.error);
        }

        rpc_result.map(Response::new)
    }
}
