use crate::api::{BootstrapSource, TabletId, TabletServerErrorCode};
use crate::grpc::grpc_tablet_admin_client::GrpcTabletAdminClient;
use crate::grpc::ProtoFetchTabletFilesReq;
use crate::metadata::{consensus_metadata_from_proto, superblock_from_proto};
use crate::remote_bootstrap::{
    install_tablet_files, RemoteBootstrapClient, RemoteBootstrapClientFactory, RemoteBootstrapError,
    RemoteTabletSnapshot, TabletFile,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tonic::transport::{Channel, Endpoint};

/// Pulls a replica from a peer's admin service in a single `FetchTabletFiles` call.
pub struct GrpcRemoteBootstrapClient {
    logger: slog::Logger,
    tablet_id: TabletId,
    inner: GrpcTabletAdminClient<Channel>,
    files: Option<Vec<TabletFile>>,
}

impl GrpcRemoteBootstrapClient {
    pub async fn connect(
        logger: slog::Logger,
        tablet_id: TabletId,
        source: &BootstrapSource,
    ) -> Result<Self, RemoteBootstrapError> {
        let url = format!("http://{}", source.dial_addr());
        let endpoint =
            Endpoint::from_shared(url.clone()).map_err(|_| RemoteBootstrapError::InvalidAddress(url.clone()))?;
        slog::info!(logger, "Connecting to remote bootstrap source {} ...", url);
        let connection = endpoint.connect().await?;

        Ok(GrpcRemoteBootstrapClient {
            logger,
            tablet_id,
            inner: GrpcTabletAdminClient::new(connection),
            files: None,
        })
    }
}

#[async_trait::async_trait]
impl RemoteBootstrapClient for GrpcRemoteBootstrapClient {
    async fn start(&mut self) -> Result<RemoteTabletSnapshot, RemoteBootstrapError> {
        let rpc_request = ProtoFetchTabletFilesReq {
            tablet_id: self.tablet_id.as_str().to_string(),
        };
        let rpc_reply = self.inner.fetch_tablet_files(rpc_request).await?.into_inner();

        if let Some(error) = rpc_reply.error {
            return Err(RemoteBootstrapError::Rejected {
                code: TabletServerErrorCode::from_proto(error.code),
                message: error.message,
            });
        }

        let superblock = rpc_reply
            .superblock
            .ok_or_else(|| RemoteBootstrapError::Malformed("missing superblock".into()))
            .and_then(|proto| superblock_from_proto(proto).map_err(RemoteBootstrapError::Malformed))?;
        let consensus = rpc_reply
            .consensus_metadata
            .ok_or_else(|| RemoteBootstrapError::Malformed("missing consensus metadata".into()))
            .and_then(|proto| consensus_metadata_from_proto(proto).map_err(RemoteBootstrapError::Malformed))?;
        if superblock.tablet_id != self.tablet_id {
            return Err(RemoteBootstrapError::Malformed(format!(
                "asked for tablet {} but got {}",
                self.tablet_id, superblock.tablet_id
            )));
        }

        let files: Vec<TabletFile> = rpc_reply
            .files
            .into_iter()
            .map(|f| TabletFile {
                is_wal: f.is_wal,
                relative_path: PathBuf::from(f.relative_path),
                data: Bytes::from(f.data),
            })
            .collect();
        slog::info!(self.logger, "Remote bootstrap session started, {} files to copy", files.len());
        self.files = Some(files);

        Ok(RemoteTabletSnapshot { superblock, consensus })
    }

    async fn fetch_all(&mut self, data_dir: &Path, wal_dir: &Path) -> Result<(), RemoteBootstrapError> {
        let files = self.files.take().ok_or(RemoteBootstrapError::NotStarted)?;
        let (data_dir, wal_dir) = (data_dir.to_path_buf(), wal_dir.to_path_buf());
        tokio::task::spawn_blocking(move || install_tablet_files(&files, &data_dir, &wal_dir))
            .await
            .map_err(|e| RemoteBootstrapError::Malformed(format!("file install task failed: {}", e)))??;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), RemoteBootstrapError> {
        Ok(())
    }

    async fn remove(&mut self) {
        self.files = None;
    }
}

pub struct GrpcRemoteBootstrapClientFactory {
    logger: slog::Logger,
}

impl GrpcRemoteBootstrapClientFactory {
    pub fn new(logger: slog::Logger) -> Self {
        GrpcRemoteBootstrapClientFactory { logger }
    }
}

#[async_trait::async_trait]
impl RemoteBootstrapClientFactory for GrpcRemoteBootstrapClientFactory {
    async fn create(
        &self,
        tablet_id: &TabletId,
        source: &BootstrapSource,
        local_uuid: &str,
    ) -> Result<Box<dyn RemoteBootstrapClient>, RemoteBootstrapError> {
        let logger = self.logger.new(slog::o!(
            "TabletId" => tablet_id.to_string(),
            "Source" => source.peer_uuid.clone(),
            "Local" => local_uuid.to_string(),
        ));
        let client = GrpcRemoteBootstrapClient::connect(logger, tablet_id.clone(), source).await?;
        Ok(Box::new(client))
    }
}
