use crate::api::{BootstrapSource, MemberType, TabletId, TabletServerErrorCode};
use crate::metadata::{ConsensusMetadata, MetadataError, Superblock};
use crate::replica::ReplicaRuntime;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum RemoteBootstrapError {
    #[error("Invalid source address '{0}'")]
    InvalidAddress(String),
    #[error("Failed to connect to source: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("RPC to source failed: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("Source rejected the request ({code:?}): {message}")]
    Rejected {
        code: TabletServerErrorCode,
        message: String,
    },
    #[error("Source sent a malformed response: {0}")]
    Malformed(String),
    #[error("Session not started")]
    NotStarted,
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("Metadata failure: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Role change not observed within {0:?}")]
    VerifyTimeout(Duration),
}

/// What the source knows about the replica when the session starts.
#[derive(Clone, Debug)]
pub struct RemoteTabletSnapshot {
    pub superblock: Superblock,
    pub consensus: ConsensusMetadata,
}

/// One remote bootstrap session against one source peer.
#[async_trait::async_trait]
pub trait RemoteBootstrapClient: Send {
    async fn start(&mut self) -> Result<RemoteTabletSnapshot, RemoteBootstrapError>;

    /// Writes every data file and log segment into the given directories.
    async fn fetch_all(&mut self, data_dir: &Path, wal_dir: &Path) -> Result<(), RemoteBootstrapError>;

    async fn finish(&mut self) -> Result<(), RemoteBootstrapError>;

    /// Waits until the coordinator has promoted the new replica out of its pre-member role.
    async fn verify_change_role_succeeded(
        &mut self,
        local_uuid: &str,
        runtime: Arc<dyn ReplicaRuntime>,
        timeout: Duration,
    ) -> Result<(), RemoteBootstrapError> {
        verify_change_role_succeeded(local_uuid, runtime, timeout).await
    }

    /// Tears the session down on the source. Best effort.
    async fn remove(&mut self);
}

#[async_trait::async_trait]
pub trait RemoteBootstrapClientFactory: Send + Sync {
    async fn create(
        &self,
        tablet_id: &TabletId,
        source: &BootstrapSource,
        local_uuid: &str,
    ) -> Result<Box<dyn RemoteBootstrapClient>, RemoteBootstrapError>;
}

const VERIFY_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub async fn verify_change_role_succeeded(
    local_uuid: &str,
    runtime: Arc<dyn ReplicaRuntime>,
    timeout: Duration,
) -> Result<(), RemoteBootstrapError> {
    let deadline = Instant::now() + timeout;
    loop {
        let promoted = runtime
            .consensus_state()
            .and_then(|state| state.config.peer(local_uuid).map(|peer| peer.member_type))
            .map(|member_type| matches!(member_type, MemberType::Voter | MemberType::Observer))
            .unwrap_or(false);
        if promoted {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RemoteBootstrapError::VerifyTimeout(timeout));
        }
        tokio::time::sleep(VERIFY_POLL_INTERVAL).await;
    }
}
