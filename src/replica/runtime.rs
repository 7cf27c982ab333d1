use crate::api::{OpId, TabletId};
use crate::metadata::{MetadataError, TabletMetadata};
use crate::replica::{ConsensusStateSnapshot, LeaderStatus};
use std::io;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("Metadata failure: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Replica not running: {0}")]
    NotRunning(String),
    #[error("Corruption: {0}")]
    Corruption(String),
    #[error("{0}")]
    Failed(String),
}

/// Non-owning path from a replica back to whoever tracks its reportable state.
pub trait StateChangeListener: Send + Sync {
    fn state_changed(&self, tablet_id: &TabletId, reason: &str);
}

/// The consensus + storage engine serving one replica. Calls may block on disk I/O.
pub trait ReplicaRuntime: Send + Sync {
    fn start(&self) -> Result<(), RuntimeError>;

    /// Idempotent.
    fn shutdown(&self);

    fn flush_log(&self) -> Result<(), RuntimeError>;

    /// Copies every log segment into `dest_wal_dir`.
    fn copy_log_to(&self, dest_wal_dir: &Path) -> Result<(), RuntimeError>;

    /// Materializes the current data files into `dest_data_dir`.
    fn create_checkpoint(&self, dest_data_dir: &Path) -> Result<(), RuntimeError>;

    fn last_logged_op_id(&self) -> OpId;

    /// `None` once consensus is unavailable.
    fn committed_config_opid_index(&self) -> Option<i64>;

    fn consensus_state(&self) -> Option<ConsensusStateSnapshot>;

    fn leader_status(&self) -> LeaderStatus;

    fn needs_post_split_compaction(&self) -> bool;

    /// Drops the data a split child does not own.
    fn compact(&self) -> Result<(), RuntimeError>;

    /// Set while post-split compaction is outstanding.
    fn should_disable_lb_move(&self) -> bool;

    fn verify_data_integrity(&self) -> Result<(), RuntimeError>;
}

pub struct BootstrapContext {
    pub logger: slog::Logger,
    pub local_uuid: String,
    pub metadata: Arc<TabletMetadata>,
    pub listener: Arc<dyn StateChangeListener>,
}

/// Builds a runtime for a replica: replays its log and readies its storage.
pub trait ReplicaRuntimeFactory: Send + Sync {
    fn bootstrap(&self, context: BootstrapContext) -> Result<Arc<dyn ReplicaRuntime>, RuntimeError>;
}
