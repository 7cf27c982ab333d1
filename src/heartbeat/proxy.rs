use crate::api::TabletId;
use crate::registry::{TabletReport, TabletReportUpdates};

#[derive(Debug, thiserror::Error)]
pub enum HeartbeatError {
    #[error("Invalid coordinator address '{0}'")]
    InvalidAddress(String),
    #[error("Failed to connect to coordinator: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("Coordinator RPC failed: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("Coordinator rejected the request: {0}")]
    Rejected(String),
    #[error("Malformed coordinator message: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerRegistration {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeartbeatRequest {
    pub ts_uuid: String,
    pub registration: Option<ServerRegistration>,
    pub tablet_report: Option<TabletReport>,
    pub num_live_tablets: usize,
    pub leader_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeartbeatResponse {
    pub leader_master: bool,
    pub needs_reregister: bool,
    pub needs_full_tablet_report: bool,
    pub tablet_report_ack: Option<TabletReportUpdates>,
    /// Max tablets per report from now on. `None` keeps the current limit.
    pub tablet_report_limit: Option<usize>,
}

/// The coordinator as seen from a tablet server.
#[async_trait::async_trait]
pub trait CoordinatorProxy: Send + Sync {
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse, HeartbeatError>;

    /// Asks the coordinator to drop a replica that no longer serves data, e.g. a split parent.
    async fn delete_not_serving_tablet(&self, tablet_id: &TabletId) -> Result<(), HeartbeatError>;
}
