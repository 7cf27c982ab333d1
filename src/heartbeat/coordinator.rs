use crate::api::TabletId;
use crate::grpc::grpc_coordinator_server::{GrpcCoordinator, GrpcCoordinatorServer};
use crate::grpc::{ProtoDeleteNotServingTabletReq, ProtoDeleteNotServingTabletResp, ProtoHeartbeatReq, ProtoHeartbeatResp};
use crate::heartbeat::convert::{request_from_proto, response_to_proto};
use crate::heartbeat::{CoordinatorProxy, HeartbeatError, HeartbeatRequest, HeartbeatResponse, ServerRegistration};
use crate::registry::{ReportedTablet, TabletReport, TabletReportUpdates};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tonic::{Request, Response, Status};

struct TabletServerEntry {
    registration: ServerRegistration,
    tablets: BTreeMap<TabletId, ReportedTablet>,
    has_full_report: bool,
    last_report_seq: u64,
}

#[derive(Default)]
struct CoordinatorState {
    servers: HashMap<String, TabletServerEntry>,
    report_limit: Option<usize>,
    deleted_not_serving: Vec<TabletId>,
}

/// Minimal in-memory coordinator. Keeps the last reported state of every tablet per server and
/// acknowledges reports the way the real coordinator does.
pub struct Coordinator {
    logger: slog::Logger,
    inner: Mutex<CoordinatorState>,
}

impl Coordinator {
    pub fn new(logger: slog::Logger) -> Self {
        Coordinator {
            logger,
            inner: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Caps reports sent after the next heartbeat.
    pub fn set_report_limit(&self, limit: Option<usize>) {
        self.inner.lock().report_limit = limit;
    }

    /// Forgets a server so its next heartbeat is told to re-register.
    pub fn forget_server(&self, ts_uuid: &str) {
        self.inner.lock().servers.remove(ts_uuid);
    }

    pub fn registration(&self, ts_uuid: &str) -> Option<ServerRegistration> {
        self.inner.lock().servers.get(ts_uuid).map(|s| s.registration.clone())
    }

    pub fn last_report_seq(&self, ts_uuid: &str) -> Option<u64> {
        self.inner.lock().servers.get(ts_uuid).map(|s| s.last_report_seq)
    }

    pub fn reported_tablet(&self, ts_uuid: &str, tablet_id: &TabletId) -> Option<ReportedTablet> {
        self.inner
            .lock()
            .servers
            .get(ts_uuid)
            .and_then(|s| s.tablets.get(tablet_id).cloned())
    }

    pub fn tablet_ids(&self, ts_uuid: &str) -> Vec<TabletId> {
        self.inner
            .lock()
            .servers
            .get(ts_uuid)
            .map(|s| s.tablets.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn deleted_not_serving_tablets(&self) -> Vec<TabletId> {
        self.inner.lock().deleted_not_serving.clone()
    }

    /// Registration and report-shape half of a heartbeat response.
    pub fn fill_heartbeat_response(&self, request: &HeartbeatRequest) -> HeartbeatResponse {
        let mut inner = self.inner.lock();
        if let Some(registration) = &request.registration {
            slog::info!(self.logger, "Registered tablet server {} at {:?}", request.ts_uuid, registration);
            inner.servers.insert(
                request.ts_uuid.clone(),
                TabletServerEntry {
                    registration: registration.clone(),
                    tablets: BTreeMap::new(),
                    has_full_report: false,
                    last_report_seq: 0,
                },
            );
        }
        let report_limit = inner.report_limit;

        match inner.servers.get(&request.ts_uuid) {
            None => HeartbeatResponse {
                leader_master: true,
                needs_reregister: true,
                needs_full_tablet_report: true,
                tablet_report_ack: None,
                tablet_report_limit: report_limit,
            },
            Some(server) => {
                let sending_full = request
                    .tablet_report
                    .as_ref()
                    .map(|report| !report.is_incremental)
                    .unwrap_or(false);
                HeartbeatResponse {
                    leader_master: true,
                    needs_reregister: false,
                    needs_full_tablet_report: !server.has_full_report && !sending_full,
                    tablet_report_ack: None,
                    tablet_report_limit: report_limit,
                }
            }
        }
    }

    /// Applies a report and returns its acknowledgment.
    pub fn process_tablet_report(
        &self,
        ts_uuid: &str,
        report: &TabletReport,
    ) -> Result<TabletReportUpdates, HeartbeatError> {
        let mut inner = self.inner.lock();
        let server = inner
            .servers
            .get_mut(ts_uuid)
            .ok_or_else(|| HeartbeatError::Rejected(format!("tablet server {} is not registered", ts_uuid)))?;

        if !report.is_incremental {
            server.tablets.clear();
            server.has_full_report = true;
        }
        server.last_report_seq = report.sequence_number;

        let mut tablet_ids = Vec::with_capacity(report.updated_tablets.len() + report.removed_tablet_ids.len());
        for tablet in report.updated_tablets.iter() {
            server.tablets.insert(tablet.tablet_id.clone(), tablet.clone());
            tablet_ids.push(tablet.tablet_id.clone());
        }
        for tablet_id in report.removed_tablet_ids.iter() {
            server.tablets.remove(tablet_id);
            tablet_ids.push(tablet_id.clone());
        }

        slog::debug!(
            self.logger,
            "Processed report {} from {}: {} tablets, {} remaining",
            report.sequence_number,
            ts_uuid,
            tablet_ids.len(),
            report.remaining_tablet_count
        );
        Ok(TabletReportUpdates {
            sequence_number: report.sequence_number,
            tablet_ids,
        })
    }

    pub fn handle_heartbeat(&self, request: &HeartbeatRequest) -> HeartbeatResponse {
        let mut response = self.fill_heartbeat_response(request);
        if response.needs_reregister {
            return response;
        }
        if let Some(report) = &request.tablet_report {
            match self.process_tablet_report(&request.ts_uuid, report) {
                Ok(ack) => response.tablet_report_ack = Some(ack),
                Err(e) => slog::warn!(self.logger, "Dropping tablet report: {}", e),
            }
        }
        response
    }

    pub fn handle_delete_not_serving_tablet(&self, tablet_id: &TabletId) {
        let mut inner = self.inner.lock();
        for server in inner.servers.values_mut() {
            server.tablets.remove(tablet_id);
        }
        inner.deleted_not_serving.push(tablet_id.clone());
        slog::info!(self.logger, "Deleted not serving tablet"; "TabletId" => %tablet_id);
    }
}

#[async_trait::async_trait]
impl CoordinatorProxy for Coordinator {
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse, HeartbeatError> {
        Ok(self.handle_heartbeat(&request))
    }

    async fn delete_not_serving_tablet(&self, tablet_id: &TabletId) -> Result<(), HeartbeatError> {
        self.handle_delete_not_serving_tablet(tablet_id);
        Ok(())
    }
}

/// Serves a `Coordinator` over gRPC.
pub struct CoordinatorService {
    logger: slog::Logger,
    coordinator: Arc<Coordinator>,
}

impl CoordinatorService {
    pub fn new(logger: slog::Logger, coordinator: Arc<Coordinator>) -> Self {
        CoordinatorService { logger, coordinator }
    }

    pub fn into_server(self) -> GrpcCoordinatorServer<Self> {
        GrpcCoordinatorServer::new(self)
    }
}

#[async_trait::async_trait]
impl GrpcCoordinator for CoordinatorService {
    async fn heartbeat(
        &self,
        rpc_request_wrapped: Request<ProtoHeartbeatReq>,
    ) -> Result<Response<ProtoHeartbeatResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);

        let request = request_from_proto(rpc_request).map_err(|e| Status::invalid_argument(e.to_string()))?;
        let response = self.coordinator.handle_heartbeat(&request);
        let rpc_reply = response_to_proto(&response);

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_reply);
        Ok(Response::new(rpc_reply))
    }

    async fn delete_not_serving_tablet(
        &self,
        rpc_request_wrapped: Request<ProtoDeleteNotServingTabletReq>,
    ) -> Result<Response<ProtoDeleteNotServingTabletResp>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();
        self.coordinator
            .handle_delete_not_serving_tablet(&TabletId::new(rpc_request.tablet_id));
        Ok(Response::new(ProtoDeleteNotServingTabletResp { error: String::new() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DataState;
    use crate::replica::RuntimeState;
    use std::path::PathBuf;

    fn coordinator() -> Coordinator {
        Coordinator::new(slog::Logger::root(slog::Discard, slog::o!()))
    }

    fn tablet(id: &str) -> ReportedTablet {
        ReportedTablet {
            tablet_id: TabletId::new(id),
            state: RuntimeState::Running,
            data_state: DataState::Ready,
            committed_consensus_state: None,
            error: None,
            should_disable_lb_move: false,
            fs_data_dir: PathBuf::from("/data"),
            is_hidden: false,
        }
    }

    fn request(report: Option<TabletReport>, register: bool) -> HeartbeatRequest {
        HeartbeatRequest {
            ts_uuid: "ts-1".into(),
            registration: if register {
                Some(ServerRegistration {
                    host: "127.0.0.1".into(),
                    port: 9100,
                })
            } else {
                None
            },
            tablet_report: report,
            num_live_tablets: 0,
            leader_count: 0,
        }
    }

    #[test]
    fn unknown_server_must_register() {
        let coordinator = coordinator();

        let response = coordinator.handle_heartbeat(&request(None, false));

        assert!(response.needs_reregister);
        assert!(response.needs_full_tablet_report);
    }

    #[test]
    fn full_report_replaces_and_incremental_patches() {
        // -- setup --
        let coordinator = coordinator();
        let full = TabletReport {
            is_incremental: false,
            sequence_number: 1,
            updated_tablets: vec![tablet("a"), tablet("b")],
            removed_tablet_ids: Vec::new(),
            remaining_tablet_count: 0,
        };

        // -- execute & verify --
        let response = coordinator.handle_heartbeat(&request(Some(full), true));
        assert!(!response.needs_full_tablet_report);
        assert_eq!(response.tablet_report_ack.unwrap().tablet_ids.len(), 2);

        let incremental = TabletReport {
            is_incremental: true,
            sequence_number: 2,
            updated_tablets: vec![tablet("c")],
            removed_tablet_ids: vec![TabletId::new("a")],
            remaining_tablet_count: 0,
        };
        let response = coordinator.handle_heartbeat(&request(Some(incremental), false));
        assert_eq!(response.tablet_report_ack.unwrap().sequence_number, 2);
        assert_eq!(coordinator.tablet_ids("ts-1"), vec![TabletId::new("b"), TabletId::new("c")]);
    }

    #[test]
    fn registration_without_report_asks_for_full_report() {
        let coordinator = coordinator();
        coordinator.set_report_limit(Some(5));

        let response = coordinator.handle_heartbeat(&request(None, true));

        assert!(!response.needs_reregister);
        assert!(response.needs_full_tablet_report);
        assert_eq!(response.tablet_report_limit, Some(5));
    }
}
