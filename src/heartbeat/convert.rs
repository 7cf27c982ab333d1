use crate::api::TabletId;
use crate::grpc::{
    ProtoConsensusState, ProtoHeartbeatReq, ProtoHeartbeatResp, ProtoReportedTablet, ProtoServerRegistration,
    ProtoTabletReport, ProtoTabletReportUpdates,
};
use crate::heartbeat::{HeartbeatError, HeartbeatRequest, HeartbeatResponse, ServerRegistration};
use crate::metadata::{raft_config_from_proto, raft_config_to_proto, DataState};
use crate::registry::{ReportedTablet, TabletReport, TabletReportUpdates};
use crate::replica::{ConsensusStateSnapshot, RuntimeState};
use std::convert::TryFrom;
use std::path::PathBuf;

fn malformed(message: impl Into<String>) -> HeartbeatError {
    HeartbeatError::Malformed(message.into())
}

pub(super) fn reported_tablet_to_proto(tablet: &ReportedTablet) -> ProtoReportedTablet {
    ProtoReportedTablet {
        tablet_id: tablet.tablet_id.as_str().to_string(),
        state: tablet.state.to_proto(),
        data_state: tablet.data_state.to_proto(),
        committed_consensus_state: tablet.committed_consensus_state.as_ref().map(|cstate| ProtoConsensusState {
            current_term: cstate.current_term,
            leader_uuid: cstate.leader_uuid.clone().unwrap_or_default(),
            config: Some(raft_config_to_proto(&cstate.config)),
        }),
        error: tablet.error.clone().unwrap_or_default(),
        should_disable_lb_move: tablet.should_disable_lb_move,
        fs_data_dir: tablet.fs_data_dir.to_string_lossy().into_owned(),
        is_hidden: tablet.is_hidden,
    }
}

pub(super) fn reported_tablet_from_proto(proto: ProtoReportedTablet) -> Result<ReportedTablet, HeartbeatError> {
    let state = RuntimeState::from_proto(proto.state).ok_or_else(|| malformed("unknown runtime state"))?;
    let data_state = DataState::from_proto(proto.data_state).ok_or_else(|| malformed("unknown data state"))?;
    let committed_consensus_state = match proto.committed_consensus_state {
        None => None,
        Some(cstate) => {
            let config = cstate
                .config
                .ok_or_else(|| malformed("consensus state without config"))
                .and_then(|config| raft_config_from_proto(config).map_err(malformed))?;
            Some(ConsensusStateSnapshot {
                current_term: cstate.current_term,
                leader_uuid: Some(cstate.leader_uuid).filter(|uuid| !uuid.is_empty()),
                config,
            })
        }
    };

    Ok(ReportedTablet {
        tablet_id: TabletId::new(proto.tablet_id),
        state,
        data_state,
        committed_consensus_state,
        error: Some(proto.error).filter(|e| !e.is_empty()),
        should_disable_lb_move: proto.should_disable_lb_move,
        fs_data_dir: PathBuf::from(proto.fs_data_dir),
        is_hidden: proto.is_hidden,
    })
}

pub(super) fn report_to_proto(report: &TabletReport) -> ProtoTabletReport {
    ProtoTabletReport {
        is_incremental: report.is_incremental,
        updated_tablets: report.updated_tablets.iter().map(reported_tablet_to_proto).collect(),
        removed_tablet_ids: report
            .removed_tablet_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect(),
        sequence_number: report.sequence_number,
        remaining_tablet_count: u32::try_from(report.remaining_tablet_count).unwrap_or(u32::MAX),
    }
}

pub(super) fn report_from_proto(proto: ProtoTabletReport) -> Result<TabletReport, HeartbeatError> {
    let updated_tablets = proto
        .updated_tablets
        .into_iter()
        .map(reported_tablet_from_proto)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TabletReport {
        is_incremental: proto.is_incremental,
        sequence_number: proto.sequence_number,
        updated_tablets,
        removed_tablet_ids: proto.removed_tablet_ids.into_iter().map(TabletId::new).collect(),
        remaining_tablet_count: proto.remaining_tablet_count as usize,
    })
}

fn updates_to_proto(updates: &TabletReportUpdates) -> ProtoTabletReportUpdates {
    ProtoTabletReportUpdates {
        sequence_number: updates.sequence_number,
        tablet_ids: updates.tablet_ids.iter().map(|id| id.as_str().to_string()).collect(),
    }
}

fn updates_from_proto(proto: ProtoTabletReportUpdates) -> TabletReportUpdates {
    TabletReportUpdates {
        sequence_number: proto.sequence_number,
        tablet_ids: proto.tablet_ids.into_iter().map(TabletId::new).collect(),
    }
}

pub(super) fn request_to_proto(request: &HeartbeatRequest) -> ProtoHeartbeatReq {
    ProtoHeartbeatReq {
        ts_uuid: request.ts_uuid.clone(),
        registration: request.registration.as_ref().map(|r| ProtoServerRegistration {
            host: r.host.clone(),
            port: r.port as u32,
        }),
        tablet_report: request.tablet_report.as_ref().map(report_to_proto),
        num_live_tablets: u32::try_from(request.num_live_tablets).unwrap_or(u32::MAX),
        leader_count: u32::try_from(request.leader_count).unwrap_or(u32::MAX),
    }
}

pub(super) fn request_from_proto(proto: ProtoHeartbeatReq) -> Result<HeartbeatRequest, HeartbeatError> {
    let registration = match proto.registration {
        None => None,
        Some(r) => {
            let port = r.port;
            Some(ServerRegistration {
                host: r.host,
                port: u16::try_from(port).map_err(|_| malformed(format!("port {} out of range", port)))?,
            })
        }
    };
    let tablet_report = proto.tablet_report.map(report_from_proto).transpose()?;

    Ok(HeartbeatRequest {
        ts_uuid: proto.ts_uuid,
        registration,
        tablet_report,
        num_live_tablets: proto.num_live_tablets as usize,
        leader_count: proto.leader_count as usize,
    })
}

pub(super) fn response_to_proto(response: &HeartbeatResponse) -> ProtoHeartbeatResp {
    ProtoHeartbeatResp {
        leader_master: response.leader_master,
        needs_reregister: response.needs_reregister,
        needs_full_tablet_report: response.needs_full_tablet_report,
        tablet_report: response.tablet_report_ack.as_ref().map(updates_to_proto),
        tablet_report_limit: response
            .tablet_report_limit
            .map(|limit| u32::try_from(limit).unwrap_or(u32::MAX))
            .unwrap_or(0),
    }
}

pub(super) fn response_from_proto(proto: ProtoHeartbeatResp) -> HeartbeatResponse {
    HeartbeatResponse {
        leader_master: proto.leader_master,
        needs_reregister: proto.needs_reregister,
        needs_full_tablet_report: proto.needs_full_tablet_report,
        tablet_report_ack: proto.tablet_report.map(updates_from_proto),
        // 0 means the coordinator did not send a limit.
        tablet_report_limit: Some(proto.tablet_report_limit as usize).filter(|limit| *limit > 0),
    }
}
