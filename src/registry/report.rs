use crate::api::TabletId;
use crate::metadata::DataState;
use crate::replica::{ConsensusStateSnapshot, RuntimeState};
use std::path::PathBuf;

/// One replica's entry in a tablet report.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportedTablet {
    pub tablet_id: TabletId,
    pub state: RuntimeState,
    pub data_state: DataState,
    pub committed_consensus_state: Option<ConsensusStateSnapshot>,
    pub error: Option<String>,
    /// Coordinator must not move this replica (post-split compaction outstanding).
    pub should_disable_lb_move: bool,
    pub fs_data_dir: PathBuf,
    pub is_hidden: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TabletReport {
    pub is_incremental: bool,
    pub sequence_number: u64,
    pub updated_tablets: Vec<ReportedTablet>,
    pub removed_tablet_ids: Vec<TabletId>,
    /// Dirty replicas left out because of the size limit.
    pub remaining_tablet_count: usize,
}

impl TabletReport {
    pub fn updated_tablet_ids(&self) -> Vec<TabletId> {
        self.updated_tablets.iter().map(|t| t.tablet_id.clone()).collect()
    }
}

/// Coordinator's acknowledgment of a report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TabletReportUpdates {
    pub sequence_number: u64,
    pub tablet_ids: Vec<TabletId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AckOutcome {
    pub cleared: usize,
    /// Strict mode only: dirty replicas that should have been covered by the ack.
    pub unreported: Vec<(TabletId, u64)>,
}
