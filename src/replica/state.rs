use crate::api::RaftConfig;
use std::fmt;

/// In-memory state of a replica, orthogonal to its persisted `DataState`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    NotStarted,
    Bootstrapping,
    Running,
    Failed,
    Shutdown,
}

impl RuntimeState {
    pub(crate) fn to_proto(self) -> i32 {
        match self {
            RuntimeState::NotStarted => 0,
            RuntimeState::Bootstrapping => 1,
            RuntimeState::Running => 2,
            RuntimeState::Failed => 3,
            RuntimeState::Shutdown => 4,
        }
    }

    pub(crate) fn from_proto(value: i32) -> Option<Self> {
        match value {
            0 => Some(RuntimeState::NotStarted),
            1 => Some(RuntimeState::Bootstrapping),
            2 => Some(RuntimeState::Running),
            3 => Some(RuntimeState::Failed),
            4 => Some(RuntimeState::Shutdown),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeState::NotStarted => "NOT_STARTED",
            RuntimeState::Bootstrapping => "BOOTSTRAPPING",
            RuntimeState::Running => "RUNNING",
            RuntimeState::Failed => "FAILED",
            RuntimeState::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeaderStatus {
    Leader,
    NotLeader,
}

/// Committed consensus state as reported to the coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusStateSnapshot {
    pub current_term: u64,
    pub leader_uuid: Option<String>,
    pub config: RaftConfig,
}
