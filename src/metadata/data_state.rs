use std::fmt;

/// Persisted lifecycle stage of a replica's data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataState {
    /// Superblock written but creation (split child) not finished.
    InitStarted,
    /// Remote bootstrap in progress.
    Copying,
    Ready,
    SplitCompleted,
    /// Data and WAL gone, consensus metadata kept.
    Tombstoned,
    Deleted,
}

impl DataState {
    /// READY and SPLIT_COMPLETED replicas hold complete data.
    pub fn can_serve_tablet_data(self) -> bool {
        matches!(self, DataState::Ready | DataState::SplitCompleted)
    }

    pub fn is_deleted_or_tombstoned(self) -> bool {
        matches!(self, DataState::Deleted | DataState::Tombstoned)
    }

    pub(crate) fn to_proto(self) -> i32 {
        match self {
            DataState::InitStarted => 1,
            DataState::Copying => 2,
            DataState::Ready => 3,
            DataState::SplitCompleted => 4,
            DataState::Tombstoned => 5,
            DataState::Deleted => 6,
        }
    }

    pub(crate) fn from_proto(value: i32) -> Option<Self> {
        match value {
            1 => Some(DataState::InitStarted),
            2 => Some(DataState::Copying),
            3 => Some(DataState::Ready),
            4 => Some(DataState::SplitCompleted),
            5 => Some(DataState::Tombstoned),
            6 => Some(DataState::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for DataState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataState::InitStarted => "TABLET_DATA_INIT_STARTED",
            DataState::Copying => "TABLET_DATA_COPYING",
            DataState::Ready => "TABLET_DATA_READY",
            DataState::SplitCompleted => "TABLET_DATA_SPLIT_COMPLETED",
            DataState::Tombstoned => "TABLET_DATA_TOMBSTONED",
            DataState::Deleted => "TABLET_DATA_DELETED",
        };
        f.write_str(name)
    }
}
