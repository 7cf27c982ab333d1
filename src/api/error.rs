use crate::api::types::TabletId;
use crate::fault::FaultPoint;
use crate::metadata::MetadataError;
use crate::placement::BalancerError;
use crate::registry::RegistryError;
use crate::remote_bootstrap::RemoteBootstrapError;
use crate::replica::RuntimeError;
use crate::transition::TransitionError;
use crate::util::WorkerPoolError;
use std::io;

/// Error codes carried on the wire next to a human readable message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TabletServerErrorCode {
    TabletNotFound,
    TabletNotRunning,
    CasFailed,
    IllegalState,
    AlreadyPresent,
    InvalidArgument,
    ShutdownInProgress,
    Unknown,
}

impl TabletServerErrorCode {
    pub(crate) fn to_proto(self) -> i32 {
        match self {
            TabletServerErrorCode::Unknown => 0,
            TabletServerErrorCode::TabletNotFound => 1,
            TabletServerErrorCode::TabletNotRunning => 2,
            TabletServerErrorCode::CasFailed => 3,
            TabletServerErrorCode::IllegalState => 4,
            TabletServerErrorCode::AlreadyPresent => 5,
            TabletServerErrorCode::InvalidArgument => 6,
            TabletServerErrorCode::ShutdownInProgress => 7,
        }
    }

    pub(crate) fn from_proto(code: i32) -> Self {
        match code {
            1 => TabletServerErrorCode::TabletNotFound,
            2 => TabletServerErrorCode::TabletNotRunning,
            3 => TabletServerErrorCode::CasFailed,
            4 => TabletServerErrorCode::IllegalState,
            5 => TabletServerErrorCode::AlreadyPresent,
            6 => TabletServerErrorCode::InvalidArgument,
            7 => TabletServerErrorCode::ShutdownInProgress,
            _ => TabletServerErrorCode::Unknown,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TabletManagerError {
    #[error("{0}")]
    AlreadyPresent(String),
    #[error("Tablet {0} not found")]
    NotFound(TabletId),
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Tablet manager is shutting down")]
    ShutdownInProgress,
    #[error("Tablet {tablet_id} not running: {reason}")]
    TabletNotRunning { tablet_id: TabletId, reason: String },
    #[error("Request specified cas_config_opid_index_less_or_equal of {expected} but the committed config has opid_index of {actual}")]
    CasFailed { expected: i64, actual: i64 },
    #[error("Too many concurrent remote bootstrap sessions: {in_flight} of max {max}")]
    TooManyRemoteBootstraps { in_flight: usize, max: usize },
    #[error("Injected crash at {0:?}")]
    InjectedCrash(FaultPoint),
    #[error("Tablet {tablet_id} failed: {cause}")]
    TabletFailed { tablet_id: TabletId, cause: String },
    #[error("Metadata failure: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Directory assignment failure: {0}")]
    Balancer(#[from] BalancerError),
    #[error("Replica runtime failure: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Remote bootstrap failure: {0}")]
    RemoteBootstrap(#[from] RemoteBootstrapError),
    #[error("Worker pool unavailable: {0}")]
    WorkerPool(#[from] WorkerPoolError),
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

impl TabletManagerError {
    pub fn error_code(&self) -> TabletServerErrorCode {
        match self {
            TabletManagerError::AlreadyPresent(_) => TabletServerErrorCode::AlreadyPresent,
            TabletManagerError::NotFound(_) => TabletServerErrorCode::TabletNotFound,
            TabletManagerError::IllegalState(_) => TabletServerErrorCode::IllegalState,
            TabletManagerError::InvalidArgument(_) => TabletServerErrorCode::InvalidArgument,
            TabletManagerError::ShutdownInProgress => TabletServerErrorCode::ShutdownInProgress,
            TabletManagerError::TabletNotRunning { .. } => TabletServerErrorCode::TabletNotRunning,
            TabletManagerError::CasFailed { .. } => TabletServerErrorCode::CasFailed,
            TabletManagerError::TooManyRemoteBootstraps { .. } => TabletServerErrorCode::IllegalState,
            TabletManagerError::TabletFailed { .. } => TabletServerErrorCode::TabletNotRunning,
            TabletManagerError::WorkerPool(_) => TabletServerErrorCode::ShutdownInProgress,
            TabletManagerError::InjectedCrash(_)
            | TabletManagerError::Metadata(_)
            | TabletManagerError::Balancer(_)
            | TabletManagerError::Runtime(_)
            | TabletManagerError::RemoteBootstrap(_)
            | TabletManagerError::Io(_) => TabletServerErrorCode::Unknown,
        }
    }
}

impl From<TransitionError> for TabletManagerError {
    fn from(e: TransitionError) -> Self {
        TabletManagerError::AlreadyPresent(e.to_string())
    }
}

impl From<RegistryError> for TabletManagerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ShutdownInProgress => TabletManagerError::ShutdownInProgress,
            RegistryError::AlreadyPresent(tablet_id) => {
                TabletManagerError::AlreadyPresent(format!("Tablet {} already registered", tablet_id))
            }
            RegistryError::NotFound(tablet_id) => TabletManagerError::NotFound(tablet_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_conflicts_map_to_already_present() {
        let e = TabletManagerError::from(TransitionError::AlreadyInProgress {
            tablet_id: TabletId::new("t1"),
            reason: "splitting".into(),
        });

        assert_eq!(e.error_code(), TabletServerErrorCode::AlreadyPresent);
        assert!(e.to_string().contains("splitting"));
    }

    #[test]
    fn registry_errors_keep_their_class() {
        let shutdown = TabletManagerError::from(RegistryError::ShutdownInProgress);
        let missing = TabletManagerError::from(RegistryError::NotFound(TabletId::new("t9")));

        assert_eq!(shutdown.error_code(), TabletServerErrorCode::ShutdownInProgress);
        assert_eq!(missing.error_code(), TabletServerErrorCode::TabletNotFound);
    }
}
