mod api;
mod commitlog;
mod fault;
mod heartbeat;
mod invoker;
mod manager;
mod metadata;
mod placement;
mod registry;
mod remote_bootstrap;
mod replica;
mod server;
mod transition;
mod util;
mod grpc {
    include!("../generated/tserver.rs");
}

pub use api::try_create_tablet_server;
pub use api::BootstrapSource;
pub use api::FaultInjectionOptions;
pub use api::FaultMode;
pub use api::FsOptions;
pub use api::InvokerOptions;
pub use api::KeyBounds;
pub use api::MemberType;
pub use api::OpId;
pub use api::Partition;
pub use api::RaftConfig;
pub use api::RaftPeer;
pub use api::TableId;
pub use api::TableInfo;
pub use api::TabletId;
pub use api::TabletManagerConfig;
pub use api::TabletManagerError;
pub use api::TabletManagerOptions;
pub use api::TabletServer;
pub use api::TabletServerConfig;
pub use api::TabletServerCreationError;
pub use api::TabletServerErrorCode;
pub use api::INVALID_OPID_INDEX;
pub use fault::FaultInjector;
pub use fault::FaultPoint;
pub use heartbeat::Coordinator;
pub use heartbeat::CoordinatorProxy;
pub use heartbeat::CoordinatorService;
pub use heartbeat::GrpcCoordinatorProxy;
pub use heartbeat::HeartbeatError;
pub use heartbeat::HeartbeatOutcome;
pub use heartbeat::HeartbeatRequest;
pub use heartbeat::HeartbeatResponse;
pub use heartbeat::Heartbeater;
pub use heartbeat::HeartbeaterConfig;
pub use heartbeat::ServerRegistration;
pub use invoker::AttemptError;
pub use invoker::FollowerTracker;
pub use invoker::InvokerError;
pub use invoker::MetaCache;
pub use invoker::ReplicaLocation;
pub use invoker::TabletInvoker;
pub use invoker::TabletLocations;
pub use invoker::TabletRpc;
pub use invoker::TargetSelection;
pub use manager::DeleteRequest;
pub use manager::RemoteBootstrapRequest;
pub use manager::SplitRequest;
pub use manager::TabletManager;
pub use manager::TabletManagerParts;
pub use metadata::ConsensusMetadata;
pub use metadata::DataState;
pub use metadata::FsLayout;
pub use metadata::MetadataError;
pub use metadata::Superblock;
pub use metadata::TabletMetadata;
pub use placement::AssignedRoots;
pub use placement::BalancerError;
pub use placement::DirKind;
pub use placement::DirectoryBalancer;
pub use registry::AckOutcome;
pub use registry::HeartbeatTrigger;
pub use registry::ManagerState;
pub use registry::Registry;
pub use registry::ReportedTablet;
pub use registry::TabletReport;
pub use registry::TabletReportUpdates;
pub use remote_bootstrap::collect_tablet_files;
pub use remote_bootstrap::install_tablet_files;
pub use remote_bootstrap::verify_change_role_succeeded;
pub use remote_bootstrap::RemoteBootstrapClient;
pub use remote_bootstrap::RemoteBootstrapClientFactory;
pub use remote_bootstrap::RemoteBootstrapError;
pub use remote_bootstrap::RemoteTabletSnapshot;
pub use remote_bootstrap::TabletFile;
pub use replica::BootstrapContext;
pub use replica::ConsensusStateSnapshot;
pub use replica::LeaderStatus;
pub use replica::LocalReplicaRuntime;
pub use replica::LocalReplicaRuntimeFactory;
pub use replica::ReplicaHandle;
pub use replica::ReplicaRuntime;
pub use replica::ReplicaRuntimeFactory;
pub use replica::RuntimeError;
pub use replica::RuntimeState;
pub use replica::StateChangeListener;
pub use server::shutdown_signal;
pub use server::ServerShutdownHandle;
pub use server::ServerShutdownSignal;
pub use server::TabletAdminService;
pub use transition::TransitionError;
pub use transition::TransitionGuard;
pub use transition::TransitionToken;
pub use util::Clock;
pub use util::RealClock;
pub use util::Stopper;

// Learning 1: `crate::{root_mod}` holds no code. Just `mod` and `pub use` statements.
// Learning 2: No `mod` statement is `pub`. Everything public is exported item by item.
