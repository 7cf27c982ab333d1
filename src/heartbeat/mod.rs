//! Heartbeats to the cluster coordinator and the tablet reports they carry.
mod convert;
mod coordinator;
mod grpc_proxy;
mod heartbeater;
mod proxy;

pub use coordinator::Coordinator;
pub use coordinator::CoordinatorService;
pub use grpc_proxy::GrpcCoordinatorProxy;
pub use heartbeater::HeartbeatOutcome;
pub use heartbeater::Heartbeater;
pub use heartbeater::HeartbeaterConfig;
pub use proxy::CoordinatorProxy;
pub use proxy::HeartbeatError;
pub use proxy::HeartbeatRequest;
pub use proxy::HeartbeatResponse;
pub use proxy::ServerRegistration;
