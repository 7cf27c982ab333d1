//! A locally hosted tablet replica and the runtime that serves it.
mod handle;
mod local_runtime;
mod runtime;
mod state;

pub use handle::ReplicaHandle;
pub use local_runtime::LocalReplicaRuntime;
pub use local_runtime::LocalReplicaRuntimeFactory;
pub use runtime::BootstrapContext;
pub use runtime::ReplicaRuntime;
pub use runtime::ReplicaRuntimeFactory;
pub use runtime::RuntimeError;
pub use runtime::StateChangeListener;
pub use state::ConsensusStateSnapshot;
pub use state::LeaderStatus;
pub use state::RuntimeState;
