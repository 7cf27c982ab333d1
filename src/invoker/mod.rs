//! Client-side routing of tablet RPCs: picks a replica per attempt and retries on stale routes.
mod followers;
mod invoker;
mod selection;

pub use followers::FollowerTracker;
pub use invoker::AttemptError;
pub use invoker::InvokerError;
pub use invoker::MetaCache;
pub use invoker::TabletInvoker;
pub use invoker::TabletRpc;
pub use selection::ReplicaLocation;
pub use selection::TabletLocations;
pub use selection::TargetSelection;
