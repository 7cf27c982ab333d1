//! Orchestrates every structural operation on locally hosted replicas.
mod background;
mod deletion;
mod manager;
mod open;
mod remote;
mod shutdown;
mod split;
mod startup;

pub use deletion::DeleteRequest;
pub use manager::TabletManager;
pub use manager::TabletManagerParts;
pub use remote::RemoteBootstrapRequest;
pub use split::SplitRequest;
