//! Spreads tablet data and WAL directories across the configured storage roots.
mod balancer;

pub use balancer::AssignedRoots;
pub use balancer::BalancerError;
pub use balancer::DirKind;
pub use balancer::DirectoryBalancer;
