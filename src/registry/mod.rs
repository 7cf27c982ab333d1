//! Which replicas this server hosts and which of them the coordinator still has to hear about.
mod registry;
mod report;
mod trigger;

pub use registry::BeingRemoteBootstrapped;
pub use registry::BootstrapSourceEntry;
pub use registry::ManagerState;
pub use registry::RegisterMode;
pub use registry::Registry;
pub use registry::RegistryError;
pub use report::AckOutcome;
pub use report::ReportedTablet;
pub use report::TabletReport;
pub use report::TabletReportUpdates;
pub use trigger::HeartbeatTrigger;
