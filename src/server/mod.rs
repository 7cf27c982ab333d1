mod admin_service;
mod shutdown;

pub use admin_service::TabletAdminService;
pub use shutdown::shutdown_signal;
pub use shutdown::ServerShutdownHandle;
pub use shutdown::ServerShutdownSignal;
