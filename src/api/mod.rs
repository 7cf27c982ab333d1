//! Types, options and errors shared across the crate, plus the wiring that builds a tablet server.
mod error;
mod options;
mod tablet_server;
mod types;
mod wiring;

pub use error::TabletManagerError;
pub use error::TabletServerErrorCode;
pub use options::FaultInjectionOptions;
pub use options::FaultMode;
pub use options::FsOptions;
pub use options::InvokerOptions;
pub use options::TabletManagerConfig;
pub use options::TabletManagerOptions;
pub use tablet_server::TabletServer;
pub use types::BootstrapSource;
pub use types::KeyBounds;
pub use types::MemberType;
pub use types::OpId;
pub use types::Partition;
pub use types::RaftConfig;
pub use types::RaftPeer;
pub use types::TableId;
pub use types::TableInfo;
pub use types::TabletId;
pub use types::INVALID_OPID_INDEX;
pub use wiring::try_create_tablet_server;
pub use wiring::TabletServerConfig;
pub use wiring::TabletServerCreationError;
