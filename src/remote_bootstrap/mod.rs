//! Copying a whole replica from a peer: the client that pulls it and the file set a source serves.
mod client;
mod files;
mod grpc_client;

pub use client::verify_change_role_succeeded;
pub use client::RemoteBootstrapClient;
pub use client::RemoteBootstrapClientFactory;
pub use client::RemoteBootstrapError;
pub use client::RemoteTabletSnapshot;
pub use files::collect_tablet_files;
pub use files::install_tablet_files;
pub use files::TabletFile;
pub use grpc_client::GrpcRemoteBootstrapClient;
pub use grpc_client::GrpcRemoteBootstrapClientFactory;
