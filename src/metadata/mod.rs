//! On-disk records of a tablet replica and where they live.
mod consensus;
mod convert;
mod data_state;
mod layout;
mod superblock;

pub use consensus::ConsensusMetadata;
pub use data_state::DataState;
pub use layout::FsLayout;
pub use layout::MetadataError;
pub use superblock::Superblock;
pub use superblock::TabletMetadata;

pub(crate) use convert::*;
pub(crate) use layout::{io_error, remove_dir_if_exists, remove_empty_parent, CHECKPOINTS_DIR};
