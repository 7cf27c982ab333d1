//! Segmented write-ahead log of a tablet replica.
mod segment;
mod segmented_log;

pub use segmented_log::copy_to;
pub use segmented_log::delete_on_disk_data;
pub use segmented_log::has_on_disk_data;
pub use segmented_log::LogEntry;
pub use segmented_log::SegmentedLog;
