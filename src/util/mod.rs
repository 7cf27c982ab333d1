mod fatal;
mod long_operation;
mod stop_signal;
mod time;
mod worker_pool;

pub use fatal::fatal;
pub use long_operation::LongOperationTracker;
pub use stop_signal::StopCheck;
pub use stop_signal::Stopper;
pub use time::Clock;
pub use time::RealClock;
pub use worker_pool::WorkerPool;
pub use worker_pool::WorkerPoolError;

pub(crate) use stop_signal::new as stop_signal;
#[cfg(test)]
pub(crate) use time::mocked_clock;
