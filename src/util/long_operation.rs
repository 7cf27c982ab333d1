use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// Logs a warning if the scope it guards outlives `threshold`. Never cancels the operation.
pub struct LongOperationTracker {
    logger: slog::Logger,
    description: String,
    threshold: Duration,
    started_at: Instant,
    watcher: Option<JoinHandle<()>>,
}

impl LongOperationTracker {
    pub fn new(logger: slog::Logger, description: impl Into<String>, threshold: Duration) -> Self {
        let description = description.into();
        let watcher = tokio::runtime::Handle::try_current().ok().map(|runtime| {
            let logger = logger.clone();
            let description = description.clone();
            runtime.spawn(async move {
                tokio::time::sleep(threshold).await;
                slog::warn!(logger, "{} running for over {:?}", description, threshold);
            })
        });

        LongOperationTracker {
            logger,
            description,
            threshold,
            started_at: Instant::now(),
            watcher,
        }
    }
}

impl Drop for LongOperationTracker {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        let elapsed = self.started_at.elapsed();
        if elapsed > self.threshold {
            slog::warn!(self.logger, "{} took {:?}", self.description, elapsed);
        }
    }
}
