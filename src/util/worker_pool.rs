use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};

#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    #[error("Worker pool {0} is shut down")]
    Shutdown(&'static str),
    #[error("Worker pool {0} needs a tokio runtime")]
    NoRuntime(&'static str),
}

struct Outstanding {
    count: AtomicUsize,
    idle: Notify,
}

impl Outstanding {
    fn finish_one(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded pool running blocking closures on tokio's blocking threads.
///
/// Tasks still queued when the pool shuts down are dropped without running.
pub struct WorkerPool {
    logger: slog::Logger,
    name: &'static str,
    runtime: Handle,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    outstanding: Arc<Outstanding>,
}

impl WorkerPool {
    pub fn new(logger: slog::Logger, name: &'static str, max_threads: usize) -> Result<Self, WorkerPoolError> {
        let runtime = Handle::try_current().map_err(|_| WorkerPoolError::NoRuntime(name))?;
        slog::info!(logger, "Created worker pool {} with {} threads", name, max_threads);

        Ok(WorkerPool {
            logger,
            name,
            runtime,
            permits: Arc::new(Semaphore::new(max_threads.max(1))),
            closed: AtomicBool::new(false),
            outstanding: Arc::new(Outstanding {
                count: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn submit<F>(&self, task: F) -> Result<(), WorkerPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(WorkerPoolError::Shutdown(self.name));
        }

        self.outstanding.count.fetch_add(1, Ordering::AcqRel);
        let permits = self.permits.clone();
        let outstanding = self.outstanding.clone();
        let logger = self.logger.clone();
        let name = self.name;
        self.runtime.spawn(async move {
            if let Ok(_permit) = permits.acquire_owned().await {
                if let Err(e) = tokio::task::spawn_blocking(task).await {
                    slog::error!(logger, "Task in worker pool {} failed: {}", name, e);
                }
            }
            outstanding.finish_one();
        });
        Ok(())
    }

    /// Number of submitted tasks not yet finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.count.load(Ordering::Acquire)
    }

    pub async fn wait_idle(&self) {
        loop {
            let idle = self.outstanding.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Rejects new tasks and drops queued ones. Returns false if already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.permits.close();
        true
    }

    /// Closes the pool and waits for running tasks.
    pub async fn shutdown(&self) {
        let closed_now = self.close();
        self.wait_idle().await;
        if closed_now {
            slog::info!(self.logger, "Worker pool {} shut down", self.name);
        }
    }
}
