use crate::api::TabletId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("State transition of tablet {tablet_id} already in progress: {reason}")]
    AlreadyInProgress { tablet_id: TabletId, reason: String },
}

/// Tracks which tablets have a registration-affecting operation in flight. A failed `begin` never
/// waits; callers retry later.
#[derive(Clone)]
pub struct TransitionGuard {
    logger: slog::Logger,
    in_progress: Arc<Mutex<HashMap<TabletId, String>>>,
}

impl TransitionGuard {
    pub fn new(logger: slog::Logger) -> Self {
        TransitionGuard {
            logger,
            in_progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn begin(&self, tablet_id: &TabletId, reason: impl Into<String>) -> Result<TransitionToken, TransitionError> {
        let reason = reason.into();
        let mut in_progress = self.in_progress.lock();
        if let Some(existing) = in_progress.get(tablet_id) {
            return Err(TransitionError::AlreadyInProgress {
                tablet_id: tablet_id.clone(),
                reason: existing.clone(),
            });
        }
        in_progress.insert(tablet_id.clone(), reason.clone());
        drop(in_progress);

        slog::debug!(self.logger, "Began transition: {}", reason; "TabletId" => %tablet_id);
        Ok(TransitionToken {
            logger: self.logger.clone(),
            in_progress: self.in_progress.clone(),
            tablet_id: tablet_id.clone(),
            reason,
        })
    }

    pub fn is_in_transition(&self, tablet_id: &TabletId) -> bool {
        self.in_progress.lock().contains_key(tablet_id)
    }

    /// Reason of the live transition of `tablet_id`, if any.
    pub fn reason(&self, tablet_id: &TabletId) -> Option<String> {
        self.in_progress.lock().get(tablet_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.in_progress.lock().len()
    }
}

/// Proof of exclusive right to restructure one tablet. Released on drop.
pub struct TransitionToken {
    logger: slog::Logger,
    in_progress: Arc<Mutex<HashMap<TabletId, String>>>,
    tablet_id: TabletId,
    reason: String,
}

impl TransitionToken {
    pub fn tablet_id(&self) -> &TabletId {
        &self.tablet_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Drop for TransitionToken {
    fn drop(&mut self) {
        let removed = self.in_progress.lock().remove(&self.tablet_id);
        match removed {
            Some(_) => {
                slog::debug!(self.logger, "Finished transition: {}", self.reason; "TabletId" => %self.tablet_id)
            }
            None => slog::error!(
                self.logger,
                "Transition token released but no transition was registered";
                "TabletId" => %self.tablet_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn second_begin_fails_until_release() {
        let guard = TransitionGuard::new(logger());
        let tablet_id = TabletId::new("t1");

        let token = guard.begin(&tablet_id, "deleting tablet").unwrap();
        match guard.begin(&tablet_id, "remote bootstrapping tablet") {
            Err(TransitionError::AlreadyInProgress { reason, .. }) => assert_eq!(reason, "deleting tablet"),
            Ok(_) => panic!("second begin must fail"),
        }
        assert!(guard.is_in_transition(&tablet_id));

        drop(token);
        assert!(!guard.is_in_transition(&tablet_id));
        assert!(guard.begin(&tablet_id, "remote bootstrapping tablet").is_ok());
    }

    #[test]
    fn different_tablets_do_not_conflict() {
        let guard = TransitionGuard::new(logger());

        let _t1 = guard.begin(&TabletId::new("t1"), "a").unwrap();
        let _t2 = guard.begin(&TabletId::new("t2"), "b").unwrap();

        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn concurrent_begin_has_exactly_one_winner() {
        const THREADS: usize = 16;

        for round in 0..50 {
            let guard = TransitionGuard::new(logger());
            let tablet_id = TabletId::new(format!("t-{}", round));
            let barrier = Arc::new(Barrier::new(THREADS));
            let winners = Arc::new(AtomicUsize::new(0));
            let release = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let guard = guard.clone();
                    let tablet_id = tablet_id.clone();
                    let barrier = barrier.clone();
                    let winners = winners.clone();
                    let release = release.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        let token = guard.begin(&tablet_id, format!("thread {}", i));
                        if token.is_ok() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                        // Hold the token until every thread has tried.
                        release.wait();
                        drop(token);
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert_eq!(guard.len(), 0);
        }
    }
}
