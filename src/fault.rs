//! Named crash points used by crash-recovery tests.
use crate::api::{FaultInjectionOptions, FaultMode, TabletManagerError};
use crate::util::fatal;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultPoint {
    CrashAfterBlocksDeleted,
    CrashAfterWalDeleted,
    CrashAfterCmetaDeleted,
    CrashAfterRemoteBootstrapFilesFetched,
    CrashInSplitBeforeLogFlushed,
    CrashInSplitAfterLogCopied,
}

pub struct FaultInjector {
    logger: slog::Logger,
    options: FaultInjectionOptions,
    single_tablet_failure_pending: AtomicBool,
}

impl FaultInjector {
    pub fn new(logger: slog::Logger, options: FaultInjectionOptions) -> Self {
        FaultInjector {
            single_tablet_failure_pending: AtomicBool::new(options.force_single_tablet_failure),
            logger,
            options,
        }
    }

    pub fn disabled() -> Self {
        Self::new(
            slog::Logger::root(slog::Discard, slog::o!()),
            FaultInjectionOptions::default(),
        )
    }

    fn probability(&self, point: FaultPoint) -> f64 {
        match point {
            FaultPoint::CrashAfterBlocksDeleted => self.options.crash_after_blocks_deleted,
            FaultPoint::CrashAfterWalDeleted => self.options.crash_after_wal_deleted,
            FaultPoint::CrashAfterCmetaDeleted => self.options.crash_after_cmeta_deleted,
            FaultPoint::CrashAfterRemoteBootstrapFilesFetched => self.options.crash_after_rb_files_fetched,
            FaultPoint::CrashInSplitBeforeLogFlushed => self.options.crash_in_split_before_log_flushed,
            FaultPoint::CrashInSplitAfterLogCopied => self.options.crash_in_split_after_log_copied,
        }
    }

    /// Fires `point` with its configured probability.
    pub fn maybe_fault(&self, point: FaultPoint) -> Result<(), TabletManagerError> {
        let probability = self.probability(point);
        if probability <= 0.0 {
            return Ok(());
        }
        if !rand::thread_rng().gen_bool(probability.min(1.0)) {
            return Ok(());
        }

        match self.options.mode {
            FaultMode::Abort => fatal(&self.logger, &format!("Injected crash at {:?}", point)),
            FaultMode::ReturnError => {
                slog::warn!(self.logger, "Injected crash at {:?}", point);
                Err(TabletManagerError::InjectedCrash(point))
            }
        }
    }

    /// True exactly once when forced single tablet failure is configured.
    pub fn take_single_tablet_failure(&self) -> bool {
        self.single_tablet_failure_pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn simulate_already_present_in_remote_bootstrap(&self) -> bool {
        self.options.simulate_already_present_in_remote_bootstrap
    }

    pub fn skip_post_split_compaction(&self) -> bool {
        self.options.skip_post_split_compaction
    }
}
