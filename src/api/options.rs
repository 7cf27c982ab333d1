use crate::api::types::TableId;
use std::convert::TryFrom;
use std::path::PathBuf;
use tokio::time::Duration;

/// Tunables of the tablet manager. Unset fields take the documented defaults.
#[derive(Clone, Default)]
pub struct TabletManagerOptions {
    /// Max tablets opened in parallel. 0 derives a value from CPU and data root counts.
    pub num_tablets_to_open_simultaneously: Option<usize>,
    pub apply_pool_max_threads: Option<usize>,
    pub post_split_compaction_pool_max_threads: Option<usize>,
    pub tablet_start_warn_threshold: Option<Duration>,
    pub max_concurrent_remote_bootstraps: Option<usize>,
    pub remote_bootstrap_shutdown_single_wait: Option<Duration>,
    pub remote_bootstrap_shutdown_report_interval: Option<Duration>,
    pub remote_bootstrap_shutdown_max_wait: Option<Duration>,
    pub long_operation_threshold: Option<Duration>,
    pub remote_bootstrap_verify_timeout: Option<Duration>,
    pub initial_tablet_report_limit: Option<usize>,
    /// `Duration::ZERO` disables the poller.
    pub cleanup_split_tablets_interval: Option<Duration>,
    /// `Duration::ZERO` disables the poller.
    pub verify_tablet_data_interval: Option<Duration>,
    pub system_table_id: Option<TableId>,
}

#[derive(Clone, Debug)]
pub struct TabletManagerConfig {
    pub num_tablets_to_open_simultaneously: usize,
    pub apply_pool_max_threads: usize,
    pub post_split_compaction_pool_max_threads: usize,
    pub tablet_start_warn_threshold: Duration,
    pub max_concurrent_remote_bootstraps: usize,
    pub remote_bootstrap_shutdown_single_wait: Duration,
    pub remote_bootstrap_shutdown_report_interval: Duration,
    pub remote_bootstrap_shutdown_max_wait: Duration,
    pub long_operation_threshold: Duration,
    pub remote_bootstrap_verify_timeout: Duration,
    pub initial_tablet_report_limit: usize,
    pub cleanup_split_tablets_interval: Duration,
    pub verify_tablet_data_interval: Duration,
    pub system_table_id: TableId,
}

impl TabletManagerConfig {
    fn validate(&self) -> Result<(), &'static str> {
        if self.apply_pool_max_threads == 0 {
            return Err("Apply pool needs at least one thread");
        }
        if self.post_split_compaction_pool_max_threads == 0 {
            return Err("Post-split compaction pool needs at least one thread");
        }
        if self.max_concurrent_remote_bootstraps == 0 {
            return Err("At least one concurrent remote bootstrap must be allowed");
        }
        if self.remote_bootstrap_shutdown_single_wait.as_nanos() == 0 {
            return Err("Remote bootstrap shutdown wait must be non-zero");
        }
        if self.remote_bootstrap_shutdown_report_interval >= self.remote_bootstrap_shutdown_max_wait {
            return Err("Remote bootstrap shutdown report interval must be less than the max wait");
        }
        if self.initial_tablet_report_limit == 0 {
            return Err("Tablet report limit must be positive");
        }

        Ok(())
    }

    /// Resolves the open pool size, deriving it when configured as 0.
    pub fn open_pool_threads(&self, num_data_roots: usize, num_cpus: usize) -> usize {
        if self.num_tablets_to_open_simultaneously > 0 {
            return self.num_tablets_to_open_simultaneously;
        }
        if num_cpus <= 2 {
            2
        } else {
            (num_cpus - 1).min(num_data_roots.max(1) * 8)
        }
    }
}

impl TryFrom<TabletManagerOptions> for TabletManagerConfig {
    type Error = &'static str;

    fn try_from(options: TabletManagerOptions) -> Result<Self, Self::Error> {
        let values = TabletManagerConfig {
            num_tablets_to_open_simultaneously: options.num_tablets_to_open_simultaneously.unwrap_or(0),
            apply_pool_max_threads: options.apply_pool_max_threads.unwrap_or(4),
            post_split_compaction_pool_max_threads: options.post_split_compaction_pool_max_threads.unwrap_or(1),
            tablet_start_warn_threshold: options
                .tablet_start_warn_threshold
                .unwrap_or(Duration::from_millis(500)),
            max_concurrent_remote_bootstraps: options.max_concurrent_remote_bootstraps.unwrap_or(10),
            remote_bootstrap_shutdown_single_wait: options
                .remote_bootstrap_shutdown_single_wait
                .unwrap_or(Duration::from_millis(10)),
            remote_bootstrap_shutdown_report_interval: options
                .remote_bootstrap_shutdown_report_interval
                .unwrap_or(Duration::from_secs(5)),
            remote_bootstrap_shutdown_max_wait: options
                .remote_bootstrap_shutdown_max_wait
                .unwrap_or(Duration::from_secs(30)),
            long_operation_threshold: options.long_operation_threshold.unwrap_or(Duration::from_secs(5)),
            remote_bootstrap_verify_timeout: options
                .remote_bootstrap_verify_timeout
                .unwrap_or(Duration::from_secs(60)),
            initial_tablet_report_limit: options.initial_tablet_report_limit.unwrap_or(1000),
            cleanup_split_tablets_interval: options
                .cleanup_split_tablets_interval
                .unwrap_or(Duration::from_secs(60)),
            verify_tablet_data_interval: options.verify_tablet_data_interval.unwrap_or(Duration::from_secs(0)),
            system_table_id: options.system_table_id.unwrap_or_else(|| TableId::new("sys.catalog.uuid")),
        };

        values.validate()?;
        Ok(values)
    }
}

/// What a triggered crash point does.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultMode {
    /// Abort the process, exactly like a real crash.
    Abort,
    /// Stop the operation right there with `InjectedCrash`, leaving disk state as a crash would.
    ReturnError,
}

impl Default for FaultMode {
    fn default() -> Self {
        FaultMode::Abort
    }
}

/// Test-only knobs. Probabilities are in `[0.0, 1.0]`.
#[derive(Clone, Debug, Default)]
pub struct FaultInjectionOptions {
    pub mode: FaultMode,
    pub crash_after_blocks_deleted: f64,
    pub crash_after_wal_deleted: f64,
    pub crash_after_cmeta_deleted: f64,
    pub crash_after_rb_files_fetched: f64,
    pub crash_in_split_before_log_flushed: f64,
    pub crash_in_split_after_log_copied: f64,
    pub force_single_tablet_failure: bool,
    pub simulate_already_present_in_remote_bootstrap: bool,
    pub skip_post_split_compaction: bool,
}

/// Where the server keeps its files.
#[derive(Clone, Debug)]
pub struct FsOptions {
    /// Holds the instance file, superblocks and consensus metadata.
    pub fs_root: PathBuf,
    pub data_roots: Vec<PathBuf>,
    pub wal_roots: Vec<PathBuf>,
}

impl FsOptions {
    /// Single-directory layout: everything under `root`.
    pub fn single_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        FsOptions {
            data_roots: vec![root.clone()],
            wal_roots: vec![root.clone()],
            fs_root: root,
        }
    }
}

/// Retry behavior of a `TabletInvoker`.
#[derive(Clone, Debug)]
pub struct InvokerOptions {
    /// Attempts per invocation, the first one included.
    pub max_attempts: u32,
    /// Overall budget of one invocation. `None` bounds it by attempts only.
    pub deadline: Option<Duration>,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// How long a replica that answered as a follower is skipped.
    pub follower_expiry: Duration,
    pub max_remembered_followers: usize,
    /// Tablets whose last successful replica is kept as the preferred target.
    pub max_remembered_tablets: usize,
}

impl Default for InvokerOptions {
    fn default() -> Self {
        InvokerOptions {
            max_attempts: 10,
            deadline: Some(Duration::from_secs(60)),
            backoff_base: Duration::from_millis(10),
            backoff_cap: Duration::from_secs(1),
            follower_expiry: Duration::from_secs(1),
            max_remembered_followers: 16,
            max_remembered_tablets: 1024,
        }
    }
}
