#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tablet_manager::{
    collect_tablet_files, install_tablet_files, BootstrapSource, ConsensusMetadata, FaultInjectionOptions,
    FaultInjector, FsLayout, FsOptions, HeartbeatTrigger, LocalReplicaRuntimeFactory, MemberType, Partition,
    RaftConfig, RaftPeer, RemoteBootstrapClient, RemoteBootstrapClientFactory, RemoteBootstrapError,
    RemoteTabletSnapshot, RuntimeState, TableId, TableInfo, TabletFile, TabletId, TabletManager,
    TabletManagerConfig, TabletManagerOptions, TabletManagerParts,
};
use tempfile::TempDir;
use tokio::time::{Duration, Instant};

pub fn create_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

pub fn test_options() -> TabletManagerOptions {
    TabletManagerOptions {
        remote_bootstrap_shutdown_report_interval: Some(Duration::from_millis(500)),
        remote_bootstrap_shutdown_max_wait: Some(Duration::from_secs(5)),
        remote_bootstrap_verify_timeout: Some(Duration::from_millis(200)),
        // Background loops stay off; tests drive them by hand.
        cleanup_split_tablets_interval: Some(Duration::from_secs(0)),
        verify_tablet_data_interval: Some(Duration::from_secs(0)),
        ..Default::default()
    }
}

/// One tablet server's manager on its own temp dir. Survives restarts of the manager.
pub struct TestNode {
    pub dir: TempDir,
    pub manager: Arc<TabletManager>,
    pub bootstrap_clients: Arc<InProcessBootstrapClientFactory>,
}

impl TestNode {
    pub fn start() -> TestNode {
        Self::start_with_faults(FaultInjectionOptions::default())
    }

    pub fn start_with_faults(faults: FaultInjectionOptions) -> TestNode {
        Self::start_with_options(test_options(), faults)
    }

    pub fn start_with_options(options: TabletManagerOptions, faults: FaultInjectionOptions) -> TestNode {
        let dir = tempfile::tempdir().expect("tempdir");
        let bootstrap_clients = Arc::new(InProcessBootstrapClientFactory::default());
        let manager = create_manager_with_options(dir.path(), bootstrap_clients.clone(), options, faults);
        manager.init().expect("init");
        TestNode {
            dir,
            manager,
            bootstrap_clients,
        }
    }

    /// Shuts the current manager down and brings up a fresh one over the same directories.
    pub async fn restart(&mut self, faults: FaultInjectionOptions) {
        self.manager.shutdown().await;
        self.manager = create_manager(self.dir.path(), self.bootstrap_clients.clone(), faults);
        self.manager.init().expect("init after restart");
    }

    pub fn uuid(&self) -> String {
        self.manager.local_uuid().to_string()
    }
}

pub fn create_manager(
    root: &Path,
    bootstrap_clients: Arc<InProcessBootstrapClientFactory>,
    faults: FaultInjectionOptions,
) -> Arc<TabletManager> {
    create_manager_with_options(root, bootstrap_clients, test_options(), faults)
}

pub fn create_manager_with_options(
    root: &Path,
    bootstrap_clients: Arc<InProcessBootstrapClientFactory>,
    options: TabletManagerOptions,
    faults: FaultInjectionOptions,
) -> Arc<TabletManager> {
    let logger = create_logger();
    let layout = FsLayout::open_or_create(&FsOptions::single_root(root)).expect("fs layout");
    let config = TabletManagerConfig::try_from(options).expect("valid options");
    TabletManager::new(TabletManagerParts {
        logger: logger.clone(),
        config,
        layout: Arc::new(layout),
        runtime_factory: Arc::new(LocalReplicaRuntimeFactory),
        remote_bootstrap_client_factory: bootstrap_clients,
        faults: FaultInjector::new(logger, faults),
        heartbeat_trigger: HeartbeatTrigger::new(),
    })
    .expect("tablet manager")
}

pub fn voter(uuid: &str) -> RaftPeer {
    RaftPeer {
        permanent_uuid: uuid.to_string(),
        member_type: MemberType::Voter,
        host: "127.0.0.1".into(),
        port: 9100,
    }
}

pub fn raft_config(voters: &[&str], opid_index: i64) -> RaftConfig {
    RaftConfig {
        opid_index,
        peers: voters.iter().map(|uuid| voter(uuid)).collect(),
    }
}

pub fn table() -> TableInfo {
    TableInfo {
        table_id: TableId::new("table-1"),
        table_name: "orders".into(),
    }
}

pub fn whole_partition() -> Partition {
    Partition::default()
}

/// Creates a tablet where `node` is the only voter and waits for it to run.
pub async fn create_running_tablet(node: &TestNode, tablet_id: &str) -> TabletId {
    let tablet_id = TabletId::new(tablet_id);
    let uuid = node.uuid();
    node.manager
        .create_new_tablet(&table(), &tablet_id, whole_partition(), raft_config(&[&uuid], 1))
        .expect("create tablet");
    wait_running(&node.manager, &tablet_id).await;
    tablet_id
}

pub async fn wait_running(manager: &TabletManager, tablet_id: &TabletId) {
    wait_until(Duration::from_secs(10), || {
        manager
            .lookup_tablet(tablet_id)
            .map(|handle| handle.state() == RuntimeState::Running)
            .unwrap_or(false)
    })
    .await;
}

pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("Condition not met within {:?}", timeout);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Remote bootstrap straight out of another in-process manager.
#[derive(Default)]
pub struct InProcessBootstrapClientFactory {
    sources: Mutex<HashMap<String, Arc<TabletManager>>>,
    fail_fetch: AtomicBool,
    fetch_delay_millis: AtomicU64,
}

impl InProcessBootstrapClientFactory {
    pub fn add_source(&self, manager: Arc<TabletManager>) {
        self.sources.lock().insert(manager.local_uuid().to_string(), manager);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes every later fetch take `delay` before copying anything.
    pub fn delay_fetch(&self, delay: Duration) {
        self.fetch_delay_millis.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RemoteBootstrapClientFactory for InProcessBootstrapClientFactory {
    async fn create(
        &self,
        tablet_id: &TabletId,
        source: &BootstrapSource,
        _local_uuid: &str,
    ) -> Result<Box<dyn RemoteBootstrapClient>, RemoteBootstrapError> {
        let source_manager = self
            .sources
            .lock()
            .get(&source.peer_uuid)
            .cloned()
            .ok_or_else(|| RemoteBootstrapError::InvalidAddress(source.peer_uuid.clone()))?;
        Ok(Box::new(InProcessBootstrapClient {
            source: source_manager,
            tablet_id: tablet_id.clone(),
            files: None,
            fail_fetch: self.fail_fetch.load(Ordering::SeqCst),
            fetch_delay: Duration::from_millis(self.fetch_delay_millis.load(Ordering::SeqCst)),
        }))
    }
}

struct InProcessBootstrapClient {
    source: Arc<TabletManager>,
    tablet_id: TabletId,
    files: Option<Vec<TabletFile>>,
    fail_fetch: bool,
    fetch_delay: Duration,
}

#[async_trait::async_trait]
impl RemoteBootstrapClient for InProcessBootstrapClient {
    async fn start(&mut self) -> Result<RemoteTabletSnapshot, RemoteBootstrapError> {
        let handle = self
            .source
            .get_tablet(&self.tablet_id)
            .map_err(|e| RemoteBootstrapError::Rejected {
                code: e.error_code(),
                message: e.to_string(),
            })?;
        let runtime = handle
            .runtime()
            .ok_or_else(|| RemoteBootstrapError::Malformed("source replica not running".into()))?;
        runtime
            .flush_log()
            .map_err(|e| RemoteBootstrapError::Malformed(e.to_string()))?;

        let superblock = handle.metadata().snapshot();
        let consensus = ConsensusMetadata::load(self.source.layout(), &self.tablet_id)?;
        self.files = Some(collect_tablet_files(&superblock.data_dir(), &superblock.wal_dir())?);
        Ok(RemoteTabletSnapshot { superblock, consensus })
    }

    async fn fetch_all(&mut self, data_dir: &Path, wal_dir: &Path) -> Result<(), RemoteBootstrapError> {
        tokio::time::sleep(self.fetch_delay).await;
        if self.fail_fetch {
            return Err(RemoteBootstrapError::Malformed("connection reset while fetching".into()));
        }
        let files = self.files.take().ok_or(RemoteBootstrapError::NotStarted)?;
        install_tablet_files(&files, data_dir, wal_dir)?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), RemoteBootstrapError> {
        Ok(())
    }

    async fn remove(&mut self) {}
}
