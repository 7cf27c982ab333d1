use crate::api::{MemberType, OpId, TabletId};
use crate::commitlog::{self, SegmentedLog};
use crate::metadata::{ConsensusMetadata, TabletMetadata, CHECKPOINTS_DIR};
use crate::replica::{
    BootstrapContext, ConsensusStateSnapshot, LeaderStatus, ReplicaRuntime, ReplicaRuntimeFactory, RuntimeError,
    StateChangeListener,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-node, file-backed runtime. Becomes leader on start when it is the only voter of its
/// committed config; otherwise it stays a follower.
pub struct LocalReplicaRuntime {
    logger: slog::Logger,
    local_uuid: String,
    metadata: Arc<TabletMetadata>,
    listener: Arc<dyn StateChangeListener>,
    log: Mutex<SegmentedLog>,
    cmeta: Mutex<ConsensusMetadata>,
    running: AtomicBool,
    shut_down: AtomicBool,
}

impl LocalReplicaRuntime {
    pub fn bootstrap(context: BootstrapContext) -> Result<Arc<Self>, RuntimeError> {
        let BootstrapContext {
            logger,
            local_uuid,
            metadata,
            listener,
        } = context;

        let data_state = metadata.data_state();
        if !data_state.can_serve_tablet_data() {
            return Err(RuntimeError::Failed(format!(
                "cannot bootstrap tablet in data state {}",
                data_state
            )));
        }

        fs::create_dir_all(metadata.data_dir())?;
        let cmeta = ConsensusMetadata::load(metadata.layout(), metadata.tablet_id())?;
        let log = SegmentedLog::open(logger.clone(), &metadata.wal_dir())?;
        slog::info!(logger, "Bootstrapped replica, last logged op {:?}", log.last_op_id());

        Ok(Arc::new(LocalReplicaRuntime {
            logger,
            local_uuid,
            metadata,
            listener,
            log: Mutex::new(log),
            cmeta: Mutex::new(cmeta),
            running: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }))
    }

    fn tablet_id(&self) -> &TabletId {
        self.metadata.tablet_id()
    }

    fn is_sole_voter(&self) -> bool {
        let cmeta = self.cmeta.lock();
        let config = &cmeta.committed_config;
        config.num_voters() == 1
            && config
                .peer(&self.local_uuid)
                .map(|peer| peer.member_type == MemberType::Voter)
                .unwrap_or(false)
    }

    /// Replicates `data` as the leader. Single-node, so appending is committing.
    pub fn append(&self, data: Bytes) -> Result<OpId, RuntimeError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(RuntimeError::NotRunning("replica not started".into()));
        }
        if self.leader_status() != LeaderStatus::Leader {
            return Err(RuntimeError::Failed("not the leader".into()));
        }
        let term = self.cmeta.lock().current_term;
        let mut log = self.log.lock();
        let op_id = log.append(term, data)?;
        log.flush()?;
        Ok(op_id)
    }
}

impl ReplicaRuntime for LocalReplicaRuntime {
    fn start(&self) -> Result<(), RuntimeError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(RuntimeError::NotRunning("replica was shut down".into()));
        }
        if self.is_sole_voter() {
            let mut cmeta = self.cmeta.lock();
            let last_term = self.log.lock().last_op_id().term;
            cmeta.current_term = cmeta.current_term.max(last_term) + 1;
            cmeta.flush(self.metadata.layout())?;
            slog::info!(self.logger, "Elected leader for term {}", cmeta.current_term);
        }
        self.running.store(true, Ordering::Release);
        self.listener.state_changed(self.tablet_id(), "consensus started");
        Ok(())
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.running.store(false, Ordering::Release);
        if let Err(e) = self.log.lock().flush() {
            slog::warn!(self.logger, "Failed to flush log on shutdown: {}", e);
        }
    }

    fn flush_log(&self) -> Result<(), RuntimeError> {
        self.log.lock().flush()?;
        Ok(())
    }

    fn copy_log_to(&self, dest_wal_dir: &Path) -> Result<(), RuntimeError> {
        let mut log = self.log.lock();
        log.flush()?;
        commitlog::copy_to(log.dir(), dest_wal_dir)?;
        Ok(())
    }

    fn create_checkpoint(&self, dest_data_dir: &Path) -> Result<(), RuntimeError> {
        copy_dir(&self.metadata.data_dir(), dest_data_dir)?;
        Ok(())
    }

    fn last_logged_op_id(&self) -> OpId {
        self.log.lock().last_op_id()
    }

    fn committed_config_opid_index(&self) -> Option<i64> {
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        Some(self.cmeta.lock().committed_config.opid_index)
    }

    fn consensus_state(&self) -> Option<ConsensusStateSnapshot> {
        if self.shut_down.load(Ordering::Acquire) {
            return None;
        }
        let leader_uuid = match self.leader_status() {
            LeaderStatus::Leader => Some(self.local_uuid.clone()),
            LeaderStatus::NotLeader => None,
        };
        let cmeta = self.cmeta.lock();
        Some(ConsensusStateSnapshot {
            current_term: cmeta.current_term,
            leader_uuid,
            config: cmeta.committed_config.clone(),
        })
    }

    fn leader_status(&self) -> LeaderStatus {
        if self.running.load(Ordering::Acquire) && self.is_sole_voter() {
            LeaderStatus::Leader
        } else {
            LeaderStatus::NotLeader
        }
    }

    fn needs_post_split_compaction(&self) -> bool {
        self.metadata.post_split_compaction_pending()
    }

    fn compact(&self) -> Result<(), RuntimeError> {
        self.metadata.set_post_split_compaction_pending(false);
        self.metadata.flush()?;
        slog::info!(self.logger, "Post-split compaction done");
        self.listener.state_changed(self.tablet_id(), "post-split compaction done");
        Ok(())
    }

    fn should_disable_lb_move(&self) -> bool {
        self.metadata.post_split_compaction_pending()
    }

    fn verify_data_integrity(&self) -> Result<(), RuntimeError> {
        let data_dir = self.metadata.data_dir();
        if !data_dir.is_dir() {
            return Err(RuntimeError::Corruption(format!("data dir {:?} is missing", data_dir)));
        }
        let entries = self.log.lock().read_all()?;
        let mut previous = OpId::default();
        for entry in entries {
            if entry.op_id.index != previous.index + 1 || entry.op_id.term < previous.term {
                return Err(RuntimeError::Corruption(format!(
                    "log entry {:?} follows {:?}",
                    entry.op_id, previous
                )));
            }
            previous = entry.op_id;
        }
        Ok(())
    }
}

/// Copies `src` into `dest` recursively, skipping checkpoint scratch space.
fn copy_dir(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let entries = match fs::read_dir(src) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_name() == CHECKPOINTS_DIR {
            continue;
        }
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Builds `LocalReplicaRuntime`s.
pub struct LocalReplicaRuntimeFactory;

impl ReplicaRuntimeFactory for LocalReplicaRuntimeFactory {
    fn bootstrap(&self, context: BootstrapContext) -> Result<Arc<dyn ReplicaRuntime>, RuntimeError> {
        let runtime: Arc<dyn ReplicaRuntime> = LocalReplicaRuntime::bootstrap(context)?;
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FsOptions, KeyBounds, Partition, RaftConfig, RaftPeer, TableId, INVALID_OPID_INDEX};
    use crate::metadata::{DataState, FsLayout, Superblock};

    struct NoopListener;

    impl StateChangeListener for NoopListener {
        fn state_changed(&self, _tablet_id: &TabletId, _reason: &str) {}
    }

    fn voter(uuid: &str) -> RaftPeer {
        RaftPeer {
            permanent_uuid: uuid.into(),
            member_type: MemberType::Voter,
            host: "127.0.0.1".into(),
            port: 9100,
        }
    }

    fn bootstrap(dir: &Path, peers: Vec<RaftPeer>) -> Arc<LocalReplicaRuntime> {
        let layout = Arc::new(FsLayout::open_or_create(&FsOptions::single_root(dir)).unwrap());
        let tablet_id = TabletId::new("t1");
        let metadata = TabletMetadata::create_new(
            layout.clone(),
            Superblock {
                tablet_id: tablet_id.clone(),
                table_id: TableId::new("users"),
                table_name: "users".into(),
                partition: Partition::default(),
                key_bounds: KeyBounds::default(),
                data_state: DataState::Ready,
                data_root_dir: dir.to_path_buf(),
                wal_root_dir: dir.to_path_buf(),
                hidden: false,
                split_parent_tablet_id: None,
                split_child_tablet_ids: Vec::new(),
                split_op_id: None,
                tombstone_last_logged_op_id: None,
                post_split_compaction_pending: false,
            },
        )
        .unwrap();
        let config = RaftConfig {
            opid_index: INVALID_OPID_INDEX,
            peers,
        };
        ConsensusMetadata::create(&layout, &tablet_id, "ts-1", config, 0).unwrap();

        LocalReplicaRuntime::bootstrap(BootstrapContext {
            logger: slog::Logger::root(slog::Discard, slog::o!()),
            local_uuid: "ts-1".into(),
            metadata,
            listener: Arc::new(NoopListener),
        })
        .unwrap()
    }

    #[test]
    fn sole_voter_leads_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = bootstrap(dir.path(), vec![voter("ts-1")]);

        runtime.start().unwrap();
        assert_eq!(runtime.leader_status(), LeaderStatus::Leader);
        let op_id = runtime.append(Bytes::from_static(b"row")).unwrap();

        assert_eq!(op_id, OpId::new(1, 1));
        assert_eq!(runtime.last_logged_op_id(), op_id);
        assert_eq!(
            runtime.consensus_state().unwrap().leader_uuid.as_deref(),
            Some("ts-1")
        );
        runtime.verify_data_integrity().unwrap();
    }

    #[test]
    fn follower_of_larger_config_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = bootstrap(dir.path(), vec![voter("ts-1"), voter("ts-2"), voter("ts-3")]);

        runtime.start().unwrap();

        assert_eq!(runtime.leader_status(), LeaderStatus::NotLeader);
        assert!(runtime.append(Bytes::new()).is_err());
    }

    #[test]
    fn shutdown_hides_consensus() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = bootstrap(dir.path(), vec![voter("ts-1")]);
        runtime.start().unwrap();

        runtime.shutdown();

        assert_eq!(runtime.committed_config_opid_index(), None);
        assert!(runtime.consensus_state().is_none());
        assert!(runtime.start().is_err());
    }
}
