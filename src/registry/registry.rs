use crate::api::{TableId, TabletId};
use crate::registry::{AckOutcome, HeartbeatTrigger, ReportedTablet, TabletReport, TabletReportUpdates};
use crate::replica::{ReplicaHandle, StateChangeListener};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

/// Lifecycle of the whole manager. Only ever moves forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ManagerState {
    Initializing,
    Running,
    Quiescing,
    Shutdown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterMode {
    New,
    /// Swap out an existing entry, e.g. a tombstone replaced by remote bootstrap.
    Replacement,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tablet manager is shutting down")]
    ShutdownInProgress,
    #[error("Tablet {0} already registered")]
    AlreadyPresent(TabletId),
    #[error("Tablet {0} not registered")]
    NotFound(TabletId),
}

struct RegistryState {
    state: ManagerState,
    tablets: HashMap<TabletId, Arc<ReplicaHandle>>,
    // tablet -> sequence number of the report that will carry its latest change.
    dirty: HashMap<TabletId, u64>,
    next_report_seq: u64,
    being_remote_bootstrapped: HashSet<TabletId>,
    being_remote_bootstrapped_by_table: HashMap<TableId, HashSet<TabletId>>,
    bootstrap_sources: HashMap<TabletId, String>,
    blocked_from_lb: HashSet<TabletId>,
}

impl RegistryState {
    fn is_closing(&self) -> bool {
        self.state >= ManagerState::Quiescing
    }

    fn mark_dirty(&mut self, tablet_id: &TabletId) -> u64 {
        let seq = self.next_report_seq;
        self.dirty.insert(tablet_id.clone(), seq);
        seq
    }
}

/// Registered replicas plus the dirty bookkeeping of the reporting protocol, under one
/// reader/writer lock. Nothing slow happens while the lock is held.
pub struct Registry {
    logger: slog::Logger,
    inner: RwLock<RegistryState>,
    heartbeat_trigger: HeartbeatTrigger,
}

impl Registry {
    pub fn new(logger: slog::Logger, heartbeat_trigger: HeartbeatTrigger) -> Arc<Self> {
        Arc::new(Registry {
            logger,
            inner: RwLock::new(RegistryState {
                state: ManagerState::Initializing,
                tablets: HashMap::new(),
                dirty: HashMap::new(),
                next_report_seq: 1,
                being_remote_bootstrapped: HashSet::new(),
                being_remote_bootstrapped_by_table: HashMap::new(),
                bootstrap_sources: HashMap::new(),
                blocked_from_lb: HashSet::new(),
            }),
            heartbeat_trigger,
        })
    }

    pub fn heartbeat_trigger(&self) -> &HeartbeatTrigger {
        &self.heartbeat_trigger
    }

    pub fn state(&self) -> ManagerState {
        self.inner.read().state
    }

    pub fn is_closing(&self) -> bool {
        self.inner.read().is_closing()
    }

    /// Moves to `to` if that is forward. Returns whether the state changed.
    pub fn advance_state(&self, to: ManagerState) -> bool {
        let mut inner = self.inner.write();
        if inner.state >= to {
            return false;
        }
        slog::info!(self.logger, "Tablet manager state {:?} -> {:?}", inner.state, to);
        inner.state = to;
        true
    }

    pub fn register(&self, handle: Arc<ReplicaHandle>, mode: RegisterMode) -> Result<(), RegistryError> {
        let tablet_id = handle.tablet_id().clone();
        let mut inner = self.inner.write();
        if inner.is_closing() {
            return Err(RegistryError::ShutdownInProgress);
        }
        let exists = inner.tablets.contains_key(&tablet_id);
        match mode {
            RegisterMode::New if exists => return Err(RegistryError::AlreadyPresent(tablet_id)),
            RegisterMode::Replacement if !exists => return Err(RegistryError::NotFound(tablet_id)),
            _ => {}
        }
        inner.tablets.insert(tablet_id.clone(), handle);
        drop(inner);

        slog::info!(self.logger, "Registered tablet ({:?})", mode; "TabletId" => %tablet_id);
        Ok(())
    }

    /// Drops the entry and its dirty marker. Only while running.
    pub fn erase(&self, tablet_id: &TabletId) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if inner.state != ManagerState::Running {
            return Err(RegistryError::ShutdownInProgress);
        }
        if inner.tablets.remove(tablet_id).is_none() {
            return Err(RegistryError::NotFound(tablet_id.clone()));
        }
        inner.dirty.remove(tablet_id);
        inner.blocked_from_lb.remove(tablet_id);
        Ok(())
    }

    pub fn lookup(&self, tablet_id: &TabletId) -> Option<Arc<ReplicaHandle>> {
        self.inner.read().tablets.get(tablet_id).cloned()
    }

    pub fn handles(&self) -> Vec<Arc<ReplicaHandle>> {
        self.inner.read().tablets.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().tablets.len()
    }

    pub fn mark_dirty(&self, tablet_id: &TabletId, reason: &str) {
        let seq = self.inner.write().mark_dirty(tablet_id);
        slog::debug!(self.logger, "Marked dirty at seq {}: {}", seq, reason; "TabletId" => %tablet_id);
        self.heartbeat_trigger.trigger_asap();
    }

    pub fn num_dirty(&self) -> usize {
        self.inner.read().dirty.len()
    }

    pub fn is_dirty(&self, tablet_id: &TabletId) -> bool {
        self.inner.read().dirty.contains_key(tablet_id)
    }

    /// Dirty replicas, plus those mid remote bootstrap if asked.
    pub fn generate_incremental_report(&self, include_bootstrapping: bool, limit: usize) -> TabletReport {
        self.generate_report(true, include_bootstrapping, limit)
    }

    /// Every registered replica. Sent after (re)registering with the coordinator.
    pub fn generate_full_report(&self, limit: usize) -> TabletReport {
        self.generate_report(false, true, limit)
    }

    fn generate_report(&self, is_incremental: bool, include_bootstrapping: bool, limit: usize) -> TabletReport {
        let mut to_serialize = Vec::new();
        let mut removed_tablet_ids = Vec::new();
        let mut remaining_tablet_count = 0;

        let sequence_number = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;

            // Replicas done with post-split compaction get reported once more with the flag off.
            let blocked: Vec<TabletId> = inner.blocked_from_lb.iter().cloned().collect();
            for tablet_id in blocked {
                let still_blocked = inner
                    .tablets
                    .get(&tablet_id)
                    .map(|handle| handle.runtime().map(|r| r.should_disable_lb_move()).unwrap_or(true));
                match still_blocked {
                    Some(true) => {}
                    Some(false) => {
                        inner.mark_dirty(&tablet_id);
                        inner.blocked_from_lb.remove(&tablet_id);
                    }
                    None => {
                        inner.blocked_from_lb.remove(&tablet_id);
                    }
                }
            }

            if !is_incremental {
                let all: Vec<TabletId> = inner.tablets.keys().cloned().collect();
                for tablet_id in all.iter() {
                    inner.mark_dirty(tablet_id);
                }
            }

            let sequence_number = inner.next_report_seq;
            inner.next_report_seq += 1;

            let mut candidates: Vec<TabletId> = inner.dirty.keys().cloned().collect();
            if include_bootstrapping {
                for tablet_id in inner.being_remote_bootstrapped.iter() {
                    if !inner.dirty.contains_key(tablet_id) {
                        candidates.push(tablet_id.clone());
                    }
                }
            }
            candidates.sort();

            for tablet_id in candidates {
                if to_serialize.len() + removed_tablet_ids.len() >= limit {
                    remaining_tablet_count += 1;
                    continue;
                }
                match inner.tablets.get(&tablet_id) {
                    Some(handle) => {
                        let blocked = inner.blocked_from_lb.contains(&tablet_id);
                        to_serialize.push((handle.clone(), blocked));
                    }
                    None if inner.dirty.remove(&tablet_id).is_some() => removed_tablet_ids.push(tablet_id),
                    // Mid remote bootstrap and not registered yet.
                    None => {}
                }
            }
            sequence_number
        };

        // Reading consensus state can be slow, so it happens outside the lock.
        let updated_tablets: Vec<ReportedTablet> = to_serialize
            .into_iter()
            .map(|(handle, blocked)| handle.reported_tablet(blocked))
            .collect();

        slog::debug!(
            self.logger,
            "Generated {} report {}: {} updated, {} removed, {} remaining",
            if is_incremental { "incremental" } else { "full" },
            sequence_number,
            updated_tablets.len(),
            removed_tablet_ids.len(),
            remaining_tablet_count
        );
        TabletReport {
            is_incremental,
            sequence_number,
            updated_tablets,
            removed_tablet_ids,
            remaining_tablet_count,
        }
    }

    /// Clears acknowledged replicas unless they changed again after the acknowledged report.
    pub fn acknowledge_report(&self, updates: &TabletReportUpdates, strict: bool) -> AckOutcome {
        let seq = updates.sequence_number;
        let mut outcome = AckOutcome::default();
        {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            for tablet_id in updates.tablet_ids.iter() {
                match inner.dirty.get(tablet_id) {
                    Some(change_seq) if *change_seq <= seq => {
                        inner.dirty.remove(tablet_id);
                        outcome.cleared += 1;
                    }
                    _ => {}
                }
            }
            if strict {
                outcome.unreported = inner
                    .dirty
                    .iter()
                    .filter(|(_, change_seq)| **change_seq <= seq)
                    .map(|(tablet_id, change_seq)| (tablet_id.clone(), *change_seq))
                    .collect();
            }
        }

        for (tablet_id, change_seq) in outcome.unreported.iter() {
            slog::error!(
                self.logger,
                "Tablet dirty at seq {} was not acknowledged by report {}", change_seq, seq;
                "TabletId" => %tablet_id
            );
        }
        outcome
    }

    pub fn mark_blocked_from_lb(&self, tablet_id: &TabletId) {
        self.inner.write().blocked_from_lb.insert(tablet_id.clone());
    }

    pub fn is_blocked_from_lb(&self, tablet_id: &TabletId) -> bool {
        self.inner.read().blocked_from_lb.contains(tablet_id)
    }

    /// Tracks a remote bootstrap until the returned guard drops.
    pub fn mark_being_remote_bootstrapped(
        self: &Arc<Self>,
        tablet_id: &TabletId,
        table_id: &TableId,
    ) -> BeingRemoteBootstrapped {
        let mut inner = self.inner.write();
        inner.being_remote_bootstrapped.insert(tablet_id.clone());
        inner
            .being_remote_bootstrapped_by_table
            .entry(table_id.clone())
            .or_default()
            .insert(tablet_id.clone());
        let in_table = inner.being_remote_bootstrapped_by_table[table_id].len();
        drop(inner);

        slog::info!(
            self.logger,
            "Remote bootstrapping, {} in flight for table {}", in_table, table_id;
            "TabletId" => %tablet_id
        );
        BeingRemoteBootstrapped {
            registry: self.clone(),
            tablet_id: tablet_id.clone(),
            table_id: table_id.clone(),
        }
    }

    pub fn num_being_remote_bootstrapped(&self) -> usize {
        self.inner.read().being_remote_bootstrapped.len()
    }

    pub fn num_being_remote_bootstrapped_for_table(&self, table_id: &TableId) -> usize {
        self.inner
            .read()
            .being_remote_bootstrapped_by_table
            .get(table_id)
            .map(|tablets| tablets.len())
            .unwrap_or(0)
    }

    /// Records where `tablet_id` is being copied from until the returned guard drops.
    pub fn add_bootstrap_source(self: &Arc<Self>, tablet_id: &TabletId, addr: &str) -> BootstrapSourceEntry {
        self.inner
            .write()
            .bootstrap_sources
            .insert(tablet_id.clone(), addr.to_string());
        BootstrapSourceEntry {
            registry: self.clone(),
            tablet_id: tablet_id.clone(),
        }
    }

    /// Addresses of peers we are currently copying from.
    pub fn bootstrap_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.inner.read().bootstrap_sources.values().cloned().collect();
        sources.sort();
        sources
    }

    /// Forgets every replica. Part of shutdown.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.tablets.clear();
        inner.blocked_from_lb.clear();
    }

    /// Listener handed to replicas. Holds the registry weakly.
    pub fn state_listener(self: &Arc<Self>) -> Arc<dyn StateChangeListener> {
        Arc::new(DirtyMarkingListener {
            registry: Arc::downgrade(self),
        })
    }
}

/// Unmarks a replica as being remote bootstrapped when dropped.
pub struct BeingRemoteBootstrapped {
    registry: Arc<Registry>,
    tablet_id: TabletId,
    table_id: TableId,
}

impl Drop for BeingRemoteBootstrapped {
    fn drop(&mut self) {
        let mut inner = self.registry.inner.write();
        inner.being_remote_bootstrapped.remove(&self.tablet_id);
        let table_empty = match inner.being_remote_bootstrapped_by_table.get_mut(&self.table_id) {
            Some(tablets) => {
                tablets.remove(&self.tablet_id);
                tablets.is_empty()
            }
            None => false,
        };
        if table_empty {
            inner.being_remote_bootstrapped_by_table.remove(&self.table_id);
        }
    }
}

/// Forgets a replica's bootstrap source when dropped.
pub struct BootstrapSourceEntry {
    registry: Arc<Registry>,
    tablet_id: TabletId,
}

impl Drop for BootstrapSourceEntry {
    fn drop(&mut self) {
        self.registry.inner.write().bootstrap_sources.remove(&self.tablet_id);
    }
}

struct DirtyMarkingListener {
    registry: Weak<Registry>,
}

impl StateChangeListener for DirtyMarkingListener {
    fn state_changed(&self, tablet_id: &TabletId, reason: &str) {
        if let Some(registry) = self.registry.upgrade() {
            registry.mark_dirty(tablet_id, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FsOptions, KeyBounds, Partition};
    use crate::metadata::{DataState, FsLayout, Superblock, TabletMetadata};
    use std::path::Path;

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: Arc<FsLayout>,
        registry: Arc<Registry>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let layout = Arc::new(FsLayout::open_or_create(&FsOptions::single_root(dir.path())).unwrap());
            let registry = Registry::new(slog::Logger::root(slog::Discard, slog::o!()), HeartbeatTrigger::new());
            registry.advance_state(ManagerState::Running);
            Fixture {
                _dir: dir,
                layout,
                registry,
            }
        }

        fn handle(&self, id: &str) -> Arc<ReplicaHandle> {
            let root: &Path = self.layout.fs_root();
            let metadata = TabletMetadata::create_new(
                self.layout.clone(),
                Superblock {
                    tablet_id: TabletId::new(id),
                    table_id: TableId::new("users"),
                    table_name: "users".into(),
                    partition: Partition::default(),
                    key_bounds: KeyBounds::default(),
                    data_state: DataState::Ready,
                    data_root_dir: root.to_path_buf(),
                    wal_root_dir: root.to_path_buf(),
                    hidden: false,
                    split_parent_tablet_id: None,
                    split_child_tablet_ids: Vec::new(),
                    split_op_id: None,
                    tombstone_last_logged_op_id: None,
                    post_split_compaction_pending: false,
                },
            )
            .unwrap();
            ReplicaHandle::new(
                &slog::Logger::root(slog::Discard, slog::o!()),
                metadata,
                self.registry.state_listener(),
            )
        }

        fn register(&self, id: &str) -> Arc<ReplicaHandle> {
            let handle = self.handle(id);
            self.registry.register(handle.clone(), RegisterMode::New).unwrap();
            handle
        }
    }

    #[test]
    fn register_modes() {
        let f = Fixture::new();
        let handle = f.register("t1");

        assert!(matches!(
            f.registry.register(handle.clone(), RegisterMode::New),
            Err(RegistryError::AlreadyPresent(_))
        ));
        f.registry.register(handle, RegisterMode::Replacement).unwrap();

        let other = f.handle("t2");
        assert!(matches!(
            f.registry.register(other, RegisterMode::Replacement),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn no_registration_once_quiescing() {
        let f = Fixture::new();
        f.registry.advance_state(ManagerState::Quiescing);

        assert!(!f.registry.advance_state(ManagerState::Running));
        assert!(matches!(
            f.registry.register(f.handle("t1"), RegisterMode::New),
            Err(RegistryError::ShutdownInProgress)
        ));
    }

    #[test]
    fn report_then_ack_clears_dirty() {
        let f = Fixture::new();
        f.register("t1");
        f.registry.mark_dirty(&TabletId::new("t1"), "test");

        let report = f.registry.generate_incremental_report(false, 100);
        assert_eq!(report.sequence_number, 1);
        assert_eq!(report.updated_tablet_ids(), vec![TabletId::new("t1")]);

        let outcome = f.registry.acknowledge_report(
            &TabletReportUpdates {
                sequence_number: report.sequence_number,
                tablet_ids: report.updated_tablet_ids(),
            },
            true,
        );
        assert_eq!(outcome.cleared, 1);
        assert!(outcome.unreported.is_empty());
        assert_eq!(f.registry.num_dirty(), 0);
    }

    #[test]
    fn change_after_report_survives_ack() {
        let f = Fixture::new();
        f.register("t1");
        let t1 = TabletId::new("t1");
        f.registry.mark_dirty(&t1, "first change");

        let report = f.registry.generate_incremental_report(false, 100);
        f.registry.mark_dirty(&t1, "second change");
        f.registry.acknowledge_report(
            &TabletReportUpdates {
                sequence_number: report.sequence_number,
                tablet_ids: vec![t1.clone()],
            },
            false,
        );

        assert!(f.registry.is_dirty(&t1));
        let next = f.registry.generate_incremental_report(false, 100);
        assert_eq!(next.sequence_number, report.sequence_number + 1);
        assert_eq!(next.updated_tablet_ids(), vec![t1]);
    }

    #[test]
    fn limit_leaves_rest_dirty() {
        let f = Fixture::new();
        for id in ["a", "b", "c"].iter() {
            f.register(id);
            f.registry.mark_dirty(&TabletId::new(*id), "test");
        }

        let report = f.registry.generate_incremental_report(false, 2);
        assert_eq!(report.updated_tablets.len(), 2);
        assert_eq!(report.remaining_tablet_count, 1);

        f.registry.acknowledge_report(
            &TabletReportUpdates {
                sequence_number: report.sequence_number,
                tablet_ids: report.updated_tablet_ids(),
            },
            false,
        );
        assert_eq!(f.registry.num_dirty(), 1);
    }

    #[test]
    fn strict_ack_flags_missed_tablets() {
        let f = Fixture::new();
        f.register("a");
        f.register("b");
        f.registry.mark_dirty(&TabletId::new("a"), "test");
        f.registry.mark_dirty(&TabletId::new("b"), "test");
        let report = f.registry.generate_incremental_report(false, 100);

        let outcome = f.registry.acknowledge_report(
            &TabletReportUpdates {
                sequence_number: report.sequence_number,
                tablet_ids: vec![TabletId::new("a")],
            },
            true,
        );

        assert_eq!(outcome.unreported, vec![(TabletId::new("b"), report.sequence_number)]);
    }

    #[test]
    fn erased_dirty_tablet_is_reported_removed() {
        let f = Fixture::new();
        f.register("t1");
        let t1 = TabletId::new("t1");
        f.registry.mark_dirty(&t1, "test");
        f.registry.erase(&t1).unwrap();
        // Erase drops the marker; a late state change re-dirties it.
        f.registry.mark_dirty(&t1, "late change");

        let report = f.registry.generate_incremental_report(false, 100);

        assert!(report.updated_tablets.is_empty());
        assert_eq!(report.removed_tablet_ids, vec![t1]);
        assert_eq!(f.registry.num_dirty(), 0);
    }

    #[test]
    fn full_report_covers_every_tablet() {
        let f = Fixture::new();
        f.register("a");
        f.register("b");

        let report = f.registry.generate_full_report(100);

        assert!(!report.is_incremental);
        assert_eq!(report.updated_tablets.len(), 2);
        assert_eq!(f.registry.num_dirty(), 2);
    }

    #[test]
    fn listener_marks_dirty_and_dies_with_registry() {
        let f = Fixture::new();
        let handle = f.register("t1");

        handle.set_bootstrapping().unwrap();
        assert!(f.registry.is_dirty(&TabletId::new("t1")));

        let listener = f.registry.state_listener();
        drop(f);
        listener.state_changed(&TabletId::new("t1"), "after registry is gone");
    }

    #[test]
    fn bootstrapping_tablets_are_tracked_per_table() {
        let f = Fixture::new();
        let table = TableId::new("users");

        let guard = f.registry.mark_being_remote_bootstrapped(&TabletId::new("t1"), &table);
        assert_eq!(f.registry.num_being_remote_bootstrapped_for_table(&table), 1);
        let report = f.registry.generate_incremental_report(true, 100);
        assert!(report.updated_tablets.is_empty());
        assert!(report.removed_tablet_ids.is_empty());

        drop(guard);
        assert_eq!(f.registry.num_being_remote_bootstrapped(), 0);
        assert_eq!(f.registry.num_being_remote_bootstrapped_for_table(&table), 0);
    }
}
