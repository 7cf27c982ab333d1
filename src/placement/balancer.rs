use crate::api::{TableId, TabletId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DirKind {
    Data,
    Wal,
}

impl fmt::Display for DirKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirKind::Data => f.write_str("data"),
            DirKind::Wal => f.write_str("wal"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    #[error("No {kind} root assigned to tablet {tablet_id} of table {table_id}")]
    NotFound {
        kind: DirKind,
        table_id: TableId,
        tablet_id: TabletId,
    },
    #[error("No {0} roots configured")]
    NoRoots(DirKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignedRoots {
    pub data_root: PathBuf,
    pub wal_root: PathBuf,
}

// root -> tablets assigned there. BTreeMap so ties go to the lexicographically smallest root.
type RootAssignments = BTreeMap<PathBuf, HashSet<TabletId>>;

struct RootSet {
    kind: DirKind,
    roots: Vec<PathBuf>,
    by_table: HashMap<TableId, RootAssignments>,
}

impl RootSet {
    fn new(kind: DirKind, roots: Vec<PathBuf>) -> Self {
        RootSet {
            kind,
            roots,
            by_table: HashMap::new(),
        }
    }

    fn least_loaded(&mut self, table_id: &TableId) -> Result<PathBuf, BalancerError> {
        let roots = &self.roots;
        let assignments = self.by_table.entry(table_id.clone()).or_insert_with(|| {
            roots
                .iter()
                .map(|root| (root.clone(), HashSet::new()))
                .collect::<RootAssignments>()
        });

        assignments
            .iter()
            .min_by(|(a_root, a), (b_root, b)| a.len().cmp(&b.len()).then_with(|| a_root.cmp(b_root)))
            .map(|(root, _)| root.clone())
            .ok_or(BalancerError::NoRoots(self.kind))
    }

    fn insert(&mut self, table_id: &TableId, tablet_id: &TabletId, root: &Path) {
        let roots = &self.roots;
        self.by_table
            .entry(table_id.clone())
            .or_insert_with(|| {
                roots
                    .iter()
                    .map(|root| (root.clone(), HashSet::new()))
                    .collect::<RootAssignments>()
            })
            .entry(root.to_path_buf())
            .or_default()
            .insert(tablet_id.clone());
    }

    fn remove(&mut self, table_id: &TableId, tablet_id: &TabletId) -> bool {
        let assignments = match self.by_table.get_mut(table_id) {
            Some(assignments) => assignments,
            None => return false,
        };
        let mut removed = false;
        for tablets in assignments.values_mut() {
            removed |= tablets.remove(tablet_id);
        }
        removed
    }

    fn lookup(&self, table_id: &TableId, tablet_id: &TabletId) -> Option<PathBuf> {
        self.by_table.get(table_id).and_then(|assignments| {
            assignments
                .iter()
                .find(|(_, tablets)| tablets.contains(tablet_id))
                .map(|(root, _)| root.clone())
        })
    }

    fn load(&self, table_id: &TableId) -> BTreeMap<PathBuf, usize> {
        self.by_table
            .get(table_id)
            .map(|assignments| assignments.iter().map(|(root, tablets)| (root.clone(), tablets.len())).collect())
            .unwrap_or_default()
    }
}

struct Inner {
    data: RootSet,
    wal: RootSet,
}

impl Inner {
    fn set(&mut self, kind: DirKind) -> &mut RootSet {
        match kind {
            DirKind::Data => &mut self.data,
            DirKind::Wal => &mut self.wal,
        }
    }
}

/// Per-table least-loaded root selection, tracked independently for data and WAL roots.
///
/// The system table is never tracked: its tablets always live on the first root.
pub struct DirectoryBalancer {
    logger: slog::Logger,
    system_table_id: TableId,
    inner: Mutex<Inner>,
}

impl DirectoryBalancer {
    pub fn new(logger: slog::Logger, data_roots: Vec<PathBuf>, wal_roots: Vec<PathBuf>, system_table_id: TableId) -> Self {
        DirectoryBalancer {
            logger,
            system_table_id,
            inner: Mutex::new(Inner {
                data: RootSet::new(DirKind::Data, data_roots),
                wal: RootSet::new(DirKind::Wal, wal_roots),
            }),
        }
    }

    pub fn is_system_table(&self, table_id: &TableId) -> bool {
        table_id == &self.system_table_id
    }

    /// Picks the least loaded data and WAL roots for a new tablet and records the choice.
    pub fn assign_new(&self, table_id: &TableId, tablet_id: &TabletId) -> Result<AssignedRoots, BalancerError> {
        let mut inner = self.inner.lock();
        if self.is_system_table(table_id) {
            return Ok(AssignedRoots {
                data_root: first_root(&inner.data)?,
                wal_root: first_root(&inner.wal)?,
            });
        }

        let mut assigned = Vec::with_capacity(2);
        for kind in [DirKind::Data, DirKind::Wal].iter() {
            let set = inner.set(*kind);
            let root = set.least_loaded(table_id)?;
            set.insert(table_id, tablet_id, &root);
            assigned.push(root);
        }
        let wal_root = assigned.pop().ok_or(BalancerError::NoRoots(DirKind::Wal))?;
        let data_root = assigned.pop().ok_or(BalancerError::NoRoots(DirKind::Data))?;

        slog::debug!(
            self.logger,
            "Assigned data root {:?} and wal root {:?}", data_root, wal_root;
            "TabletId" => %tablet_id
        );
        Ok(AssignedRoots { data_root, wal_root })
    }

    /// Records roots already chosen elsewhere, e.g. read back from a superblock.
    pub fn register(&self, table_id: &TableId, tablet_id: &TabletId, roots: &AssignedRoots) {
        if self.is_system_table(table_id) {
            return;
        }
        let mut inner = self.inner.lock();
        inner.data.insert(table_id, tablet_id, &roots.data_root);
        inner.wal.insert(table_id, tablet_id, &roots.wal_root);
    }

    pub fn lookup(&self, kind: DirKind, table_id: &TableId, tablet_id: &TabletId) -> Result<PathBuf, BalancerError> {
        let mut inner = self.inner.lock();
        inner.set(kind).lookup(table_id, tablet_id).ok_or_else(|| BalancerError::NotFound {
            kind,
            table_id: table_id.clone(),
            tablet_id: tablet_id.clone(),
        })
    }

    /// Missing entries are tolerated: a restart can lose an assignment that was never persisted.
    pub fn unregister(&self, table_id: &TableId, tablet_id: &TabletId) {
        if self.is_system_table(table_id) {
            return;
        }
        let mut inner = self.inner.lock();
        for kind in [DirKind::Data, DirKind::Wal].iter() {
            if !inner.set(*kind).remove(table_id, tablet_id) {
                slog::warn!(
                    self.logger,
                    "Tablet has no {} root assignment to remove", kind;
                    "TabletId" => %tablet_id
                );
            }
        }
    }

    /// Number of tablets of `table_id` on each root of `kind`.
    pub fn load(&self, kind: DirKind, table_id: &TableId) -> BTreeMap<PathBuf, usize> {
        let mut inner = self.inner.lock();
        inner.set(kind).load(table_id)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.data.by_table.clear();
        inner.wal.by_table.clear();
    }
}

fn first_root(set: &RootSet) -> Result<PathBuf, BalancerError> {
    set.roots.first().cloned().ok_or(BalancerError::NoRoots(set.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn balancer(num_roots: usize) -> DirectoryBalancer {
        let roots: Vec<PathBuf> = (0..num_roots).map(|i| PathBuf::from(format!("/mnt/d{}", i))).collect();
        DirectoryBalancer::new(
            slog::Logger::root(slog::Discard, slog::o!()),
            roots.clone(),
            roots,
            TableId::new("sys"),
        )
    }

    #[test]
    fn ties_break_on_smallest_root() {
        let balancer = balancer(3);
        let table = TableId::new("users");

        let first = balancer.assign_new(&table, &TabletId::new("t1")).unwrap();
        let second = balancer.assign_new(&table, &TabletId::new("t2")).unwrap();

        assert_eq!(first.data_root, PathBuf::from("/mnt/d0"));
        assert_eq!(second.data_root, PathBuf::from("/mnt/d1"));
        assert_eq!(second.wal_root, PathBuf::from("/mnt/d1"));
    }

    #[test]
    fn tables_are_balanced_independently() {
        let balancer = balancer(2);

        let a = balancer.assign_new(&TableId::new("a"), &TabletId::new("a1")).unwrap();
        let b = balancer.assign_new(&TableId::new("b"), &TabletId::new("b1")).unwrap();

        assert_eq!(a.data_root, b.data_root);
    }

    #[test]
    fn register_lookup_unregister() {
        let balancer = balancer(2);
        let table = TableId::new("users");
        let tablet = TabletId::new("t1");
        let roots = AssignedRoots {
            data_root: PathBuf::from("/mnt/d1"),
            wal_root: PathBuf::from("/mnt/d0"),
        };

        balancer.register(&table, &tablet, &roots);
        assert_eq!(balancer.lookup(DirKind::Data, &table, &tablet).unwrap(), roots.data_root);
        assert_eq!(balancer.lookup(DirKind::Wal, &table, &tablet).unwrap(), roots.wal_root);

        balancer.unregister(&table, &tablet);
        assert!(matches!(
            balancer.lookup(DirKind::Data, &table, &tablet),
            Err(BalancerError::NotFound { .. })
        ));

        // Second unregister only logs.
        balancer.unregister(&table, &tablet);
    }

    #[test]
    fn system_table_is_not_tracked() {
        let balancer = balancer(3);
        let sys = TableId::new("sys");

        for i in 0..5 {
            let roots = balancer.assign_new(&sys, &TabletId::new(format!("s{}", i))).unwrap();
            assert_eq!(roots.data_root, PathBuf::from("/mnt/d0"));
        }
        assert!(balancer.load(DirKind::Data, &sys).is_empty());
    }

    #[test]
    fn no_roots_is_an_error() {
        let balancer = balancer(0);
        assert!(matches!(
            balancer.assign_new(&TableId::new("t"), &TabletId::new("x")),
            Err(BalancerError::NoRoots(DirKind::Data))
        ));
    }

    proptest! {
        #[test]
        fn assignment_stays_within_ceiling_plus_one(num_roots in 1usize..8, num_tablets in 0usize..200) {
            let balancer = balancer(num_roots);
            let table = TableId::new("t");

            for i in 0..num_tablets {
                balancer.assign_new(&table, &TabletId::new(format!("tablet-{}", i))).unwrap();
            }

            let bound = (num_tablets + num_roots - 1) / num_roots + 1;
            for kind in [DirKind::Data, DirKind::Wal].iter() {
                let load = balancer.load(*kind, &table);
                prop_assert_eq!(load.values().sum::<usize>(), num_tablets);
                for count in load.values() {
                    prop_assert!(*count <= bound);
                }
            }
        }
    }
}
