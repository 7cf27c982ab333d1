use crate::api::{KeyBounds, OpId, Partition, TableId, TabletId};
use crate::grpc::ProtoSuperBlock;
use crate::metadata::convert::{superblock_from_proto, superblock_to_proto};
use crate::metadata::layout::{io_error, remove_dir_if_exists, remove_empty_parent, remove_file_if_exists, write_atomic};
use crate::metadata::{DataState, FsLayout, MetadataError};
use parking_lot::Mutex;
use prost::Message;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Contents of a tablet's superblock file.
#[derive(Clone, Debug, PartialEq)]
pub struct Superblock {
    pub tablet_id: TabletId,
    pub table_id: TableId,
    pub table_name: String,
    pub partition: Partition,
    pub key_bounds: KeyBounds,
    pub data_state: DataState,
    pub data_root_dir: PathBuf,
    pub wal_root_dir: PathBuf,
    pub hidden: bool,
    pub split_parent_tablet_id: Option<TabletId>,
    pub split_child_tablet_ids: Vec<TabletId>,
    pub split_op_id: Option<OpId>,
    pub tombstone_last_logged_op_id: Option<OpId>,
    pub post_split_compaction_pending: bool,
}

impl Superblock {
    pub fn data_dir(&self) -> PathBuf {
        FsLayout::tablet_data_dir(&self.data_root_dir, &self.table_id, &self.tablet_id)
    }

    pub fn wal_dir(&self) -> PathBuf {
        FsLayout::tablet_wal_dir(&self.wal_root_dir, &self.table_id, &self.tablet_id)
    }
}

/// In-memory owner of a superblock. Mutators only touch memory; `flush` makes them durable.
pub struct TabletMetadata {
    layout: Arc<FsLayout>,
    tablet_id: TabletId,
    table_id: TableId,
    superblock: Mutex<Superblock>,
    // Serializes writers of the superblock file.
    flush_lock: Mutex<()>,
}

impl TabletMetadata {
    /// Persists a brand new superblock. Fails if one already exists for the tablet.
    pub fn create_new(layout: Arc<FsLayout>, superblock: Superblock) -> Result<Arc<Self>, MetadataError> {
        let path = layout.superblock_path(&superblock.tablet_id);
        if path.exists() {
            return Err(MetadataError::AlreadyExists(path));
        }
        Self::persist(layout, superblock)
    }

    /// Persists `superblock`, overwriting whatever was on disk for the tablet.
    pub fn persist(layout: Arc<FsLayout>, superblock: Superblock) -> Result<Arc<Self>, MetadataError> {
        let meta = Arc::new(TabletMetadata {
            layout,
            tablet_id: superblock.tablet_id.clone(),
            table_id: superblock.table_id.clone(),
            superblock: Mutex::new(superblock),
            flush_lock: Mutex::new(()),
        });
        meta.flush()?;
        Ok(meta)
    }

    pub fn load(layout: Arc<FsLayout>, tablet_id: &TabletId) -> Result<Arc<Self>, MetadataError> {
        let path = layout.superblock_path(tablet_id);
        let bytes = fs::read(&path).map_err(io_error(&path))?;
        let proto = ProtoSuperBlock::decode(&bytes[..]).map_err(|source| MetadataError::Decode {
            path: path.clone(),
            source,
        })?;
        let superblock = superblock_from_proto(proto).map_err(|reason| MetadataError::Corrupt {
            path: path.clone(),
            reason,
        })?;
        if &superblock.tablet_id != tablet_id {
            return Err(MetadataError::Corrupt {
                path,
                reason: format!("superblock belongs to tablet {}", superblock.tablet_id),
            });
        }

        Ok(Arc::new(TabletMetadata {
            layout,
            tablet_id: superblock.tablet_id.clone(),
            table_id: superblock.table_id.clone(),
            superblock: Mutex::new(superblock),
            flush_lock: Mutex::new(()),
        }))
    }

    pub fn flush(&self) -> Result<(), MetadataError> {
        let _flush = self.flush_lock.lock();
        let proto = superblock_to_proto(&self.superblock.lock());
        let mut buf = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buf).map_err(|e| MetadataError::Corrupt {
            path: self.layout.superblock_path(&self.tablet_id),
            reason: e.to_string(),
        })?;
        write_atomic(&self.layout.superblock_path(&self.tablet_id), &buf)
    }

    pub fn layout(&self) -> &Arc<FsLayout> {
        &self.layout
    }

    pub fn tablet_id(&self) -> &TabletId {
        &self.tablet_id
    }

    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    pub fn snapshot(&self) -> Superblock {
        self.superblock.lock().clone()
    }

    pub fn data_state(&self) -> DataState {
        self.superblock.lock().data_state
    }

    pub fn set_data_state(&self, state: DataState) {
        self.superblock.lock().data_state = state;
    }

    pub fn hidden(&self) -> bool {
        self.superblock.lock().hidden
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.superblock.lock().hidden = hidden;
    }

    pub fn data_dir(&self) -> PathBuf {
        self.superblock.lock().data_dir()
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.superblock.lock().wal_dir()
    }

    pub fn data_root_dir(&self) -> PathBuf {
        self.superblock.lock().data_root_dir.clone()
    }

    pub fn wal_root_dir(&self) -> PathBuf {
        self.superblock.lock().wal_root_dir.clone()
    }

    pub fn tombstone_last_logged_op_id(&self) -> Option<OpId> {
        self.superblock.lock().tombstone_last_logged_op_id
    }

    pub fn post_split_compaction_pending(&self) -> bool {
        self.superblock.lock().post_split_compaction_pending
    }

    pub fn set_post_split_compaction_pending(&self, pending: bool) {
        self.superblock.lock().post_split_compaction_pending = pending;
    }

    /// Records the split outcome on the parent. Caller flushes.
    pub fn set_split_done(&self, op_id: OpId, child1: TabletId, child2: TabletId) {
        let mut superblock = self.superblock.lock();
        superblock.split_op_id = Some(op_id);
        superblock.split_child_tablet_ids = vec![child1, child2];
        superblock.data_state = DataState::SplitCompleted;
    }

    /// Persists the superblock of a split child. The child shares the parent's roots and starts
    /// out as INIT_STARTED.
    pub fn create_subtablet(
        &self,
        child_id: &TabletId,
        partition: Partition,
        key_bounds: KeyBounds,
        split_op_id: OpId,
    ) -> Result<Arc<TabletMetadata>, MetadataError> {
        let parent = self.snapshot();
        let child = Superblock {
            tablet_id: child_id.clone(),
            table_id: parent.table_id,
            table_name: parent.table_name,
            partition,
            key_bounds,
            data_state: DataState::InitStarted,
            data_root_dir: parent.data_root_dir,
            wal_root_dir: parent.wal_root_dir,
            hidden: false,
            split_parent_tablet_id: Some(self.tablet_id.clone()),
            split_child_tablet_ids: Vec::new(),
            split_op_id: Some(split_op_id),
            tombstone_last_logged_op_id: None,
            post_split_compaction_pending: true,
        };
        TabletMetadata::persist(self.layout.clone(), child)
    }

    /// Removes the data directory and records `state` in the superblock. The WAL and consensus
    /// metadata are the caller's concern.
    pub fn delete_tablet_data(&self, state: DataState, last_logged_op_id: Option<OpId>) -> Result<(), MetadataError> {
        if !state.is_deleted_or_tombstoned() {
            return Err(MetadataError::InvalidState(format!(
                "cannot delete tablet data into state {}",
                state
            )));
        }

        let data_dir = self.data_dir();
        remove_dir_if_exists(&data_dir)?;
        remove_empty_parent(&data_dir);

        {
            let mut superblock = self.superblock.lock();
            superblock.data_state = state;
            superblock.post_split_compaction_pending = false;
            if let Some(op_id) = last_logged_op_id {
                superblock.tombstone_last_logged_op_id = Some(op_id);
            }
        }
        self.flush()
    }

    pub fn is_tombstoned_with_no_data(&self) -> bool {
        let superblock = self.superblock.lock();
        superblock.data_state == DataState::Tombstoned && !superblock.data_dir().exists()
    }

    /// Final step of a deletion. Only legal once the data state is DELETED.
    pub fn delete_superblock(&self) -> Result<(), MetadataError> {
        let state = self.data_state();
        if state != DataState::Deleted {
            return Err(MetadataError::InvalidState(format!(
                "tablet {} must be {} before its superblock is deleted, not {}",
                self.tablet_id,
                DataState::Deleted,
                state
            )));
        }
        remove_file_if_exists(&self.layout.superblock_path(&self.tablet_id))?;
        Ok(())
    }
}
