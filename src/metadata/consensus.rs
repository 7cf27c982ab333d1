use crate::api::{RaftConfig, TabletId};
use crate::grpc::ProtoConsensusMetadata;
use crate::metadata::convert::{consensus_metadata_from_proto, consensus_metadata_to_proto};
use crate::metadata::layout::{io_error, remove_file_if_exists, write_atomic};
use crate::metadata::{FsLayout, MetadataError};
use prost::Message;
use std::fs;

/// Durable consensus state of one replica: term, committed config and split lineage.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusMetadata {
    pub tablet_id: TabletId,
    pub peer_uuid: String,
    pub current_term: u64,
    pub committed_config: RaftConfig,
    pub split_parent_tablet_id: Option<TabletId>,
}

impl ConsensusMetadata {
    /// Writes a fresh record. Fails if one already exists.
    pub fn create(
        layout: &FsLayout,
        tablet_id: &TabletId,
        peer_uuid: &str,
        committed_config: RaftConfig,
        current_term: u64,
    ) -> Result<Self, MetadataError> {
        let path = layout.consensus_metadata_path(tablet_id);
        if path.exists() {
            return Err(MetadataError::AlreadyExists(path));
        }

        let cmeta = ConsensusMetadata {
            tablet_id: tablet_id.clone(),
            peer_uuid: peer_uuid.to_string(),
            current_term,
            committed_config,
            split_parent_tablet_id: None,
        };
        cmeta.flush(layout)?;
        Ok(cmeta)
    }

    pub fn load(layout: &FsLayout, tablet_id: &TabletId) -> Result<Self, MetadataError> {
        let path = layout.consensus_metadata_path(tablet_id);
        let bytes = fs::read(&path).map_err(io_error(&path))?;
        let proto = ProtoConsensusMetadata::decode(&bytes[..]).map_err(|source| MetadataError::Decode {
            path: path.clone(),
            source,
        })?;
        consensus_metadata_from_proto(proto).map_err(|reason| MetadataError::Corrupt { path, reason })
    }

    pub fn exists(layout: &FsLayout, tablet_id: &TabletId) -> bool {
        layout.consensus_metadata_path(tablet_id).exists()
    }

    pub fn flush(&self, layout: &FsLayout) -> Result<(), MetadataError> {
        let path = layout.consensus_metadata_path(&self.tablet_id);
        let proto = consensus_metadata_to_proto(self);
        let mut buf = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut buf).map_err(|e| MetadataError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        write_atomic(&path, &buf)
    }

    /// Same term and config, owned by a split child.
    pub fn for_split_child(&self, child_id: &TabletId) -> Self {
        ConsensusMetadata {
            tablet_id: child_id.clone(),
            peer_uuid: self.peer_uuid.clone(),
            current_term: self.current_term,
            committed_config: self.committed_config.clone(),
            split_parent_tablet_id: Some(self.tablet_id.clone()),
        }
    }

    /// Missing records are fine.
    pub fn delete_on_disk_data(layout: &FsLayout, tablet_id: &TabletId) -> Result<(), MetadataError> {
        remove_file_if_exists(&layout.consensus_metadata_path(tablet_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FsOptions, MemberType, RaftPeer, INVALID_OPID_INDEX};

    fn config() -> RaftConfig {
        RaftConfig {
            opid_index: INVALID_OPID_INDEX,
            peers: vec![RaftPeer {
                permanent_uuid: "ts-1".into(),
                member_type: MemberType::Voter,
                host: "127.0.0.1".into(),
                port: 9100,
            }],
        }
    }

    #[test]
    fn create_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FsLayout::open_or_create(&FsOptions::single_root(dir.path())).unwrap();
        let tablet_id = TabletId::new("t1");

        let created = ConsensusMetadata::create(&layout, &tablet_id, "ts-1", config(), 0).unwrap();
        assert!(matches!(
            ConsensusMetadata::create(&layout, &tablet_id, "ts-1", config(), 0),
            Err(MetadataError::AlreadyExists(_))
        ));
        assert_eq!(ConsensusMetadata::load(&layout, &tablet_id).unwrap(), created);

        ConsensusMetadata::delete_on_disk_data(&layout, &tablet_id).unwrap();
        assert!(!ConsensusMetadata::exists(&layout, &tablet_id));
        ConsensusMetadata::delete_on_disk_data(&layout, &tablet_id).unwrap();
    }

    #[test]
    fn split_child_copies_config() {
        let parent = ConsensusMetadata {
            tablet_id: TabletId::new("p"),
            peer_uuid: "ts-1".into(),
            current_term: 4,
            committed_config: config(),
            split_parent_tablet_id: None,
        };

        let child = parent.for_split_child(&TabletId::new("c"));

        assert_eq!(child.current_term, 4);
        assert_eq!(child.committed_config, parent.committed_config);
        assert_eq!(child.split_parent_tablet_id, Some(TabletId::new("p")));
    }
}
