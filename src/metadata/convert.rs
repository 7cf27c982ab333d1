use crate::api::{KeyBounds, MemberType, OpId, Partition, RaftConfig, RaftPeer, TableId, TabletId};
use crate::grpc::{
    ProtoConsensusMetadata, ProtoKeyBounds, ProtoOpId, ProtoPartition, ProtoRaftConfig, ProtoRaftPeer,
    ProtoSuperBlock,
};
use crate::metadata::{ConsensusMetadata, DataState, Superblock};
use std::path::PathBuf;

pub(crate) fn op_id_to_proto(op_id: OpId) -> ProtoOpId {
    ProtoOpId {
        term: op_id.term,
        index: op_id.index,
    }
}

pub(crate) fn op_id_from_proto(proto: Option<ProtoOpId>) -> Option<OpId> {
    proto.map(|p| OpId::new(p.term, p.index))
}

pub(crate) fn partition_to_proto(partition: &Partition) -> ProtoPartition {
    ProtoPartition {
        partition_key_start: partition.partition_key_start.clone(),
        partition_key_end: partition.partition_key_end.clone(),
    }
}

pub(crate) fn partition_from_proto(proto: Option<ProtoPartition>) -> Partition {
    proto
        .map(|p| Partition {
            partition_key_start: p.partition_key_start,
            partition_key_end: p.partition_key_end,
        })
        .unwrap_or_default()
}

fn key_bounds_to_proto(bounds: &KeyBounds) -> ProtoKeyBounds {
    ProtoKeyBounds {
        lower: bounds.lower.clone(),
        upper: bounds.upper.clone(),
    }
}

fn key_bounds_from_proto(proto: Option<ProtoKeyBounds>) -> KeyBounds {
    proto
        .map(|p| KeyBounds {
            lower: p.lower,
            upper: p.upper,
        })
        .unwrap_or_default()
}

fn member_type_to_proto(member_type: MemberType) -> i32 {
    match member_type {
        MemberType::Voter => 1,
        MemberType::Observer => 2,
        MemberType::PreVoter => 3,
        MemberType::PreObserver => 4,
    }
}

fn member_type_from_proto(value: i32) -> Result<MemberType, String> {
    match value {
        1 => Ok(MemberType::Voter),
        2 => Ok(MemberType::Observer),
        3 => Ok(MemberType::PreVoter),
        4 => Ok(MemberType::PreObserver),
        other => Err(format!("unknown member type {}", other)),
    }
}

pub(crate) fn raft_config_to_proto(config: &RaftConfig) -> ProtoRaftConfig {
    ProtoRaftConfig {
        opid_index: config.opid_index,
        peers: config
            .peers
            .iter()
            .map(|peer| ProtoRaftPeer {
                permanent_uuid: peer.permanent_uuid.clone(),
                member_type: member_type_to_proto(peer.member_type),
                host: peer.host.clone(),
                port: u32::from(peer.port),
            })
            .collect(),
    }
}

pub(crate) fn raft_config_from_proto(proto: ProtoRaftConfig) -> Result<RaftConfig, String> {
    let mut peers = Vec::with_capacity(proto.peers.len());
    for peer in proto.peers {
        if peer.port > u32::from(u16::MAX) {
            return Err(format!("peer {} has invalid port {}", peer.permanent_uuid, peer.port));
        }
        peers.push(RaftPeer {
            member_type: member_type_from_proto(peer.member_type)?,
            permanent_uuid: peer.permanent_uuid,
            host: peer.host,
            port: peer.port as u16,
        });
    }

    Ok(RaftConfig {
        opid_index: proto.opid_index,
        peers,
    })
}

fn optional_id(id: String) -> Option<TabletId> {
    if id.is_empty() {
        None
    } else {
        Some(TabletId::new(id))
    }
}

pub(crate) fn superblock_to_proto(superblock: &Superblock) -> ProtoSuperBlock {
    ProtoSuperBlock {
        tablet_id: superblock.tablet_id.as_str().to_string(),
        table_id: superblock.table_id.as_str().to_string(),
        table_name: superblock.table_name.clone(),
        partition: Some(partition_to_proto(&superblock.partition)),
        key_bounds: Some(key_bounds_to_proto(&superblock.key_bounds)),
        data_state: superblock.data_state.to_proto(),
        data_root_dir: superblock.data_root_dir.to_string_lossy().into_owned(),
        wal_root_dir: superblock.wal_root_dir.to_string_lossy().into_owned(),
        hidden: superblock.hidden,
        split_parent_tablet_id: superblock
            .split_parent_tablet_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default(),
        split_child_tablet_ids: superblock
            .split_child_tablet_ids
            .iter()
            .map(|id| id.as_str().to_string())
            .collect(),
        split_op_id: superblock.split_op_id.map(op_id_to_proto),
        tombstone_last_logged_op_id: superblock.tombstone_last_logged_op_id.map(op_id_to_proto),
        post_split_compaction_pending: superblock.post_split_compaction_pending,
    }
}

pub(crate) fn superblock_from_proto(proto: ProtoSuperBlock) -> Result<Superblock, String> {
    let data_state = DataState::from_proto(proto.data_state)
        .ok_or_else(|| format!("unknown data state {}", proto.data_state))?;
    if proto.tablet_id.is_empty() {
        return Err("missing tablet id".into());
    }

    Ok(Superblock {
        tablet_id: TabletId::new(proto.tablet_id),
        table_id: TableId::new(proto.table_id),
        table_name: proto.table_name,
        partition: partition_from_proto(proto.partition),
        key_bounds: key_bounds_from_proto(proto.key_bounds),
        data_state,
        data_root_dir: PathBuf::from(proto.data_root_dir),
        wal_root_dir: PathBuf::from(proto.wal_root_dir),
        hidden: proto.hidden,
        split_parent_tablet_id: optional_id(proto.split_parent_tablet_id),
        split_child_tablet_ids: proto.split_child_tablet_ids.into_iter().map(TabletId::new).collect(),
        split_op_id: op_id_from_proto(proto.split_op_id),
        tombstone_last_logged_op_id: op_id_from_proto(proto.tombstone_last_logged_op_id),
        post_split_compaction_pending: proto.post_split_compaction_pending,
    })
}

pub(crate) fn consensus_metadata_to_proto(cmeta: &ConsensusMetadata) -> ProtoConsensusMetadata {
    ProtoConsensusMetadata {
        tablet_id: cmeta.tablet_id.as_str().to_string(),
        peer_uuid: cmeta.peer_uuid.clone(),
        current_term: cmeta.current_term,
        committed_config: Some(raft_config_to_proto(&cmeta.committed_config)),
        split_parent_tablet_id: cmeta
            .split_parent_tablet_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default(),
    }
}

pub(crate) fn consensus_metadata_from_proto(proto: ProtoConsensusMetadata) -> Result<ConsensusMetadata, String> {
    let committed_config = proto
        .committed_config
        .ok_or_else(|| "missing committed config".to_string())
        .and_then(raft_config_from_proto)?;

    Ok(ConsensusMetadata {
        tablet_id: TabletId::new(proto.tablet_id),
        peer_uuid: proto.peer_uuid,
        current_term: proto.current_term,
        committed_config,
        split_parent_tablet_id: optional_id(proto.split_parent_tablet_id),
    })
}
