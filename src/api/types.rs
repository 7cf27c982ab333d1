use std::fmt;

/// Opaque identifier of a tablet replica. Children of a split get fresh ids.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TabletId(String);

impl TabletId {
    pub fn new(id: impl Into<String>) -> Self {
        TabletId(id.into())
    }

    /// An id from outside the process. It names files on disk, so it must be one plain path component.
    pub fn parse(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        check_path_component("tablet", &id)?;
        Ok(TabletId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for TabletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TabletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabletId {
    fn from(id: &str) -> Self {
        TabletId::new(id)
    }
}

#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        TableId(id.into())
    }

    /// Same rules as [`TabletId::parse`].
    pub fn parse(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        check_path_component("table", &id)?;
        Ok(TableId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(id: &str) -> Self {
        TableId::new(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub table_id: TableId,
    pub table_name: String,
}

/// Position of an entry in a replica's log. `OpId::default()` (0.0) means "nothing logged yet".
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId {
    pub term: u64,
    pub index: u64,
}

impl OpId {
    pub fn new(term: u64, index: u64) -> Self {
        OpId { term, index }
    }

    pub fn is_valid(&self) -> bool {
        self.index > 0
    }
}

impl fmt::Debug for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.term, self.index)
    }
}

/// Hash-partition range owned by a tablet. Empty bounds are unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub partition_key_start: Vec<u8>,
    pub partition_key_end: Vec<u8>,
}

/// Range of encoded document keys a post-split child is allowed to hold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyBounds {
    pub lower: Vec<u8>,
    pub upper: Vec<u8>,
}

impl KeyBounds {
    pub fn contains(&self, key: &[u8]) -> bool {
        (self.lower.is_empty() || key >= &self.lower[..]) && (self.upper.is_empty() || key < &self.upper[..])
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberType {
    Voter,
    Observer,
    PreVoter,
    PreObserver,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaftPeer {
    pub permanent_uuid: String,
    pub member_type: MemberType,
    pub host: String,
    pub port: u16,
}

/// Opid index of a config that never went through the log.
pub const INVALID_OPID_INDEX: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RaftConfig {
    pub opid_index: i64,
    pub peers: Vec<RaftPeer>,
}

impl RaftConfig {
    pub fn peer(&self, uuid: &str) -> Option<&RaftPeer> {
        self.peers.iter().find(|peer| peer.permanent_uuid == uuid)
    }

    pub fn is_member(&self, uuid: &str) -> bool {
        self.peer(uuid).is_some()
    }

    pub fn num_voters(&self) -> usize {
        self.peers
            .iter()
            .filter(|peer| peer.member_type == MemberType::Voter)
            .count()
    }
}

/// Address of the peer a remote bootstrap copies from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapSource {
    pub peer_uuid: String,
    pub private_addr: String,
    pub broadcast_addr: String,
}

impl BootstrapSource {
    /// Address to dial; the broadcast address wins when both are known.
    pub fn dial_addr(&self) -> &str {
        if self.broadcast_addr.is_empty() {
            &self.private_addr
        } else {
            &self.broadcast_addr
        }
    }
}

fn check_path_component(kind: &str, id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("Empty {} id", kind));
    }
    if id.contains('/') || id.contains('\\') || id.contains("..") || id.contains('\0') {
        return Err(format!("Invalid {} id {:?}", kind, id));
    }
    Ok(())
}
