use crate::api::{FsOptions, TableId, TabletId};
use rand::Rng;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const INSTANCE_FILE: &str = "instance";
const TABLET_META_DIR: &str = "tablet-meta";
const CONSENSUS_META_DIR: &str = "consensus-meta";
const DATA_DIR: &str = "data";
const WAL_DIR: &str = "wals";
const TMP_SUFFIX: &str = ".tmp";
pub(crate) const CHECKPOINTS_DIR: &str = ".checkpoints";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O failure on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to decode {path:?}: {source}")]
    Decode { path: PathBuf, source: prost::DecodeError },
    #[error("{0:?} already exists")]
    AlreadyExists(PathBuf),
    #[error("Corrupt record {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Invalid metadata state: {0}")]
    InvalidState(String),
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(io::Error) -> MetadataError + '_ {
    move |source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Directory structure of one tablet server.
///
/// ```text
/// <fs_root>/instance
/// <fs_root>/tablet-meta/<tablet>
/// <fs_root>/consensus-meta/<tablet>
/// <data_root>/data/table-<table>/tablet-<tablet>/
/// <wal_root>/wals/table-<table>/tablet-<tablet>/
/// ```
#[derive(Debug)]
pub struct FsLayout {
    fs_root: PathBuf,
    data_roots: Vec<PathBuf>,
    wal_roots: Vec<PathBuf>,
    uuid: String,
}

impl FsLayout {
    /// Creates missing directories and loads (or mints) the server's permanent uuid.
    pub fn open_or_create(options: &FsOptions) -> Result<Self, MetadataError> {
        let fs_root = options.fs_root.clone();
        for dir in [TABLET_META_DIR, CONSENSUS_META_DIR].iter() {
            let path = fs_root.join(dir);
            fs::create_dir_all(&path).map_err(io_error(&path))?;
        }
        for root in options.data_roots.iter() {
            let path = root.join(DATA_DIR);
            fs::create_dir_all(&path).map_err(io_error(&path))?;
        }
        for root in options.wal_roots.iter() {
            let path = root.join(WAL_DIR);
            fs::create_dir_all(&path).map_err(io_error(&path))?;
        }

        let instance_path = fs_root.join(INSTANCE_FILE);
        let uuid = match fs::read_to_string(&instance_path) {
            Ok(contents) => contents.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let uuid = generate_uuid();
                write_atomic(&instance_path, uuid.as_bytes())?;
                uuid
            }
            Err(e) => return Err(io_error(&instance_path)(e)),
        };
        if uuid.is_empty() {
            return Err(MetadataError::Corrupt {
                path: instance_path,
                reason: "empty server uuid".into(),
            });
        }

        Ok(FsLayout {
            fs_root,
            data_roots: options.data_roots.clone(),
            wal_roots: options.wal_roots.clone(),
            uuid,
        })
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn fs_root(&self) -> &Path {
        &self.fs_root
    }

    pub fn data_roots(&self) -> &[PathBuf] {
        &self.data_roots
    }

    pub fn wal_roots(&self) -> &[PathBuf] {
        &self.wal_roots
    }

    pub fn superblock_path(&self, tablet_id: &TabletId) -> PathBuf {
        self.fs_root.join(TABLET_META_DIR).join(tablet_id.as_str())
    }

    pub fn consensus_metadata_path(&self, tablet_id: &TabletId) -> PathBuf {
        self.fs_root.join(CONSENSUS_META_DIR).join(tablet_id.as_str())
    }

    pub fn tablet_data_dir(data_root: &Path, table_id: &TableId, tablet_id: &TabletId) -> PathBuf {
        data_root
            .join(DATA_DIR)
            .join(format!("table-{}", table_id))
            .join(format!("tablet-{}", tablet_id))
    }

    pub fn tablet_wal_dir(wal_root: &Path, table_id: &TableId, tablet_id: &TabletId) -> PathBuf {
        wal_root
            .join(WAL_DIR)
            .join(format!("table-{}", table_id))
            .join(format!("tablet-{}", tablet_id))
    }

    /// Ids of every tablet with a superblock on disk, sorted.
    pub fn list_tablet_ids(&self) -> Result<Vec<TabletId>, MetadataError> {
        let dir = self.fs_root.join(TABLET_META_DIR);
        let mut tablet_ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_error(&dir))? {
            let entry = entry.map_err(io_error(&dir))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            tablet_ids.push(TabletId::new(name));
        }
        tablet_ids.sort();
        Ok(tablet_ids)
    }

    /// Removes leftover `.checkpoints` scratch directories under every data root.
    pub fn remove_stale_checkpoints(&self) -> Result<usize, MetadataError> {
        let mut removed = 0;
        for root in self.data_roots.iter() {
            let data_dir = root.join(DATA_DIR);
            for table_dir in list_dirs(&data_dir)? {
                for tablet_dir in list_dirs(&table_dir)? {
                    if remove_dir_if_exists(&tablet_dir.join(CHECKPOINTS_DIR))? {
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}

fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, MetadataError> {
    let mut dirs = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(dirs),
        Err(e) => return Err(io_error(dir)(e)),
    };
    for entry in entries {
        let entry = entry.map_err(io_error(dir))?;
        if entry.file_type().map_err(io_error(dir))?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn generate_uuid() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Write-temp, fsync, rename. Readers see either the old or the new contents.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), MetadataError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!("{}{}", file_name, TMP_SUFFIX));

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(io_error(&tmp_path))?;
    file.write_all(contents).map_err(io_error(&tmp_path))?;
    file.sync_all().map_err(io_error(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(io_error(path))?;

    if let Some(parent) = path.parent() {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(io_error(parent))?;
    }
    Ok(())
}

/// Returns whether anything was removed.
pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<bool, MetadataError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(path)(e)),
    }
}

pub(crate) fn remove_file_if_exists(path: &Path) -> Result<bool, MetadataError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(path)(e)),
    }
}

/// Drops the parent directory too once it is empty. Best effort.
pub(crate) fn remove_empty_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::remove_dir(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_stable_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let options = FsOptions::single_root(dir.path());

        let first = FsLayout::open_or_create(&options).unwrap();
        let second = FsLayout::open_or_create(&options).unwrap();

        assert_eq!(first.uuid().len(), 32);
        assert_eq!(first.uuid(), second.uuid());
    }

    #[test]
    fn list_skips_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FsLayout::open_or_create(&FsOptions::single_root(dir.path())).unwrap();

        write_atomic(&layout.superblock_path(&TabletId::new("b")), b"x").unwrap();
        write_atomic(&layout.superblock_path(&TabletId::new("a")), b"x").unwrap();
        fs::write(dir.path().join(TABLET_META_DIR).join("c.tmp"), b"partial").unwrap();

        assert_eq!(
            layout.list_tablet_ids().unwrap(),
            vec![TabletId::new("a"), TabletId::new("b")]
        );
    }

    #[test]
    fn stale_checkpoints_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FsLayout::open_or_create(&FsOptions::single_root(dir.path())).unwrap();
        let tablet_dir = FsLayout::tablet_data_dir(dir.path(), &TableId::new("t"), &TabletId::new("x"));
        fs::create_dir_all(tablet_dir.join(CHECKPOINTS_DIR).join("snap")).unwrap();

        assert_eq!(layout.remove_stale_checkpoints().unwrap(), 1);
        assert!(tablet_dir.exists());
        assert!(!tablet_dir.join(CHECKPOINTS_DIR).exists());
    }
}
