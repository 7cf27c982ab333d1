use crate::metadata::CHECKPOINTS_DIR;
use bytes::Bytes;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A file shipped from a remote bootstrap source, relative to its data or WAL dir.
#[derive(Clone, Debug, PartialEq)]
pub struct TabletFile {
    pub is_wal: bool,
    pub relative_path: PathBuf,
    pub data: Bytes,
}

/// Reads every file under `data_dir` and `wal_dir`. Checkpoint scratch space is skipped.
pub fn collect_tablet_files(data_dir: &Path, wal_dir: &Path) -> io::Result<Vec<TabletFile>> {
    let mut files = Vec::new();
    collect_dir(data_dir, Path::new(""), false, &mut files)?;
    collect_dir(wal_dir, Path::new(""), true, &mut files)?;
    Ok(files)
}

fn collect_dir(dir: &Path, relative: &Path, is_wal: bool, out: &mut Vec<TabletFile>) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let mut entries = entries.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        if entry.file_name() == CHECKPOINTS_DIR {
            continue;
        }
        let relative_path = relative.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            collect_dir(&entry.path(), &relative_path, is_wal, out)?;
        } else {
            out.push(TabletFile {
                is_wal,
                relative_path,
                data: Bytes::from(fs::read(entry.path())?),
            });
        }
    }
    Ok(())
}

/// Writes `files` under `data_dir` / `wal_dir`, creating both. Paths escaping their dir are rejected.
pub fn install_tablet_files(files: &[TabletFile], data_dir: &Path, wal_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(data_dir)?;
    fs::create_dir_all(wal_dir)?;

    for file in files {
        let escapes = file
            .relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || file.relative_path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("refusing to install file at {:?}", file.relative_path),
            ));
        }

        let root = if file.is_wal { wal_dir } else { data_dir };
        let target = root.join(&file.relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.data)?;
        fs::File::open(&target)?.sync_all()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_files_install_elsewhere() {
        // -- setup --
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let (data, wal) = (src.path().join("data"), src.path().join("wal"));
        fs::create_dir_all(data.join("sst").join(CHECKPOINTS_DIR)).unwrap();
        fs::create_dir_all(&wal).unwrap();
        fs::write(data.join("sst").join("000001.sst"), b"rows").unwrap();
        fs::write(data.join("sst").join(CHECKPOINTS_DIR).join("scratch"), b"x").unwrap();
        fs::write(wal.join("wal-000000001"), b"entries").unwrap();

        // -- execute --
        let files = collect_tablet_files(&data, &wal).unwrap();
        install_tablet_files(&files, &dest.path().join("data"), &dest.path().join("wal")).unwrap();

        // -- verify --
        assert_eq!(files.len(), 2);
        assert_eq!(
            fs::read(dest.path().join("data").join("sst").join("000001.sst")).unwrap(),
            b"rows"
        );
        assert_eq!(fs::read(dest.path().join("wal").join("wal-000000001")).unwrap(), b"entries");
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let dest = tempfile::tempdir().unwrap();
        let files = vec![TabletFile {
            is_wal: false,
            relative_path: PathBuf::from("../outside"),
            data: Bytes::from_static(b"x"),
        }];

        let result = install_tablet_files(&files, &dest.path().join("data"), &dest.path().join("wal"));

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert!(!dest.path().join("outside").exists());
    }

    #[test]
    fn missing_dirs_collect_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = collect_tablet_files(&dir.path().join("nope"), &dir.path().join("nada")).unwrap();
        assert!(files.is_empty());
    }
}
