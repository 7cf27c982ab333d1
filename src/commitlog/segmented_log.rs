use crate::api::OpId;
use crate::commitlog::segment::{encode_entry, list_segments, read_segment, segment_file_name};
use crate::grpc::ProtoLogEntry;
use bytes::Bytes;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_ENTRIES_PER_SEGMENT: usize = 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub op_id: OpId,
    pub data: Bytes,
}

/// Append-only log split into `wal-NNNNNNNNN` segment files. Indexes start at 1.
pub struct SegmentedLog {
    logger: slog::Logger,
    dir: PathBuf,
    active: File,
    active_seq: u64,
    entries_in_active: usize,
    max_entries_per_segment: usize,
    last_op_id: OpId,
}

impl SegmentedLog {
    /// Opens (creating if needed) the log in `dir` and replays it to find the last entry.
    pub fn open(logger: slog::Logger, dir: &Path) -> io::Result<Self> {
        Self::open_with_segment_size(logger, dir, DEFAULT_ENTRIES_PER_SEGMENT)
    }

    pub fn open_with_segment_size(logger: slog::Logger, dir: &Path, max_entries_per_segment: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let segments = list_segments(dir)?;
        let mut last_op_id = OpId::default();
        let mut entries_in_last = 0;
        for (position, (_, path)) in segments.iter().enumerate() {
            let (entries, torn) = read_segment(path)?;
            let is_last = position + 1 == segments.len();
            if torn && !is_last {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrupt log segment {:?}", path),
                ));
            }
            if torn {
                slog::warn!(logger, "Discarding torn tail of log segment {:?}", path);
                rewrite_segment(path, &entries)?;
            }
            if let Some(last) = entries.last() {
                last_op_id = OpId::new(last.term, last.index);
            }
            entries_in_last = entries.len();
        }

        let active_seq = segments.last().map(|(seq, _)| *seq).unwrap_or(1);
        let active = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(segment_file_name(active_seq)))?;

        Ok(SegmentedLog {
            logger,
            dir: dir.to_path_buf(),
            active,
            active_seq,
            entries_in_active: entries_in_last,
            max_entries_per_segment: max_entries_per_segment.max(1),
            last_op_id,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn last_op_id(&self) -> OpId {
        self.last_op_id
    }

    /// Appends an entry at the next index. Durable only after `flush`.
    pub fn append(&mut self, term: u64, data: Bytes) -> io::Result<OpId> {
        if term < self.last_op_id.term {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("term {} is behind last logged {:?}", term, self.last_op_id),
            ));
        }
        if self.entries_in_active >= self.max_entries_per_segment {
            self.roll_segment()?;
        }

        let op_id = OpId::new(term, self.last_op_id.index + 1);
        let buf = encode_entry(&ProtoLogEntry {
            term: op_id.term,
            index: op_id.index,
            data: data.to_vec(),
        })?;
        self.active.write_all(&buf)?;
        self.entries_in_active += 1;
        self.last_op_id = op_id;
        Ok(op_id)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.active.flush()?;
        self.active.sync_data()
    }

    /// Every entry in the log, in order.
    pub fn read_all(&self) -> io::Result<Vec<LogEntry>> {
        read_all(&self.dir)
    }

    fn roll_segment(&mut self) -> io::Result<()> {
        self.flush()?;
        let next_seq = self.active_seq + 1;
        self.active = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(segment_file_name(next_seq)))?;
        self.active_seq = next_seq;
        self.entries_in_active = 0;
        slog::debug!(self.logger, "Rolled log to segment {}", next_seq);
        Ok(())
    }
}

fn rewrite_segment(path: &Path, entries: &[ProtoLogEntry]) -> io::Result<()> {
    let mut buf = Vec::new();
    for entry in entries {
        buf.extend_from_slice(&encode_entry(entry)?);
    }
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(&buf)?;
    file.sync_all()
}

pub fn read_all(dir: &Path) -> io::Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (_, path) in list_segments(dir)? {
        let (segment_entries, _) = read_segment(&path)?;
        entries.extend(segment_entries.into_iter().map(|entry| LogEntry {
            op_id: OpId::new(entry.term, entry.index),
            data: Bytes::from(entry.data),
        }));
    }
    Ok(entries)
}

/// Whether `dir` holds any log segment.
pub fn has_on_disk_data(dir: &Path) -> io::Result<bool> {
    Ok(!list_segments(dir)?.is_empty())
}

/// Removes the log directory. A missing directory is not an error.
pub fn delete_on_disk_data(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    }
    if let Some(parent) = dir.parent() {
        // Table directory goes away with its last tablet.
        let _ = fs::remove_dir(parent);
    }
    Ok(())
}

/// Copies every segment of the log in `src` into `dest`, replacing whatever `dest` held.
pub fn copy_to(src: &Path, dest: &Path) -> io::Result<()> {
    delete_on_disk_data(dest)?;
    fs::create_dir_all(dest)?;
    for (seq, path) in list_segments(src)? {
        let target = dest.join(segment_file_name(seq));
        fs::copy(&path, &target)?;
        File::open(&target)?.sync_all()?;
    }
    File::open(dest)?.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn append_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let wal_dir = dir.path().join("wal");

        let mut log = SegmentedLog::open_with_segment_size(logger(), &wal_dir, 2).unwrap();
        for i in 0..5u8 {
            log.append(1, Bytes::from(vec![i])).unwrap();
        }
        log.flush().unwrap();
        assert_eq!(log.last_op_id(), OpId::new(1, 5));
        drop(log);

        assert_eq!(list_segments(&wal_dir).unwrap().len(), 3);
        let mut reopened = SegmentedLog::open_with_segment_size(logger(), &wal_dir, 2).unwrap();
        assert_eq!(reopened.last_op_id(), OpId::new(1, 5));
        assert_eq!(reopened.append(2, Bytes::from_static(b"x")).unwrap(), OpId::new(2, 6));

        let entries = reopened.read_all().unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].data, Bytes::from(vec![0u8]));
    }

    #[test]
    fn rejects_term_regression() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SegmentedLog::open(logger(), dir.path()).unwrap();

        log.append(3, Bytes::new()).unwrap();
        assert!(log.append(2, Bytes::new()).is_err());
    }

    #[test]
    fn copy_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("table").join("dest");

        let mut log = SegmentedLog::open(logger(), &src).unwrap();
        log.append(1, Bytes::from_static(b"a")).unwrap();
        log.append(1, Bytes::from_static(b"b")).unwrap();
        log.flush().unwrap();

        copy_to(&src, &dest).unwrap();
        assert!(has_on_disk_data(&dest).unwrap());
        assert_eq!(read_all(&dest).unwrap(), log.read_all().unwrap());

        delete_on_disk_data(&dest).unwrap();
        assert!(!dest.exists());
        assert!(!has_on_disk_data(&dest).unwrap());
        delete_on_disk_data(&dest).unwrap();
    }
}
