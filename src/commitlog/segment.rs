use crate::grpc::ProtoLogEntry;
use prost::Message;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SEGMENT_PREFIX: &str = "wal-";

// Layout of a segment file: a run of length-delimited ProtoLogEntry messages.
//
// Bytes:
// 0..k    : varint length of entry 1
// k..k+n  : entry 1
// ...     : entry 2, 3, ...
//
// A torn write can only ever truncate the tail of the newest segment.

pub(super) fn segment_file_name(seq: u64) -> String {
    format!("{}{:09}", SEGMENT_PREFIX, seq)
}

pub(super) fn parse_segment_seq(name: &str) -> Option<u64> {
    if !name.starts_with(SEGMENT_PREFIX) {
        return None;
    }
    name[SEGMENT_PREFIX.len()..].parse().ok()
}

/// Segments in `dir` ordered by sequence number. A missing dir has none.
pub(super) fn list_segments(dir: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(seq) = parse_segment_seq(&name) {
            segments.push((seq, entry.path()));
        }
    }
    segments.sort_by_key(|(seq, _)| *seq);
    Ok(segments)
}

pub(super) fn encode_entry(entry: &ProtoLogEntry) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(entry.encoded_len() + 10);
    entry
        .encode_length_delimited(&mut buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(buf)
}

/// Decodes a segment. `Ok((entries, true))` means the tail was torn.
pub(super) fn read_segment(path: &Path) -> io::Result<(Vec<ProtoLogEntry>, bool)> {
    let bytes = fs::read(path)?;
    let mut remaining = &bytes[..];
    let mut entries = Vec::new();
    while !remaining.is_empty() {
        match ProtoLogEntry::decode_length_delimited(&mut remaining) {
            Ok(entry) => entries.push(entry),
            Err(_) => return Ok((entries, true)),
        }
    }
    Ok((entries, false))
}
