//! Reading and writing the persisted filelist.
//!
//! One record per entry:
//!
//! ```text
//! <mode> SP <dev> SP <ino> SP <path_len> SP <path> DELIM
//! ```
//!
//! where every integer field is base-10 ASCII, `path_len` counts the raw
//! path bytes, and `DELIM` is a newline, or NUL when NUL-delimited I/O is
//! active. Lists written by older tooling use `<mode> SP <path>`; both
//! forms are accepted on read, decided per record. Entries that carry live
//! device and inode numbers are written in the extended form; entries
//! reconstructed from legacy records have neither and keep the legacy form,
//! so whatever this codec emits it can parse back.
//!
//! A record that fails the grammar is skipped with a warning carrying its
//! 1-based index; corruption never aborts a run and never poisons the
//! records around it.

use crate::entry::Entry;
use crate::snapshot::Snapshot;
use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Shortest parseable record: a one-digit mode, a separator, a one-byte path.
const MIN_RECORD: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record shorter than {MIN_RECORD} bytes")]
    TooShort,
    #[error("missing field separator")]
    MissingSeparator,
    #[error("mode is not a positive integer")]
    BadMode,
    #[error("zero device or inode number")]
    BadDevIno,
    #[error("stated path length {stated} does not match {actual} path bytes")]
    PathLenMismatch { stated: usize, actual: usize },
    #[error("empty path")]
    EmptyPath,
}

pub struct ReadOutcome {
    pub snapshot: Snapshot,
    /// Records skipped as corrupt.
    pub skipped: usize,
    /// True when the abort flag stopped the read early.
    pub interrupted: bool,
}

/// Parse a filelist into a snapshot. Duplicate paths replace earlier
/// records in arrival order. The abort flag is polled at record boundaries.
pub fn read_snapshot(
    mut reader: impl BufRead,
    delimiter: u8,
    abort: &AtomicBool,
) -> io::Result<ReadOutcome> {
    let mut snapshot = Snapshot::new();
    let mut skipped = 0usize;
    let mut record = Vec::new();
    let mut index = 0usize;

    loop {
        if abort.load(Ordering::Relaxed) {
            return Ok(ReadOutcome {
                snapshot,
                skipped,
                interrupted: true,
            });
        }

        record.clear();
        if reader.read_until(delimiter, &mut record)? == 0 {
            break;
        }
        index += 1;
        if record.last() == Some(&delimiter) {
            record.pop();
        }

        match parse_record(&record) {
            Ok(entry) => {
                snapshot.insert(entry);
            }
            Err(reason) => {
                skipped += 1;
                warn!("corrupt filelist record {index}: {reason}");
            }
        }
    }

    Ok(ReadOutcome {
        snapshot,
        skipped,
        interrupted: false,
    })
}

/// Write every entry in traversal order. Entries with live device and
/// inode numbers use the extended grammar; legacy-origin entries have
/// neither, and an extended record with a zero device or inode would be
/// rejected on the next read, so they keep the legacy grammar.
pub fn write_snapshot(
    mut writer: impl Write,
    snapshot: &Snapshot,
    delimiter: u8,
) -> io::Result<()> {
    for entry in snapshot.iter() {
        let path = entry.path_bytes();
        if entry.dev == 0 || entry.ino == 0 {
            write!(writer, "{} ", entry.mode)?;
        } else {
            write!(
                writer,
                "{} {} {} {} ",
                entry.mode,
                entry.dev,
                entry.ino,
                path.len()
            )?;
        }
        writer.write_all(path)?;
        writer.write_all(&[delimiter])?;
    }
    writer.flush()
}

fn parse_record(record: &[u8]) -> Result<Entry, RecordError> {
    if record.len() < MIN_RECORD {
        return Err(RecordError::TooShort);
    }
    let (mode_field, rest) = split_field(record).ok_or(RecordError::MissingSeparator)?;
    let mode = parse_int(mode_field)
        .filter(|&m| m != 0)
        .ok_or(RecordError::BadMode)? as u32;

    // Extended records carry three more integer fields before the path. A
    // record whose next three fields are all digits is committed to the
    // extended grammar: a stated length disagreeing with the trailing byte
    // count is then corruption, not a legacy path that looks numeric.
    if let Some((dev, ino, stated, path)) = split_extended(rest) {
        if stated != path.len() {
            return Err(RecordError::PathLenMismatch {
                stated,
                actual: path.len(),
            });
        }
        if dev == 0 || ino == 0 {
            return Err(RecordError::BadDevIno);
        }
        if path.is_empty() {
            return Err(RecordError::EmptyPath);
        }
        return Ok(Entry::from_record(bytes_to_path(path), mode, dev, ino));
    }

    if rest.is_empty() {
        return Err(RecordError::EmptyPath);
    }
    Ok(Entry::from_record(bytes_to_path(rest), mode, 0, 0))
}

fn split_extended(rest: &[u8]) -> Option<(u64, u64, usize, &[u8])> {
    let (dev_field, rest) = split_field(rest)?;
    let (ino_field, rest) = split_field(rest)?;
    let (len_field, path) = split_field(rest)?;
    let dev = parse_int(dev_field)?;
    let ino = parse_int(ino_field)?;
    let stated = parse_int(len_field)? as usize;
    Some((dev, ino, stated, path))
}

fn split_field(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let sp = bytes.iter().position(|&b| b == b' ')?;
    Some((&bytes[..sp], &bytes[sp + 1..]))
}

fn parse_int(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(OsStr::from_bytes(bytes))
}
