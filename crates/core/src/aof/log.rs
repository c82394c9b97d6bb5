// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only journal engine
//!
//! Owns the journal file handle. Appends are write-through: the record is
//! flushed and fsync'd before the call returns, so a success means the
//! record survives process termination. Appends serialize behind a mutex;
//! there is at most one writer at a time.

use super::record::{ops, HashField, Header, Record};
use crate::value::{DataType, Value};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the journal engine
#[derive(Debug, Error)]
pub enum AofError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record at line {line}: {reason}")]
    Parse { line: u64, reason: String },
}

/// Consistent view of the key space, used while rewriting the journal.
///
/// The implementor must keep the view stable for the duration of the
/// callback. The store does so by holding its read lock, which also keeps
/// records from landing mid-rewrite: mutations journal while holding the
/// exclusive lock.
pub trait SnapshotSource {
    fn with_state(
        &self,
        f: &mut dyn FnMut(&HashMap<String, Value>) -> Result<(), AofError>,
    ) -> Result<(), AofError>;
}

/// Journals holding fewer records than this make a snapshot a no-op.
pub const DEFAULT_SNAPSHOT_THRESHOLD: usize = 100;

/// Append-only journal with write-through durability
pub struct Aof {
    path: PathBuf,
    snapshot_threshold: usize,
    writer: Mutex<BufWriter<File>>,
    /// Serializes whole snapshot operations; never taken by appends
    snapshot_gate: Mutex<()>,
}

impl Aof {
    /// Open or create a journal at `path` with the default snapshot
    /// threshold.
    pub fn open(path: &Path) -> Result<Self, AofError> {
        Self::open_with_threshold(path, DEFAULT_SNAPSHOT_THRESHOLD)
    }

    /// Open or create a journal at `path`.
    ///
    /// A brand-new journal gets the header record immediately, so the file
    /// always begins with one.
    pub fn open_with_threshold(
        path: &Path,
        snapshot_threshold: usize,
    ) -> Result<Self, AofError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if fresh {
            write_line(&mut writer, &Header::new().to_line()?)?;
            sync(&mut writer)?;
        }

        info!(path = %path.display(), "journal opened");
        Ok(Self {
            path: path.to_path_buf(),
            snapshot_threshold,
            writer: Mutex::new(writer),
            snapshot_gate: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record durably.
    ///
    /// The record is written, the user-space buffer flushed, and an
    /// OS-level sync requested before this returns. On error the caller
    /// must not treat the record as persisted.
    pub fn append(&self, record: &Record) -> Result<(), AofError> {
        let line = record.to_line()?;
        let mut writer = self.lock_writer();

        debug!(op = %record.op, key = %record.key, "appending record");
        write_line(&mut writer, &line)?;
        sync(&mut writer)?;
        Ok(())
    }

    /// Read every record in the journal at `path`, in file order.
    ///
    /// An absent file is not an error and yields no records. The first
    /// non-empty line is consumed if it parses as a header record. A
    /// malformed line aborts the read with its 1-based line number.
    pub fn read(path: &Path) -> Result<Vec<Record>, AofError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no journal found, starting fresh");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut line_number: u64 = 0;
        let mut first = true;

        for line in reader.lines() {
            let line = line?;
            line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if first {
                first = false;
                if let Some(header) = Header::detect(trimmed) {
                    debug!(version = %header.version, "journal header detected");
                    continue;
                }
            }

            let record = Record::from_line(trimmed).map_err(|e| AofError::Parse {
                line: line_number,
                reason: e.to_string(),
            })?;
            records.push(record);
        }

        info!(path = %path.display(), records = records.len(), "journal read");
        Ok(records)
    }

    /// Flush and sync the journal. The handle itself closes on drop.
    pub fn close(&self) -> Result<(), AofError> {
        let mut writer = self.lock_writer();
        sync(&mut writer)?;
        Ok(())
    }

    /// Rewrite the journal so that replaying it reproduces the source's
    /// current state.
    ///
    /// A journal holding fewer than the snapshot threshold of records is
    /// left untouched. The rewrite goes to a sibling `<path>.tmp` file
    /// which is fsync'd and renamed into place; on failure the temp file
    /// is removed and the original journal is left intact.
    pub fn snapshot(&self, source: &dyn SnapshotSource) -> Result<(), AofError> {
        let _gate = self
            .snapshot_gate
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        info!("building journal snapshot");

        let count = count_records(&self.path, self.snapshot_threshold)?;
        if count < self.snapshot_threshold {
            info!(
                records = count,
                threshold = self.snapshot_threshold,
                "skipping snapshot, journal below threshold"
            );
            return Ok(());
        }

        let temp_path = temp_sibling(&self.path);
        let mut key_count = 0;

        // The source's lock is taken before the writer lock, matching the
        // order of the mutation path (state lock, then journal append).
        let result = source.with_state(&mut |state| {
            key_count = state.len();
            write_snapshot(&temp_path, state)?;

            let mut writer = self.lock_writer();
            sync(&mut writer)?;
            replace_journal(&self.path, &temp_path)?;

            // Reopen in append mode; the old handle closes when the new
            // writer is swapped in.
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *writer = BufWriter::new(file);
            Ok(())
        });

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        info!(keys = key_count, "journal snapshot completed");
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn write_line(writer: &mut BufWriter<File>, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")
}

fn sync(writer: &mut BufWriter<File>) -> std::io::Result<()> {
    writer.flush()?;
    writer.get_ref().sync_all()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Count operation records (header excluded), stopping once `limit` is
/// exceeded.
fn count_records(path: &Path, limit: usize) -> Result<usize, AofError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut count = 0;
    let mut first = true;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if first {
            first = false;
            if Header::detect(trimmed).is_some() {
                continue;
            }
        }
        count += 1;
        if count > limit {
            break;
        }
    }

    Ok(count)
}

/// Write header plus per-element creation records for every key to `path`,
/// flushed and fsync'd.
fn write_snapshot(path: &Path, state: &HashMap<String, Value>) -> Result<(), AofError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_line(&mut writer, &Header::new().to_line()?)?;

    for (key, value) in state {
        for record in creation_records(key, value)? {
            write_line(&mut writer, &record.to_line()?)?;
        }
    }

    sync(&mut writer)?;
    Ok(())
}

/// The minimal record sequence that recreates `value` at `key` when
/// replayed in order.
fn creation_records(key: &str, value: &Value) -> Result<Vec<Record>, AofError> {
    let records = match value {
        Value::String(s) => vec![Record::new(ops::SET, key, DataType::String.as_str(), s)],
        Value::Set(members) => members
            .iter()
            .map(|m| Record::new(ops::SADD, key, DataType::Set.as_str(), m))
            .collect(),
        Value::List(items) => items
            .iter()
            .map(|v| Record::new(ops::RPUSH, key, DataType::List.as_str(), v))
            .collect(),
        Value::Queue(items) => items
            .iter()
            .map(|v| Record::new(ops::ENQUEUE, key, DataType::Queue.as_str(), v))
            .collect(),
        Value::Stack(items) => items
            .iter()
            .map(|v| Record::new(ops::PUSH, key, DataType::Stack.as_str(), v))
            .collect(),
        Value::Hashmap(fields) => {
            let mut records = Vec::with_capacity(fields.len());
            for (field, v) in fields {
                let payload = HashField::new(field, v).to_payload()?;
                records.push(Record::new(
                    ops::HSET,
                    key,
                    DataType::Hashmap.as_str(),
                    &payload,
                ));
            }
            records
        }
    };
    Ok(records)
}

/// Remove the original journal if present and rename the temp file into
/// place. The rename is atomic within the filesystem.
fn replace_journal(path: &Path, temp: &Path) -> Result<(), AofError> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::rename(temp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod snapshot_tests;
