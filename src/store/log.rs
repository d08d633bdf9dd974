//! Append-only change log for the record store.
//!
//! Each mutation is one JSON line carrying the full new state of a single
//! record (or its removal), so writing it costs the same regardless of how
//! many users are tracked. Changes are idempotent: replaying a line whose
//! effect is already in the snapshot leaves the records unchanged.
//!
//! A crash mid-append leaves a partial last line. Replay stops there and
//! truncates the file back to the last complete change.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StoreError;
use super::fsync::fsync_file;
use super::record::UserAnniversaryRecord;
use crate::types::Username;

/// One persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RecordChange {
    Upsert { record: UserAnniversaryRecord },
    Remove { username: Username },
}

impl RecordChange {
    pub fn apply(self, records: &mut BTreeMap<Username, UserAnniversaryRecord>) {
        match self {
            RecordChange::Upsert { record } => {
                records.insert(record.username.clone(), record);
            }
            RecordChange::Remove { username } => {
                records.remove(&username);
            }
        }
    }
}

/// Returns the change log of `generation` beside the snapshot at `path`.
pub fn log_path(path: &Path, generation: u64) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{generation}.log"));
    path.with_file_name(name)
}

/// Open handle on the change log.
#[derive(Debug)]
pub struct ChangeLog {
    file: File,
    path: PathBuf,
    entries: usize,
}

impl ChangeLog {
    /// Opens the log for appending, creating it if absent. `entries` is the
    /// number of complete changes already in the file (from [`replay`]).
    pub fn open(path: impl Into<PathBuf>, entries: usize) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(ChangeLog {
            file,
            path,
            entries,
        })
    }

    /// Writes `change` and fsyncs before returning.
    pub fn append(&mut self, change: &RecordChange) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(change)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        fsync_file(&self.file)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of changes in the file.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads every complete change in the log at `path`.
///
/// A line that does not parse is treated as a torn write: the file is
/// truncated at its start and nothing after it is read.
pub fn replay(path: &Path) -> Result<Vec<RecordChange>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let file_len = file.metadata()?.len();

    let mut reader = BufReader::new(file);
    let mut changes = Vec::new();
    let mut valid_len = 0u64;

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            match serde_json::from_str::<RecordChange>(trimmed) {
                Ok(change) if line.ends_with('\n') => changes.push(change),
                _ => break,
            }
        }
        valid_len += read as u64;
    }

    if valid_len < file_len {
        warn!(
            path = %path.display(),
            kept = valid_len,
            dropped = file_len - valid_len,
            "Truncating torn write at end of change log"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(valid_len)?;
        fsync_file(&file)?;
    }

    Ok(changes)
}
