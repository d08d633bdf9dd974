//! Persistent per-user anniversary records.
//!
//! The store is shared by every community worker and by the purge job. All
//! access goes through one mutex, so a read-then-write sequence for a user can
//! never interleave with another writer. Every mutation is durable before the
//! call returns.
//!
//! A mutation appends one line to the current change log, so its cost does
//! not depend on how many users are tracked. The log is folded into a fresh
//! snapshot once it reaches [`COMPACT_AFTER`] changes, and by every purge.
//!
//! # File Layout
//!
//! ```text
//! <store_path>              # snapshot, see `snapshot::PersistedRecords`
//! <store_path>.<gen>.log    # changes since the snapshot, one JSON line each
//! <store_path>.tmp          # transient, only while a snapshot is written
//! ```
//!
//! # Compaction
//!
//! 1. Write the snapshot, naming generation `gen + 1`
//! 2. Start an empty `<store_path>.<gen + 1>.log`
//! 3. Delete `<store_path>.<gen>.log`
//!
//! A crash after step 1 is harmless: the snapshot already points past the old
//! log, and any leftover old log is deleted on the next open.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod fsync;
pub mod log;
pub mod purge;
pub mod record;
pub mod snapshot;

pub use log::RecordChange;
pub use purge::{PurgeReport, purge_records};
pub use record::UserAnniversaryRecord;
pub use snapshot::{PersistedRecords, SCHEMA_VERSION};

use self::log::{ChangeLog, log_path};
use crate::types::Username;

/// Changes kept in the log before it is folded into a snapshot.
pub const COMPACT_AFTER: usize = 1024;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error reading or writing the store files.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// A stored creation time disagrees with a freshly observed one.
    ///
    /// Account creation times never change, so this means either the store or
    /// the content source is returning corrupt data.
    #[error("creation time for {username} is {stored} in the store but {observed} upstream")]
    DataInconsistency {
        username: Username,
        stored: DateTime<Utc>,
        observed: DateTime<Utc>,
    },

    /// A wish was recorded for a user with no record.
    #[error("no record for {0}")]
    UnknownUser(Username),

    /// Another thread panicked while holding the store lock.
    #[error("record store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug)]
struct State {
    records: BTreeMap<Username, UserAnniversaryRecord>,
    generation: u64,
    log: ChangeLog,
}

/// Durable mapping from username to [`UserAnniversaryRecord`].
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    compact_after: usize,
    state: Mutex<State>,
}

impl RecordStore {
    /// Opens the store at `path`, creating an empty one if nothing is there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_compaction(path, COMPACT_AFTER)
    }

    /// Like [`open`](Self::open), compacting once the log holds
    /// `compact_after` changes.
    pub fn open_with_compaction(path: impl Into<PathBuf>, compact_after: usize) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let (mut records, generation) = match snapshot::try_load_records(&path)? {
            Some(doc) => (doc.records, doc.generation),
            None => (BTreeMap::new(), 0),
        };

        if let Some(previous) = generation.checked_sub(1) {
            remove_log(&log_path(&path, previous));
        }

        let current = log_path(&path, generation);
        let changes = log::replay(&current)?;
        let replayed = changes.len();
        for change in changes {
            change.apply(&mut records);
        }
        let log = ChangeLog::open(current, replayed)?;

        info!(
            path = %path.display(),
            entries = records.len(),
            generation,
            replayed,
            "Opened record store"
        );

        Ok(RecordStore {
            path,
            compact_after: compact_after.max(1),
            state: Mutex::new(State {
                records,
                generation,
                log,
            }),
        })
    }

    /// Returns the path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Logs `change` durably, then applies it in memory. A failed append
    /// leaves memory and disk agreeing.
    fn commit(&self, state: &mut State, change: RecordChange) -> Result<()> {
        state.log.append(&change)?;
        change.apply(&mut state.records);

        if state.log.entries() >= self.compact_after {
            let records = state.records.clone();
            // The change itself is already durable in the log.
            if let Err(e) = self.compact(state, records) {
                warn!(error = %e, "Change log compaction failed, will retry");
            }
        }
        Ok(())
    }

    /// Replaces the records with `records` through a new snapshot and an
    /// empty change log of the next generation.
    fn compact(
        &self,
        state: &mut State,
        records: BTreeMap<Username, UserAnniversaryRecord>,
    ) -> Result<()> {
        let next = state.generation + 1;
        snapshot::save_records(&self.path, &records, next)?;
        let log = ChangeLog::open(log_path(&self.path, next), 0)?;

        let old = std::mem::replace(&mut state.log, log);
        state.generation = next;
        state.records = records;
        remove_log(old.path());

        debug!(generation = next, entries = state.records.len(), "Compacted record store");
        Ok(())
    }

    /// Returns the record for `username`, if any.
    pub fn get(&self, username: &Username) -> Result<Option<UserAnniversaryRecord>> {
        Ok(self.lock()?.records.get(username).cloned())
    }

    /// Inserts or replaces a record.
    pub fn set(&self, record: UserAnniversaryRecord) -> Result<()> {
        let mut state = self.lock()?;
        self.commit(&mut state, RecordChange::Upsert { record })
    }

    /// Deletes the record for `username`. Returns true if one existed.
    pub fn delete(&self, username: &Username) -> Result<bool> {
        let mut state = self.lock()?;
        if !state.records.contains_key(username) {
            return Ok(false);
        }
        self.commit(
            &mut state,
            RecordChange::Remove {
                username: username.clone(),
            },
        )?;
        Ok(true)
    }

    /// Returns a copy of every record, ordered by username.
    pub fn records(&self) -> Result<Vec<UserAnniversaryRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    /// Number of records currently stored.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the existing record for `username`, or creates and persists a
    /// new one with no wished years.
    ///
    /// # Errors
    ///
    /// [`StoreError::DataInconsistency`] if a record exists and its creation
    /// time differs from `observed_created_at`.
    pub fn get_or_create(
        &self,
        username: &Username,
        observed_created_at: DateTime<Utc>,
    ) -> Result<UserAnniversaryRecord> {
        let mut state = self.lock()?;

        if let Some(existing) = state.records.get(username) {
            if existing.created_at != observed_created_at {
                return Err(StoreError::DataInconsistency {
                    username: username.clone(),
                    stored: existing.created_at,
                    observed: observed_created_at,
                });
            }
            return Ok(existing.clone());
        }

        let record = UserAnniversaryRecord::new(username.clone(), observed_created_at);
        debug!(user = %username, created_at = %observed_created_at, "Tracking new user");
        self.commit(
            &mut state,
            RecordChange::Upsert {
                record: record.clone(),
            },
        )?;
        Ok(record)
    }

    /// Records that a wish for `year` was posted to `username`.
    ///
    /// The caller must have called [`get_or_create`](Self::get_or_create) for
    /// this user first. Recording the same year twice is a no-op.
    pub fn record_wish(&self, username: &Username, year: i32) -> Result<()> {
        let mut state = self.lock()?;

        let mut record = match state.records.get(username) {
            None => return Err(StoreError::UnknownUser(username.clone())),
            Some(record) if record.has_wished(year) => return Ok(()),
            Some(record) => record.clone(),
        };
        record.years_wished.insert(year);

        self.commit(&mut state, RecordChange::Upsert { record })
    }

    /// Deletes every record whose creation (day, month) differs from
    /// `reference`'s, and compacts the change log.
    pub fn purge(&self, reference: NaiveDate) -> Result<PurgeReport> {
        let mut state = self.lock()?;
        info!(entries = state.records.len(), "Clearing out old entries");

        let mut records = state.records.clone();
        let report = purge_records(&mut records, reference);
        self.compact(&mut state, records)?;

        info!(
            entries = report.after,
            removed = report.removed(),
            "Entries remaining after purge"
        );
        Ok(report)
    }
}

/// Deletes a change log that a snapshot has superseded.
fn remove_log(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed superseded change log"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove old change log"),
    }
}
