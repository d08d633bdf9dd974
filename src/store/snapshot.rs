//! On-disk format of the record store.
//!
//! The snapshot is one JSON document, rewritten atomically (see
//! [`super::fsync::replace_durably`]) only when the change log is compacted.
//! `generation` names the change log that continues from it.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;
use super::fsync::replace_durably;
use super::record::UserAnniversaryRecord;
use crate::types::Username;

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// The persisted store document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecords {
    pub schema_version: u32,

    /// When this document was written.
    pub saved_at: DateTime<Utc>,

    /// Generation of the change log to replay on top of `records`.
    #[serde(default)]
    pub generation: u64,

    pub records: BTreeMap<Username, UserAnniversaryRecord>,
}

impl PersistedRecords {
    pub fn new(records: BTreeMap<Username, UserAnniversaryRecord>, generation: u64) -> Self {
        PersistedRecords {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            generation,
            records,
        }
    }
}

/// Writes the records to `path`, replacing any previous document.
pub fn save_records(
    path: &Path,
    records: &BTreeMap<Username, UserAnniversaryRecord>,
    generation: u64,
) -> Result<(), StoreError> {
    let doc = PersistedRecords::new(records.clone(), generation);
    let bytes = serde_json::to_vec_pretty(&doc)?;
    replace_durably(path, &bytes)?;
    Ok(())
}

/// Loads the snapshot at `path`, or `None` if none has been written yet.
pub fn try_load_records(path: &Path) -> Result<Option<PersistedRecords>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let doc: PersistedRecords = serde_json::from_slice(&bytes)?;
    if doc.schema_version != SCHEMA_VERSION {
        return Err(StoreError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: doc.schema_version,
        });
    }

    Ok(Some(doc))
}
