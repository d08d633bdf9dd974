//! The nightly record store purge.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Job, JobError};
use crate::store::RecordStore;

/// Purges the record store against the current UTC date.
#[derive(Debug, Clone)]
pub struct PurgeJob {
    store: Arc<RecordStore>,
}

impl PurgeJob {
    pub fn new(store: Arc<RecordStore>) -> Self {
        PurgeJob { store }
    }
}

impl Job for PurgeJob {
    fn name(&self) -> &str {
        "purge"
    }

    fn run(&self, now: DateTime<Utc>) -> Result<(), JobError> {
        self.store.purge(now.date_naive())?;
        Ok(())
    }
}
