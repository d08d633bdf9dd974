//! Daily purge policy for the record store.
//!
//! # Retention Policy
//!
//! A record is kept only if the account was created on the same day and month
//! as the reference date. Everyone else is forgotten, including their wished
//! years: the store only needs to know about accounts whose cake day is today.
//! An account that shows up again later is re-created lazily on first sight.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::record::UserAnniversaryRecord;
use crate::types::Username;

/// Entry counts around a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub before: usize,
    pub after: usize,
}

impl PurgeReport {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

/// Returns true if the record survives a purge run on `reference`.
pub fn retained_on(record: &UserAnniversaryRecord, reference: NaiveDate) -> bool {
    record.creation_day_month() == (reference.day(), reference.month())
}

/// Removes every record whose creation (day, month) differs from `reference`.
pub fn purge_records(
    records: &mut BTreeMap<Username, UserAnniversaryRecord>,
    reference: NaiveDate,
) -> PurgeReport {
    let before = records.len();
    records.retain(|_, record| retained_on(record, reference));
    PurgeReport {
        before,
        after: records.len(),
    }
}
