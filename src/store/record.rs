//! The per-user anniversary record.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Username;

/// Persisted state for one account: when it was created and which years it
/// has already been wished a happy cake day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnniversaryRecord {
    pub username: Username,

    /// Account creation instant. Immutable once stored.
    pub created_at: DateTime<Utc>,

    /// Years in which a wish was successfully posted.
    #[serde(default)]
    pub years_wished: BTreeSet<i32>,
}

impl UserAnniversaryRecord {
    /// Creates a record with no wishes yet.
    pub fn new(username: Username, created_at: DateTime<Utc>) -> Self {
        UserAnniversaryRecord {
            username,
            created_at,
            years_wished: BTreeSet::new(),
        }
    }

    pub fn has_wished(&self, year: i32) -> bool {
        self.years_wished.contains(&year)
    }

    pub fn creation_year(&self) -> i32 {
        self.created_at.year()
    }

    /// `(day, month)` of account creation, the key the purge policy uses.
    pub fn creation_day_month(&self) -> (u32, u32) {
        (self.created_at.day(), self.created_at.month())
    }

    /// The calendar date of this account's anniversary in `year`.
    ///
    /// Returns `None` for accounts created on February 29th when `year` is not
    /// a leap year: there is no such date, so there is no cake day that year.
    pub fn anniversary_in(&self, year: i32) -> Option<NaiveDate> {
        self.created_at.date_naive().with_year(year)
    }

    /// Returns true if `today` is this account's cake day, in any year
    /// including the creation year.
    pub fn is_cakeday(&self, today: NaiveDate) -> bool {
        self.anniversary_in(today.year()) == Some(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(y: i32, m: u32, d: u32) -> UserAnniversaryRecord {
        UserAnniversaryRecord::new(
            Username::from("alice"),
            Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn anniversary_keeps_day_and_month() {
        let r = record(2015, 3, 14);
        assert_eq!(r.anniversary_in(2024), Some(date(2024, 3, 14)));
        assert!(r.is_cakeday(date(2024, 3, 14)));
        assert!(!r.is_cakeday(date(2024, 3, 15)));
    }

    #[test]
    fn leap_day_account_has_no_anniversary_in_common_year() {
        let r = record(2016, 2, 29);
        assert_eq!(r.anniversary_in(2023), None);
        assert!(!r.is_cakeday(date(2023, 2, 28)));
        assert!(!r.is_cakeday(date(2023, 3, 1)));
        assert!(r.is_cakeday(date(2024, 2, 29)));
    }

    #[test]
    fn wished_years_are_a_set() {
        let mut r = record(2015, 3, 14);
        r.years_wished.insert(2024);
        r.years_wished.insert(2024);
        assert_eq!(r.years_wished.len(), 1);
        assert!(r.has_wished(2024));
        assert!(!r.has_wished(2023));
    }

    #[test]
    fn missing_years_field_deserializes_empty() {
        let json = r#"{"username":"alice","created_at":"2015-03-14T10:00:00Z"}"#;
        let r: UserAnniversaryRecord = serde_json::from_str(json).unwrap();
        assert!(r.years_wished.is_empty());
        assert_eq!(r.creation_day_month(), (14, 3));
    }
}
