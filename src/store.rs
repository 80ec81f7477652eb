//! History access for the prediction engine
//!
//! The engine reads three things per evaluation: the sleep window, the
//! check-in window and the profile. [`HistoryStore`] is that read surface;
//! [`InMemoryStore`] backs tests and embedding, [`crate::database::Database`]
//! backs the CLI.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::models::{CheckIn, SleepRecord, UserProfile};

pub trait HistoryStore {
    /// Up to `limit` sleep records dated on or before `as_of`, newest first
    fn fetch_sleep_history(&self, user: &str, as_of: NaiveDate, limit: usize)
        -> Result<Vec<SleepRecord>>;

    /// Up to `limit` check-ins dated on or before `as_of`, newest first
    fn fetch_checkins(&self, user: &str, as_of: NaiveDate, limit: usize) -> Result<Vec<CheckIn>>;

    fn fetch_profile(&self, user: &str) -> Result<Option<UserProfile>>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for &S {
    fn fetch_sleep_history(
        &self,
        user: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<SleepRecord>> {
        (**self).fetch_sleep_history(user, as_of, limit)
    }

    fn fetch_checkins(&self, user: &str, as_of: NaiveDate, limit: usize) -> Result<Vec<CheckIn>> {
        (**self).fetch_checkins(user, as_of, limit)
    }

    fn fetch_profile(&self, user: &str) -> Result<Option<UserProfile>> {
        (**self).fetch_profile(user)
    }
}

/// Per-user history keyed by date
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    sleep: HashMap<String, BTreeMap<NaiveDate, SleepRecord>>,
    checkins: HashMap<String, BTreeMap<NaiveDate, CheckIn>>,
    profiles: HashMap<String, UserProfile>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for its date
    pub fn upsert_sleep_record(&mut self, user: &str, record: SleepRecord) {
        self.sleep
            .entry(user.to_string())
            .or_default()
            .insert(record.date, record);
    }

    pub fn upsert_checkin(&mut self, user: &str, checkin: CheckIn) {
        self.checkins
            .entry(user.to_string())
            .or_default()
            .insert(checkin.date, checkin);
    }

    pub fn set_profile(&mut self, user: &str, profile: UserProfile) {
        self.profiles.insert(user.to_string(), profile);
    }

    pub fn with_sleep(mut self, user: &str, records: impl IntoIterator<Item = SleepRecord>) -> Self {
        for record in records {
            self.upsert_sleep_record(user, record);
        }
        self
    }

    pub fn with_checkins(mut self, user: &str, checkins: impl IntoIterator<Item = CheckIn>) -> Self {
        for checkin in checkins {
            self.upsert_checkin(user, checkin);
        }
        self
    }

    pub fn with_profile(mut self, user: &str, profile: UserProfile) -> Self {
        self.set_profile(user, profile);
        self
    }
}

fn newest_first<T: Clone>(
    by_date: Option<&BTreeMap<NaiveDate, T>>,
    as_of: NaiveDate,
    limit: usize,
) -> Vec<T> {
    by_date
        .map(|m| m.range(..=as_of).rev().take(limit).map(|(_, v)| v.clone()).collect())
        .unwrap_or_default()
}

impl HistoryStore for InMemoryStore {
    fn fetch_sleep_history(
        &self,
        user: &str,
        as_of: NaiveDate,
        limit: usize,
    ) -> Result<Vec<SleepRecord>> {
        Ok(newest_first(self.sleep.get(user), as_of, limit))
    }

    fn fetch_checkins(&self, user: &str, as_of: NaiveDate, limit: usize) -> Result<Vec<CheckIn>> {
        Ok(newest_first(self.checkins.get(user), as_of, limit))
    }

    fn fetch_profile(&self, user: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(user).cloned())
    }
}
