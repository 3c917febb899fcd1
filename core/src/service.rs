use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{
    Clock, current_day, days_until_sunday, is_sunday, next_sunday, previous_sunday,
};
use crate::error::ProgressError;
use crate::models::{ProgressRecord, ProgressStatus, validate_day};
use crate::store::{ProgressStore, decode_record, encode_record};

/// How [`ProgressTracker::set_manual_day`] anchors the rewritten start date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManualDayAnchor {
    /// `today - (day - 1)`: today reads back as exactly the requested day.
    /// The start date may then fall on any weekday.
    #[default]
    Exact,
    /// The Sunday on or before `today - (day - 1)`, keeping day 1 on a
    /// Sunday. Today may then read back up to six days past the request.
    PreviousSunday,
}

/// The progress state machine over a single stored record.
///
/// Every operation is a synchronous read-modify-write of the whole record.
/// Two trackers writing the same store race, and the last write wins.
pub struct ProgressTracker<S> {
    store: S,
    clock: Clock,
    anchor: ManualDayAnchor,
}

impl<S: ProgressStore> ProgressTracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Clock::System,
            anchor: ManualDayAnchor::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_manual_day_anchor(mut self, anchor: ManualDayAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Reads ---

    /// Current record with `current_day` and `last_access_date` refreshed.
    ///
    /// The refreshed copy is written back. Missing, unreadable or corrupted
    /// state reads as `None`.
    pub fn read(&self) -> Option<ProgressRecord> {
        let record = self.refresh(self.load()?);
        if let Err(e) = self.persist(&record) {
            tracing::warn!(error = %e, "failed to persist refreshed progress");
        }
        Some(record)
    }

    pub fn has_started(&self) -> bool {
        self.load().is_some()
    }

    pub fn is_favorite(&self, day: u32) -> bool {
        self.read().is_some_and(|r| r.is_favorite(day))
    }

    /// Favorite days, ascending.
    pub fn favorites(&self) -> Vec<u32> {
        self.read()
            .map(|r| r.sorted_favorites())
            .unwrap_or_default()
    }

    pub fn status(&self) -> ProgressStatus {
        let today = self.clock.today();
        let progress = self.read();
        ProgressStatus {
            today,
            is_sunday: is_sunday(today),
            days_until_sunday: days_until_sunday(today),
            started: progress.is_some(),
            week: progress.as_ref().map(ProgressRecord::current_week),
            completed: progress.as_ref().is_some_and(ProgressRecord::is_completed),
            progress,
        }
    }

    // --- Mutations ---

    /// Begin the program on `date`, or today when `None`.
    ///
    /// The start date must be a Sunday either way. Replaces any existing
    /// record.
    pub fn start(&self, date: Option<NaiveDate>) -> Result<ProgressRecord, ProgressError> {
        let start_date = date.unwrap_or_else(|| self.clock.today());
        if !is_sunday(start_date) {
            return Err(ProgressError::InvalidStartDay(start_date));
        }

        let record = self.fresh_record(start_date);
        self.persist(&record)?;
        tracing::info!(start_date = %start_date, "program started");
        Ok(record)
    }

    /// Rewrite the start date so that today is program day `day`.
    pub fn set_manual_day(&self, day: i64) -> Result<ProgressRecord, ProgressError> {
        let day = validate_day(day)?;
        let mut record = self.require()?;

        let day_one = self.clock.today() - Duration::days(i64::from(day - 1));
        record.start_date = match self.anchor {
            ManualDayAnchor::Exact => day_one,
            ManualDayAnchor::PreviousSunday => previous_sunday(day_one),
        };
        let record = self.refresh(record);
        self.persist(&record)?;
        tracing::debug!(day, start_date = %record.start_date, "manual day set");
        Ok(record)
    }

    /// Move day 1 to `date`, which must be a Sunday.
    pub fn set_start_date(&self, date: NaiveDate) -> Result<ProgressRecord, ProgressError> {
        if !is_sunday(date) {
            return Err(ProgressError::NotSunday(date));
        }
        let mut record = self.require()?;

        record.start_date = date;
        let record = self.refresh(record);
        self.persist(&record)?;
        tracing::debug!(start_date = %date, "start date changed");
        Ok(record)
    }

    /// Add `day` to the favorites, or remove it if already there.
    pub fn toggle_favorite(&self, day: i64) -> Result<ProgressRecord, ProgressError> {
        let day = validate_day(day)?;
        let mut record = self.require()?;

        if let Some(pos) = record.favorites.iter().position(|&d| d == day) {
            record.favorites.remove(pos);
        } else {
            record.favorites.push(day);
        }
        self.persist(&record)?;
        Ok(record)
    }

    /// Delete the record. Succeeds whether or not one existed.
    pub fn reset(&self) -> Result<(), ProgressError> {
        let removed = self.store.remove()?;
        tracing::info!(removed, "progress reset");
        Ok(())
    }

    /// Start over on the next Sunday strictly after today, with no favorites.
    pub fn restart(&self) -> Result<ProgressRecord, ProgressError> {
        let start_date = next_sunday(self.clock.today());
        let record = self.fresh_record(start_date);
        self.persist(&record)?;
        tracing::info!(start_date = %start_date, "program restarted");
        Ok(record)
    }

    // --- Helpers ---

    fn load(&self) -> Option<ProgressRecord> {
        let payload = match self.store.load() {
            Ok(payload) => payload?,
            Err(e) => {
                let error = format!("{e:#}");
                tracing::warn!(error = %error, "progress storage unreadable");
                return None;
            }
        };
        match decode_record(&payload) {
            Ok(record) => Some(record),
            Err(e) => {
                let error = format!("{e:#}");
                tracing::warn!(error = %error, "discarding corrupted progress record");
                None
            }
        }
    }

    fn require(&self) -> Result<ProgressRecord, ProgressError> {
        self.read().ok_or(ProgressError::NotStarted)
    }

    fn refresh(&self, mut record: ProgressRecord) -> ProgressRecord {
        let now = self.clock.now();
        record.current_day = current_day(record.start_date, now.date());
        record.last_access_date = now;
        record
    }

    fn fresh_record(&self, start_date: NaiveDate) -> ProgressRecord {
        let now = self.clock.now();
        ProgressRecord {
            start_date,
            current_day: current_day(start_date, now.date()),
            last_access_date: now,
            favorites: Vec::new(),
        }
    }

    fn persist(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let payload = encode_record(record)?;
        self.store.save(&payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::store::MemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Wednesday 2024-03-13.
    fn wednesday() -> NaiveDate {
        d(2024, 3, 13)
    }

    fn tracker_on(today: NaiveDate) -> ProgressTracker<MemoryStore> {
        ProgressTracker::new(MemoryStore::new()).with_clock(Clock::fixed_date(today))
    }

    fn started_on_sunday() -> ProgressTracker<MemoryStore> {
        let tracker = tracker_on(wednesday());
        tracker.start(Some(d(2024, 3, 10))).unwrap();
        tracker
    }

    #[test]
    fn test_read_without_record_is_none() {
        let tracker = tracker_on(wednesday());
        assert!(tracker.read().is_none());
        assert!(!tracker.has_started());
        assert!(tracker.favorites().is_empty());
        assert!(tracker.store().payload().is_none());
    }

    #[test]
    fn test_start_without_date_requires_sunday() {
        let tracker = tracker_on(wednesday());
        let err = tracker.start(None).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidStartDay(date) if date == wednesday()));
        assert!(tracker.store().payload().is_none());

        let sunday = tracker_on(d(2024, 3, 10));
        let record = sunday.start(None).unwrap();
        assert_eq!(record.start_date, d(2024, 3, 10));
        assert_eq!(record.current_day, 1);
        assert!(record.favorites.is_empty());
    }

    #[test]
    fn test_start_with_non_sunday_date_rejected() {
        let tracker = tracker_on(wednesday());
        let err = tracker.start(Some(d(2024, 3, 11))).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidStartDay(_)));
        assert!(!tracker.has_started());
    }

    #[test]
    fn test_scenario_start_then_manual_day() {
        let tracker = tracker_on(wednesday());
        assert!(matches!(
            tracker.start(None),
            Err(ProgressError::InvalidStartDay(_))
        ));

        tracker.start(Some(d(2024, 3, 10))).unwrap();
        assert_eq!(tracker.read().unwrap().current_day, 4);

        let record = tracker.set_manual_day(10).unwrap();
        assert_eq!(record.current_day, 10);
        assert_eq!(record.start_date, d(2024, 3, 4));
        assert!(!is_sunday(record.start_date));
        assert_eq!(tracker.read().unwrap().current_day, 10);
    }

    #[test]
    fn test_manual_day_previous_sunday_anchor() {
        let tracker = started_on_sunday().with_manual_day_anchor(ManualDayAnchor::PreviousSunday);
        let record = tracker.set_manual_day(10).unwrap();
        // 2024-03-13 minus 9 days is Monday 2024-03-04, rolled back to Sunday 2024-03-03.
        assert_eq!(record.start_date, d(2024, 3, 3));
        assert!(is_sunday(record.start_date));
        assert_eq!(tracker.read().unwrap().current_day, 11);
    }

    #[test]
    fn test_manual_day_reads_back_for_every_day() {
        for offset in 0..7 {
            let today = wednesday() + Duration::days(offset);
            let mut tracker = started_on_sunday();
            tracker.set_clock(Clock::fixed_date(today));
            for day in 1..=63 {
                tracker.set_manual_day(day).unwrap();
                assert_eq!(i64::from(tracker.read().unwrap().current_day), day);
            }
        }
    }

    #[test]
    fn test_manual_day_requires_record() {
        let tracker = tracker_on(wednesday());
        assert!(matches!(
            tracker.set_manual_day(5),
            Err(ProgressError::NotStarted)
        ));
        assert!(tracker.store().payload().is_none());
    }

    #[test]
    fn test_out_of_range_days_do_not_mutate() {
        let tracker = started_on_sunday();
        tracker.toggle_favorite(7).unwrap();
        let before = tracker.store().payload();

        for day in [0, 64, -1] {
            assert!(matches!(
                tracker.set_manual_day(day),
                Err(ProgressError::OutOfRange(got)) if got == day
            ));
            assert!(matches!(
                tracker.toggle_favorite(day),
                Err(ProgressError::OutOfRange(_))
            ));
        }
        assert_eq!(tracker.store().payload(), before);
    }

    #[test]
    fn test_out_of_range_checked_before_started() {
        let tracker = tracker_on(wednesday());
        assert!(matches!(
            tracker.toggle_favorite(64),
            Err(ProgressError::OutOfRange(64))
        ));
    }

    #[test]
    fn test_set_start_date() {
        let tracker = started_on_sunday();
        let record = tracker.set_start_date(d(2024, 2, 25)).unwrap();
        assert_eq!(record.start_date, d(2024, 2, 25));
        assert_eq!(record.current_day, 18);
        assert_eq!(tracker.read().unwrap().current_day, 18);
    }

    #[test]
    fn test_set_start_date_rejects_non_sunday_without_mutation() {
        let tracker = started_on_sunday();
        let before = tracker.store().payload();
        let err = tracker.set_start_date(d(2024, 2, 26)).unwrap_err();
        assert!(matches!(err, ProgressError::NotSunday(date) if date == d(2024, 2, 26)));
        assert_eq!(tracker.store().payload(), before);
    }

    #[test]
    fn test_set_start_date_requires_record() {
        let tracker = tracker_on(wednesday());
        assert!(matches!(
            tracker.set_start_date(d(2024, 3, 10)),
            Err(ProgressError::NotStarted)
        ));
    }

    #[test]
    fn test_favorites_toggle_scenario() {
        let tracker = started_on_sunday();
        tracker.toggle_favorite(5).unwrap();
        tracker.toggle_favorite(12).unwrap();
        assert_eq!(tracker.favorites(), vec![5, 12]);
        assert!(tracker.is_favorite(5));

        tracker.toggle_favorite(5).unwrap();
        assert_eq!(tracker.favorites(), vec![12]);
        assert!(!tracker.is_favorite(5));
    }

    #[test]
    fn test_favorites_sorted_but_stored_in_insertion_order() {
        let tracker = started_on_sunday();
        for day in [40, 3, 22] {
            tracker.toggle_favorite(day).unwrap();
        }
        assert_eq!(tracker.read().unwrap().favorites, vec![40, 3, 22]);
        assert_eq!(tracker.favorites(), vec![3, 22, 40]);
    }

    #[test]
    fn test_toggle_favorite_twice_is_identity() {
        let tracker = started_on_sunday();
        tracker.toggle_favorite(30).unwrap();
        let original = tracker.read().unwrap().favorites;
        tracker.toggle_favorite(9).unwrap();
        tracker.toggle_favorite(9).unwrap();
        assert_eq!(tracker.read().unwrap().favorites, original);
    }

    #[test]
    fn test_toggle_requires_record() {
        let tracker = tracker_on(wednesday());
        assert!(matches!(
            tracker.toggle_favorite(5),
            Err(ProgressError::NotStarted)
        ));
    }

    #[test]
    fn test_read_is_idempotent_within_a_day() {
        let mut tracker = started_on_sunday();
        let first = tracker.read().unwrap();
        tracker.set_clock(Clock::Fixed(wednesday().and_hms_opt(23, 59, 0).unwrap()));
        let second = tracker.read().unwrap();
        assert_eq!(first.current_day, second.current_day);
        assert_ne!(first.last_access_date, second.last_access_date);
    }

    #[test]
    fn test_read_advances_with_time_and_persists() {
        let mut tracker = started_on_sunday();
        let mut clock = tracker.clock();
        clock.advance(Duration::days(3));
        tracker.set_clock(clock);

        let record = tracker.read().unwrap();
        assert_eq!(record.current_day, 7);

        let stored: serde_json::Value =
            serde_json::from_str(&tracker.store().payload().unwrap()).unwrap();
        assert_eq!(stored["currentDay"], 7);
        assert_eq!(stored["lastAccessDate"], "2024-03-16T00:00:00.000");
    }

    #[test]
    fn test_stored_current_day_is_not_trusted() {
        let payload = r#"{"version":1,"startDate":"2024-03-10T00:00:00","currentDay":50,"lastAccessDate":"2024-03-10T00:00:00","favorites":[]}"#;
        let tracker = ProgressTracker::new(MemoryStore::with_payload(payload))
            .with_clock(Clock::fixed_date(wednesday()));
        assert_eq!(tracker.read().unwrap().current_day, 4);
    }

    #[test]
    fn test_corrupted_record_reads_as_absent() {
        for payload in [
            "{not json",
            "[]",
            r#"{"version":9,"startDate":"2024-03-10","lastAccessDate":"2024-03-10"}"#,
        ] {
            let tracker = ProgressTracker::new(MemoryStore::with_payload(payload))
                .with_clock(Clock::fixed_date(wednesday()));
            assert!(tracker.read().is_none());
            assert!(!tracker.has_started());
            assert!(matches!(
                tracker.toggle_favorite(1),
                Err(ProgressError::NotStarted)
            ));
            // A corrupted record can be replaced by starting over.
            tracker.start(Some(d(2024, 3, 10))).unwrap();
            assert_eq!(tracker.read().unwrap().current_day, 4);
        }
    }

    #[test]
    fn test_reset_deletes_record() {
        let tracker = started_on_sunday();
        tracker.reset().unwrap();
        assert!(tracker.read().is_none());
        assert!(tracker.store().payload().is_none());
        // Resetting again is fine.
        tracker.reset().unwrap();
    }

    #[test]
    fn test_restart_from_completed_program() {
        let tracker = tracker_on(d(2024, 5, 22));
        tracker.start(Some(d(2024, 3, 10))).unwrap();
        tracker.toggle_favorite(5).unwrap();
        tracker.toggle_favorite(60).unwrap();
        let before = tracker.read().unwrap();
        assert_eq!(before.current_day, 74);
        assert!(before.is_completed());

        let record = tracker.restart().unwrap();
        assert_eq!(record.start_date, d(2024, 5, 26));
        assert!(record.start_date > d(2024, 5, 22));
        assert!(is_sunday(record.start_date));

        let after = tracker.read().unwrap();
        assert_eq!(after.current_day, 1);
        assert!(after.favorites.is_empty());
    }

    #[test]
    fn test_restart_on_sunday_skips_a_week() {
        let tracker = tracker_on(d(2024, 3, 10));
        let record = tracker.restart().unwrap();
        assert_eq!(record.start_date, d(2024, 3, 17));
    }

    #[test]
    fn test_restart_without_record() {
        let tracker = tracker_on(wednesday());
        let record = tracker.restart().unwrap();
        assert_eq!(record.start_date, d(2024, 3, 17));
        assert!(tracker.has_started());
    }

    #[test]
    fn test_status_snapshot() {
        let tracker = tracker_on(wednesday());
        let status = tracker.status();
        assert!(!status.started);
        assert!(!status.is_sunday);
        assert_eq!(status.days_until_sunday, 4);
        assert!(status.progress.is_none());
        assert!(!status.completed);

        tracker.start(Some(d(2024, 3, 3))).unwrap();
        let status = tracker.status();
        assert!(status.started);
        assert_eq!(status.week, Some(2));
        assert_eq!(status.progress.unwrap().current_day, 11);
    }

    #[test]
    fn test_tracker_over_database() {
        let db = Database::open_in_memory().unwrap();
        let tracker = ProgressTracker::new(&db).with_clock(Clock::fixed_date(wednesday()));
        tracker.start(Some(d(2024, 3, 10))).unwrap();
        tracker.toggle_favorite(12).unwrap();

        let reopened = ProgressTracker::new(&db).with_clock(Clock::fixed_date(wednesday()));
        let record = reopened.read().unwrap();
        assert_eq!(record.current_day, 4);
        assert_eq!(record.favorites, vec![12]);

        reopened.reset().unwrap();
        assert!(!tracker.has_started());
    }

    /// Serves a fixed payload (or fails to read) and rejects every write.
    struct FailingStore {
        payload: Option<String>,
        fail_load: bool,
    }

    impl ProgressStore for FailingStore {
        fn load(&self) -> anyhow::Result<Option<String>> {
            if self.fail_load {
                anyhow::bail!("database is locked");
            }
            Ok(self.payload.clone())
        }

        fn save(&self, _payload: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk I/O error")
        }

        fn remove(&self) -> anyhow::Result<bool> {
            anyhow::bail!("disk I/O error")
        }
    }

    fn failing_tracker(
        payload: Option<String>,
        fail_load: bool,
    ) -> ProgressTracker<FailingStore> {
        ProgressTracker::new(FailingStore { payload, fail_load })
            .with_clock(Clock::fixed_date(wednesday()))
    }

    fn started_payload() -> String {
        let tracker = started_on_sunday();
        tracker.store().payload().unwrap()
    }

    #[test]
    fn test_unreadable_store_reads_as_absent() {
        let tracker = failing_tracker(Some(started_payload()), true);
        assert!(tracker.read().is_none());
        assert!(!tracker.has_started());
        assert!(!tracker.status().started);
        assert!(tracker.favorites().is_empty());
    }

    #[test]
    fn test_read_survives_failed_write_back() {
        let tracker = failing_tracker(Some(started_payload()), false);
        let record = tracker.read().unwrap();
        assert_eq!(record.current_day, 4);
        assert_eq!(record.start_date, d(2024, 3, 10));
        assert_eq!(tracker.status().week, Some(1));
    }

    #[test]
    fn test_failed_writes_surface_as_storage_errors() {
        let tracker = failing_tracker(Some(started_payload()), false);
        assert!(matches!(
            tracker.toggle_favorite(3),
            Err(ProgressError::Storage(_))
        ));
        assert!(matches!(
            tracker.set_manual_day(10),
            Err(ProgressError::Storage(_))
        ));
        assert!(matches!(tracker.reset(), Err(ProgressError::Storage(_))));
        assert!(matches!(tracker.restart(), Err(ProgressError::Storage(_))));

        let sunday = ProgressTracker::new(FailingStore {
            payload: None,
            fail_load: false,
        })
        .with_clock(Clock::fixed_date(d(2024, 3, 10)));
        assert!(matches!(sunday.start(None), Err(ProgressError::Storage(_))));
    }

    #[test]
    fn test_validation_runs_before_storage() {
        let tracker = failing_tracker(Some(started_payload()), false);
        assert!(matches!(
            tracker.toggle_favorite(64),
            Err(ProgressError::OutOfRange(64))
        ));
        assert!(matches!(
            tracker.set_start_date(wednesday()),
            Err(ProgressError::NotSunday(_))
        ));
    }
}
