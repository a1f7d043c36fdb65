//! Synthetic attendance backfill: given a date range, a daily time window,
//! a class duration and a target count, place that many non-conflicting
//! sessions on randomly chosen free dates.

pub mod sampling;
pub mod store;
pub mod timeparse;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use sampling::RandomSource;
use store::AttendanceStore;

/// Raw admin-form fields, exactly as submitted. Everything is text so each
/// field can fail with its own message instead of a generic decode error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BackfillForm {
    #[schema(example = "2024-01-01")]
    pub start_date: String,
    #[schema(example = "2024-01-05")]
    pub end_date: String,
    #[schema(example = "09:00")]
    pub window_start: String,
    #[schema(example = "5:45 PM")]
    pub window_end: String,
    /// How many classes to create.
    #[schema(example = "3")]
    pub classes: String,
    /// Length of one class, in hours.
    #[schema(example = "1.5")]
    pub duration_hours: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BackfillOutcome {
    #[schema(example = 3)]
    pub created: u32,
    #[schema(example = 0)]
    pub skipped: u32,
}

/// Everything here is a user-input failure except `Store`; each variant's
/// message is surfaced verbatim to the submitter.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("Person not found")]
    PersonNotFound,
    #[error("Start date must be a valid date no later than the end date")]
    InvalidRange,
    #[error("Number of classes must be a positive whole number")]
    InvalidCount,
    #[error("Class duration must be a positive number of hours")]
    InvalidDuration,
    #[error("Could not understand time '{0}'; use HH:MM or H:MMam/pm")]
    InvalidTimeFormat(String),
    #[error("Window start must be earlier than window end")]
    InvalidWindow,
    #[error("Class duration does not fit inside the daily window")]
    WindowTooSmall,
    #[error("No free dates in window")]
    NoCapacity,
    #[error("storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl BackfillError {
    pub fn is_user_error(&self) -> bool {
        !matches!(self, BackfillError::Store(_))
    }
}

/// Form after validation, in the units the algorithm works in.
struct CheckedRequest {
    start: NaiveDate,
    end: NaiveDate,
    window_start_min: u32,
    window_end_min: u32,
    duration_min: u32,
    target: u32,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Fail-fast validation in a fixed order, so resubmitting the same bad form
/// always reports the same first failing constraint.
fn validate(form: &BackfillForm) -> Result<CheckedRequest, BackfillError> {
    let start = parse_date(&form.start_date).ok_or(BackfillError::InvalidRange)?;
    let end = parse_date(&form.end_date).ok_or(BackfillError::InvalidRange)?;
    if start > end {
        return Err(BackfillError::InvalidRange);
    }

    let target: u32 = form
        .classes
        .trim()
        .parse()
        .ok()
        .filter(|&n| n > 0)
        .ok_or(BackfillError::InvalidCount)?;

    // Hours text rounded to the nearest minute. Kept wide until the fit
    // check so an oversized duration cannot truncate past it.
    let duration_min: i64 = form
        .duration_hours
        .trim()
        .parse::<f64>()
        .ok()
        .map(|hours| (hours * 60.0).round() as i64)
        .filter(|&m| m > 0)
        .ok_or(BackfillError::InvalidDuration)?;

    let window_start = timeparse::parse_time_of_day(&form.window_start)
        .ok_or_else(|| BackfillError::InvalidTimeFormat(form.window_start.clone()))?;
    let window_end = timeparse::parse_time_of_day(&form.window_end)
        .ok_or_else(|| BackfillError::InvalidTimeFormat(form.window_end.clone()))?;

    let window_start_min = timeparse::minutes_of_day(window_start);
    let window_end_min = timeparse::minutes_of_day(window_end);
    if window_start_min >= window_end_min {
        return Err(BackfillError::InvalidWindow);
    }
    if duration_min > i64::from(window_end_min - window_start_min) {
        return Err(BackfillError::WindowTooSmall);
    }

    Ok(CheckedRequest {
        start,
        end,
        window_start_min,
        window_end_min,
        duration_min: duration_min as u32,
        target,
    })
}

/// Runs the whole backfill for one person. Validation precedes any write;
/// once inserts begin, each one is independent and partial success is the
/// designed outcome (reported through `skipped`, never as an error).
pub async fn generate<S: AttendanceStore, R: RandomSource>(
    store: &S,
    rng: &mut R,
    person_id: u64,
    form: &BackfillForm,
) -> Result<BackfillOutcome, BackfillError> {
    if !store.person_exists(person_id).await? {
        return Err(BackfillError::PersonNotFound);
    }
    let req = validate(form)?;

    let candidates: Vec<NaiveDate> = req
        .start
        .iter_days()
        .take_while(|d| *d <= req.end)
        .collect();

    let taken = store.taken_dates(person_id, req.start, req.end).await?;
    let available: Vec<NaiveDate> = candidates
        .into_iter()
        .filter(|d| !taken.contains(d))
        .collect();
    if available.is_empty() {
        return Err(BackfillError::NoCapacity);
    }

    let to_create = (req.target as usize).min(available.len());
    let latest_start = req.window_end_min - req.duration_min;

    let mut created = 0u32;
    for idx in rng.sample_indices(available.len(), to_create) {
        let date = available[idx];
        let start_min = rng.minute_in(req.window_start_min, latest_start);
        let in_time = timeparse::time_from_minutes(start_min);
        let out_time = timeparse::time_from_minutes(start_min + req.duration_min);

        if store
            .insert_session(person_id, date, in_time, out_time)
            .await?
        {
            created += 1;
        } else {
            // The date was claimed between the availability query and this
            // insert; count it as unavailable rather than failing the run.
            tracing::warn!(person_id, %date, "backfill date taken concurrently, skipping");
        }
    }

    Ok(BackfillOutcome {
        created,
        skipped: req.target - created,
    })
}

#[cfg(test)]
mod tests {
    use super::sampling::SeededRandom;
    use super::store::AttendanceStore;
    use super::*;
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveTime};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    struct MemoryStore {
        people: Vec<u64>,
        rows: RefCell<HashMap<(u64, NaiveDate), (NaiveTime, NaiveTime)>>,
    }

    impl MemoryStore {
        fn with_person(person_id: u64) -> Self {
            Self {
                people: vec![person_id],
                rows: RefCell::new(HashMap::new()),
            }
        }

        fn occupy(&self, person_id: u64, date: NaiveDate) {
            let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
            let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
            self.rows
                .borrow_mut()
                .insert((person_id, date), (nine, ten));
        }
    }

    impl AttendanceStore for MemoryStore {
        async fn person_exists(&self, person_id: u64) -> Result<bool> {
            Ok(self.people.contains(&person_id))
        }

        async fn taken_dates(
            &self,
            person_id: u64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<HashSet<NaiveDate>> {
            Ok(self
                .rows
                .borrow()
                .keys()
                .filter(|(p, d)| *p == person_id && (start..=end).contains(d))
                .map(|(_, d)| *d)
                .collect())
        }

        async fn insert_session(
            &self,
            person_id: u64,
            date: NaiveDate,
            in_time: NaiveTime,
            out_time: NaiveTime,
        ) -> Result<bool> {
            let mut rows = self.rows.borrow_mut();
            if rows.contains_key(&(person_id, date)) {
                return Ok(false);
            }
            rows.insert((person_id, date), (in_time, out_time));
            Ok(true)
        }
    }

    fn form(
        start: &str,
        end: &str,
        win_start: &str,
        win_end: &str,
        classes: &str,
        hours: &str,
    ) -> BackfillForm {
        BackfillForm {
            start_date: start.into(),
            end_date: end.into(),
            window_start: win_start.into(),
            window_end: win_end.into(),
            classes: classes.into(),
            duration_hours: hours.into(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn january_week() -> BackfillForm {
        form("2024-01-01", "2024-01-05", "09:00", "17:00", "3", "1")
    }

    #[tokio::test]
    async fn places_requested_classes_on_free_dates() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);

        let outcome = generate(&store, &mut rng, 1, &january_week())
            .await
            .unwrap();

        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.skipped, 0);

        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 3);

        let window_start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let window_end = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        for ((person, day), (in_t, out_t)) in rows.iter() {
            assert_eq!(*person, 1);
            assert!((date("2024-01-01")..=date("2024-01-05")).contains(day));
            assert!(*in_t >= window_start);
            assert!(*out_t <= window_end);
            assert_eq!((*out_t - *in_t).num_minutes(), 60);
        }
    }

    #[tokio::test]
    async fn truncates_to_capacity_and_reports_skipped() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);
        let mut req = january_week();
        req.classes = "10".into();

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 5);
        assert_eq!(outcome.skipped, 5);
        assert_eq!(outcome.created + outcome.skipped, 10);
        // all five candidate days got exactly one row each
        let rows = store.rows.borrow();
        let days: HashSet<_> = rows.keys().map(|(_, d)| *d).collect();
        assert_eq!(days.len(), 5);
    }

    #[tokio::test]
    async fn fails_when_every_date_is_taken() {
        let store = MemoryStore::with_person(1);
        for day in date("2024-01-01").iter_days().take(5) {
            store.occupy(1, day);
        }
        let mut rng = SeededRandom::new(42);

        let err = generate(&store, &mut rng, 1, &january_week())
            .await
            .unwrap_err();

        assert!(matches!(err, BackfillError::NoCapacity));
        assert_eq!(store.rows.borrow().len(), 5);
    }

    #[tokio::test]
    async fn avoids_pre_existing_dates() {
        let store = MemoryStore::with_person(1);
        store.occupy(1, date("2024-01-02"));
        store.occupy(1, date("2024-01-04"));
        let mut rng = SeededRandom::new(9);
        let mut req = january_week();
        req.classes = "5".into();

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 3);
        assert_eq!(outcome.skipped, 2);
        // the occupied days kept their original times
        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 5);
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert_eq!(rows[&(1, date("2024-01-02"))], (nine, ten));
        assert_eq!(rows[&(1, date("2024-01-04"))], (nine, ten));
    }

    #[tokio::test]
    async fn window_too_small_fails_before_any_write() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);
        let req = form("2024-01-01", "2024-01-05", "09:00", "09:30", "3", "1");

        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();

        assert!(matches!(err, BackfillError::WindowTooSmall));
        assert!(store.rows.borrow().is_empty());
    }

    #[tokio::test]
    async fn exact_fit_single_day_window() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);
        let req = form("2024-03-10", "2024-03-10", "09:00", "10:00", "1", "1");

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 0);
        let rows = store.rows.borrow();
        let (in_t, out_t) = rows[&(1, date("2024-03-10"))];
        assert_eq!(in_t, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(out_t, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn twelve_hour_window_text_is_accepted() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);
        let req = form("2024-01-01", "2024-01-05", "9:15am", "5:45 PM", "2", "1");

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 2);
        let rows = store.rows.borrow();
        let lo = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        let hi = NaiveTime::from_hms_opt(17, 45, 0).unwrap();
        for (_, (in_t, out_t)) in rows.iter() {
            assert!(*in_t >= lo);
            assert!(*out_t <= hi);
        }
    }

    #[tokio::test]
    async fn unknown_person_fails_before_validation() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);
        // the range is also invalid; the missing person must win
        let req = form("2024-01-09", "2024-01-01", "09:00", "17:00", "3", "1");

        let err = generate(&store, &mut rng, 99, &req).await.unwrap_err();
        assert!(matches!(err, BackfillError::PersonNotFound));
    }

    #[tokio::test]
    async fn rejects_each_malformed_field_with_its_own_error() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(42);

        let mut req = january_week();
        req.end_date = "2023-12-01".into();
        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
        assert!(matches!(err, BackfillError::InvalidRange));
        // resubmitting reports the same constraint
        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
        assert!(matches!(err, BackfillError::InvalidRange));

        let mut req = january_week();
        req.start_date = "01/01/2024".into();
        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
        assert!(matches!(err, BackfillError::InvalidRange));

        for bad in ["0", "-2", "three", "2.5"] {
            let mut req = january_week();
            req.classes = bad.into();
            let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
            assert!(matches!(err, BackfillError::InvalidCount), "count {bad:?}");
        }

        for bad in ["0", "-1", "abc"] {
            let mut req = january_week();
            req.duration_hours = bad.into();
            let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
            assert!(
                matches!(err, BackfillError::InvalidDuration),
                "duration {bad:?}"
            );
        }

        let mut req = january_week();
        req.window_start = "9.15".into();
        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
        match err {
            BackfillError::InvalidTimeFormat(raw) => assert_eq!(raw, "9.15"),
            other => panic!("expected InvalidTimeFormat, got {other:?}"),
        }

        let mut req = january_week();
        req.window_start = "17:00".into();
        req.window_end = "09:00".into();
        let err = generate(&store, &mut rng, 1, &req).await.unwrap_err();
        assert!(matches!(err, BackfillError::InvalidWindow));

        assert!(store.rows.borrow().is_empty());
    }

    #[tokio::test]
    async fn fractional_hours_round_to_minutes() {
        let store = MemoryStore::with_person(1);
        let mut rng = SeededRandom::new(11);
        let req = form("2024-01-01", "2024-01-03", "09:00", "17:00", "2", "1.5");

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 2);
        for (_, (in_t, out_t)) in store.rows.borrow().iter() {
            assert_eq!((*out_t - *in_t).num_minutes(), 90);
        }
    }

    /// Store that reports every date free but rejects inserts on one date,
    /// imitating a concurrent writer claiming it mid-run.
    struct RacyStore {
        inner: MemoryStore,
        poisoned: NaiveDate,
    }

    impl AttendanceStore for RacyStore {
        async fn person_exists(&self, person_id: u64) -> Result<bool> {
            self.inner.person_exists(person_id).await
        }

        async fn taken_dates(
            &self,
            person_id: u64,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<HashSet<NaiveDate>> {
            self.inner.taken_dates(person_id, start, end).await
        }

        async fn insert_session(
            &self,
            person_id: u64,
            date: NaiveDate,
            in_time: NaiveTime,
            out_time: NaiveTime,
        ) -> Result<bool> {
            if date == self.poisoned {
                return Ok(false);
            }
            self.inner
                .insert_session(person_id, date, in_time, out_time)
                .await
        }
    }

    #[tokio::test]
    async fn concurrent_claim_counts_as_skipped_not_error() {
        let store = RacyStore {
            inner: MemoryStore::with_person(1),
            poisoned: date("2024-01-03"),
        };
        let mut rng = SeededRandom::new(42);
        let mut req = january_week();
        req.classes = "5".into();

        let outcome = generate(&store, &mut rng, 1, &req).await.unwrap();

        assert_eq!(outcome.created, 4);
        assert_eq!(outcome.skipped, 1);
        assert!(
            !store
                .inner
                .rows
                .borrow()
                .contains_key(&(1, date("2024-01-03")))
        );
    }
}
