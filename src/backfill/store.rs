use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::MySqlPool;
use std::collections::HashSet;

/// Persistence seam for the generator. Keeps the algorithm testable without
/// a live database.
pub trait AttendanceStore {
    async fn person_exists(&self, person_id: u64) -> Result<bool>;

    /// Dates in `[start, end]` that already hold a record for this person.
    async fn taken_dates(
        &self,
        person_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<NaiveDate>>;

    /// Inserts one session row. Returns `false` when the (person, date)
    /// uniqueness constraint rejects the row, i.e. the date was claimed
    /// between the availability query and this insert.
    async fn insert_session(
        &self,
        person_id: u64,
        date: NaiveDate,
        in_time: NaiveTime,
        out_time: NaiveTime,
    ) -> Result<bool>;
}

/// Production store over the sqlx pool.
pub struct SqlStore<'a> {
    pool: &'a MySqlPool,
}

impl<'a> SqlStore<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for SqlStore<'_> {
    async fn person_exists(&self, person_id: u64) -> Result<bool> {
        let found: Option<u64> =
            sqlx::query_scalar("SELECT id FROM people WHERE id = ?")
                .bind(person_id)
                .fetch_optional(self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn taken_dates(
        &self,
        person_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        let rows: Vec<(NaiveDate,)> = sqlx::query_as(
            r#"
            SELECT date
            FROM attendance
            WHERE person_id = ? AND date BETWEEN ? AND ?
            "#,
        )
        .bind(person_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    async fn insert_session(
        &self,
        person_id: u64,
        date: NaiveDate,
        in_time: NaiveTime,
        out_time: NaiveTime,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (person_id, date, in_time, out_time)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(person_id)
        .bind(date)
        .bind(in_time)
        .bind(out_time)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                // Duplicate (person, date): the date stopped being available.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Ok(false);
                    }
                }
                Err(e.into())
            }
        }
    }
}
