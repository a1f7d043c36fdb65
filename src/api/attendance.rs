use crate::{model::attendance::AttendanceRecord, utils::class_count_cache};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarkAction {
    In,
    Out,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkRequest {
    #[schema(example = 1)]
    pub person_id: u64,
    #[schema(example = "in")]
    pub action: MarkAction,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct RosterRow {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub image_path: Option<String>,
    #[schema(example = "09:15:00", value_type = String, nullable = true)]
    pub today_in: Option<NaiveTime>,
    #[schema(example = "10:15:00", value_type = String, nullable = true)]
    pub today_out: Option<NaiveTime>,
    #[schema(example = 42)]
    pub total_classes: i64,
}

#[derive(Serialize, ToSchema)]
pub struct RosterResponse {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub today: NaiveDate,
    pub people: Vec<RosterRow>,
    #[schema(example = 20)]
    pub total_people: i64,
    /// Checked in today, not yet checked out.
    #[schema(example = 3)]
    pub active_sessions: i64,
    #[schema(example = 5)]
    pub completed_sessions: i64,
}

/// Day roster
///
/// Everyone on the roster with today's in/out marks and lifetime class
/// totals, plus the summary counters the attendance screen shows.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    responses(
        (status = 200, description = "Today's roster", body = RosterResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn today_roster(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();

    let people = sqlx::query_as::<_, RosterRow>(
        r#"
        SELECT p.id,
               p.name,
               p.phone,
               p.image_path,
               todays.in_time  AS today_in,
               todays.out_time AS today_out,
               COALESCE(totals.total_classes, 0) AS total_classes
        FROM people p
        LEFT JOIN (
            SELECT person_id, in_time, out_time
            FROM attendance
            WHERE date = ?
        ) AS todays ON todays.person_id = p.id
        LEFT JOIN (
            SELECT person_id, COUNT(*) AS total_classes
            FROM attendance
            WHERE in_time IS NOT NULL
            GROUP BY person_id
        ) AS totals ON totals.person_id = p.id
        ORDER BY p.name
        "#,
    )
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch day roster");
        ErrorInternalServerError("Database error")
    })?;

    let total_people = people.len() as i64;
    let active_sessions = people
        .iter()
        .filter(|p| p.today_in.is_some() && p.today_out.is_none())
        .count() as i64;
    let completed_sessions = people.iter().filter(|p| p.today_out.is_some()).count() as i64;

    Ok(HttpResponse::Ok().json(RosterResponse {
        today,
        people,
        total_people,
        active_sessions,
        completed_sessions,
    }))
}

/// What a mark submission should do to today's record.
#[derive(Debug, PartialEq)]
enum MarkStep {
    /// No record yet: create one with only this side filled.
    Create {
        column: &'static str,
        counts_class: bool,
    },
    /// Record exists with this side empty: fill it.
    Fill {
        record_id: u64,
        column: &'static str,
        counts_class: bool,
    },
    /// This side is already set; report, never mutate.
    AlreadyMarked,
}

fn plan_mark(record: Option<&AttendanceRecord>, action: &MarkAction) -> MarkStep {
    match (record, action) {
        (None, MarkAction::In) => MarkStep::Create {
            column: "in_time",
            counts_class: true,
        },
        (None, MarkAction::Out) => MarkStep::Create {
            column: "out_time",
            counts_class: false,
        },
        (Some(rec), MarkAction::In) if rec.in_time.is_none() => MarkStep::Fill {
            record_id: rec.id,
            column: "in_time",
            counts_class: true,
        },
        (Some(rec), MarkAction::Out) if rec.out_time.is_none() => MarkStep::Fill {
            record_id: rec.id,
            column: "out_time",
            counts_class: false,
        },
        _ => MarkStep::AlreadyMarked,
    }
}

async fn fetch_today(
    pool: &MySqlPool,
    person_id: u64,
    today: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE person_id = ? AND date = ?",
    )
    .bind(person_id)
    .bind(today)
    .fetch_optional(pool)
    .await
}

/// Mark attendance for today
///
/// Creates today's record with the submitted side, or fills the missing
/// side of an existing record. Marking the same side twice is a soft
/// "Already marked" error, never a mutation.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/mark",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Mark recorded (or already marked)", body = Object, example = json!({
            "status": "success",
            "message": "Start time captured",
            "record": { "in_time": "09:15:00", "out_time": null },
            "total_classes": 42
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn mark(
    pool: web::Data<MySqlPool>,
    payload: web::Json<MarkRequest>,
) -> actix_web::Result<impl Responder> {
    let person_id = payload.person_id;
    let today = Local::now().date_naive();
    let now = Local::now().time();

    let record = fetch_today(pool.get_ref(), person_id, today)
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to fetch today's record");
            ErrorInternalServerError("Database error")
        })?;

    let mut counted_class = false;
    match plan_mark(record.as_ref(), &payload.action) {
        MarkStep::Create {
            column,
            counts_class,
        } => {
            let sql =
                format!("INSERT INTO attendance (person_id, date, {column}) VALUES (?, ?, ?)");
            let result = sqlx::query(&sql)
                .bind(person_id)
                .bind(today)
                .bind(now)
                .execute(pool.get_ref())
                .await;

            match result {
                Ok(_) => counted_class = counts_class,
                Err(e) => {
                    // Someone else created today's row first.
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.code().as_deref() == Some("23000") {
                            return Ok(HttpResponse::Ok().json(json!({
                                "status": "error",
                                "message": "Already marked"
                            })));
                        }
                    }
                    error!(error = %e, person_id, "Failed to insert attendance mark");
                    return Err(ErrorInternalServerError("Database error"));
                }
            }
        }
        MarkStep::Fill {
            record_id,
            column,
            counts_class,
        } => {
            let sql = format!("UPDATE attendance SET {column} = ? WHERE id = ?");
            sqlx::query(&sql)
                .bind(now)
                .bind(record_id)
                .execute(pool.get_ref())
                .await
                .map_err(|e| {
                    error!(error = %e, person_id, column, "Failed to fill attendance mark");
                    ErrorInternalServerError("Database error")
                })?;
            counted_class = counts_class;
        }
        MarkStep::AlreadyMarked => {
            return Ok(HttpResponse::Ok().json(json!({
                "status": "error",
                "message": "Already marked"
            })));
        }
    }

    if counted_class {
        class_count_cache::add_classes(person_id, 1).await;
    }

    let updated = fetch_today(pool.get_ref(), person_id, today)
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to refetch today's record");
            ErrorInternalServerError("Database error")
        })?;

    let total_classes = class_count_cache::total_classes(pool.get_ref(), person_id)
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to count classes");
            ErrorInternalServerError("Database error")
        })?;

    let action_message = match &payload.action {
        MarkAction::In => "Start time captured",
        MarkAction::Out => "End time captured",
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": action_message,
        "record": {
            "in_time": updated.as_ref().and_then(|r| r.in_time),
            "out_time": updated.as_ref().and_then(|r| r.out_time),
        },
        "total_classes": total_classes
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(in_time: Option<(u32, u32)>, out_time: Option<(u32, u32)>) -> AttendanceRecord {
        AttendanceRecord {
            id: 7,
            person_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            in_time: in_time.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap()),
            out_time: out_time.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap()),
        }
    }

    #[test]
    fn first_mark_of_the_day_creates_that_side_only() {
        assert_eq!(
            plan_mark(None, &MarkAction::In),
            MarkStep::Create {
                column: "in_time",
                counts_class: true
            }
        );
        // checking out first still creates a record, with only the out side
        assert_eq!(
            plan_mark(None, &MarkAction::Out),
            MarkStep::Create {
                column: "out_time",
                counts_class: false
            }
        );
    }

    #[test]
    fn missing_side_of_an_existing_record_gets_filled() {
        let open = record(Some((9, 0)), None);
        assert_eq!(
            plan_mark(Some(&open), &MarkAction::Out),
            MarkStep::Fill {
                record_id: 7,
                column: "out_time",
                counts_class: false
            }
        );

        let out_only = record(None, Some((17, 0)));
        assert_eq!(
            plan_mark(Some(&out_only), &MarkAction::In),
            MarkStep::Fill {
                record_id: 7,
                column: "in_time",
                counts_class: true
            }
        );
    }

    #[test]
    fn marking_the_same_side_twice_never_mutates() {
        let open = record(Some((9, 0)), None);
        assert_eq!(plan_mark(Some(&open), &MarkAction::In), MarkStep::AlreadyMarked);

        let out_only = record(None, Some((17, 0)));
        assert_eq!(
            plan_mark(Some(&out_only), &MarkAction::Out),
            MarkStep::AlreadyMarked
        );

        let complete = record(Some((9, 0)), Some((17, 0)));
        assert_eq!(
            plan_mark(Some(&complete), &MarkAction::In),
            MarkStep::AlreadyMarked
        );
        assert_eq!(
            plan_mark(Some(&complete), &MarkAction::Out),
            MarkStep::AlreadyMarked
        );
    }
}
