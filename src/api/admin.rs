use crate::{
    backfill::{
        self, BackfillError, BackfillForm,
        sampling::ThreadRandom,
        store::SqlStore,
    },
    model::{attendance::AttendanceRecord, person::Person},
    utils::class_count_cache,
    utils::person_filter,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct PersonSummary {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub image_path: Option<String>,
    #[schema(example = 42)]
    pub total_classes: i64,
}

#[derive(Serialize, ToSchema)]
pub struct PersonDetail {
    pub person: Person,
    pub attendance: Vec<AttendanceRecord>,
    #[schema(example = 42)]
    pub total_classes: i64,
}

fn detail_path(person_id: u64) -> String {
    format!("/admin/people/{}", person_id)
}

/// Admin dashboard
///
/// One summary row per person with their completed-class total.
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Per-person summary", body = [PersonSummary]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Admin"
)]
pub async fn dashboard(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let people = sqlx::query_as::<_, Person>("SELECT * FROM people ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch people for dashboard");
            ErrorInternalServerError("Database error")
        })?;

    let mut summary = Vec::with_capacity(people.len());
    for person in people {
        let total_classes = class_count_cache::total_classes(pool.get_ref(), person.id)
            .await
            .map_err(|e| {
                error!(error = %e, person_id = person.id, "Failed to count classes");
                ErrorInternalServerError("Database error")
            })?;

        summary.push(PersonSummary {
            id: person.id,
            name: person.name,
            phone: person.phone,
            image_path: person.image_path,
            total_classes,
        });
    }

    Ok(HttpResponse::Ok().json(summary))
}

/// Person detail
///
/// Profile plus full attendance history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/people/{person_id}",
    params(
        ("person_id", Path, description = "Person ID")
    ),
    responses(
        (status = 200, description = "Person detail with history", body = PersonDetail),
        (status = 404, description = "Person not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Admin"
)]
pub async fn person_detail(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let person_id = path.into_inner();

    let person = sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = ?")
        .bind(person_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to fetch person");
            ErrorInternalServerError("Database error")
        })?;

    let Some(person) = person else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Person not found"
        })));
    };

    let attendance = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE person_id = ? ORDER BY date DESC",
    )
    .bind(person_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, person_id, "Failed to fetch attendance history");
        ErrorInternalServerError("Database error")
    })?;

    let total_classes = attendance.iter().filter(|r| r.in_time.is_some()).count() as i64;

    Ok(HttpResponse::Ok().json(PersonDetail {
        person,
        attendance,
        total_classes,
    }))
}

/// Backfill attendance
///
/// Generates synthetic historical sessions for one person from the raw
/// admin-form fields. On success the response reports how many sessions were
/// created and how many of the requested count could not be placed.
#[utoipa::path(
    post,
    path = "/api/v1/admin/people/{person_id}/backfill",
    params(
        ("person_id", Path, description = "Person ID")
    ),
    request_body = BackfillForm,
    responses(
        (status = 200, description = "Backfill finished", body = Object, example = json!({
            "message": "Backfill complete",
            "created": 3,
            "skipped": 0,
            "redirect": "/admin/people/1"
        })),
        (status = 400, description = "First failing validation constraint", body = Object, example = json!({
            "message": "No free dates in window",
            "redirect": "/admin/people/1"
        })),
        (status = 404, description = "Person not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Admin"
)]
pub async fn backfill_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<BackfillForm>,
) -> actix_web::Result<impl Responder> {
    let person_id = path.into_inner();

    // Definitive negative from the filter saves the round trip.
    if !person_filter::might_exist(person_id) {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": BackfillError::PersonNotFound.to_string(),
            "redirect": detail_path(person_id)
        })));
    }

    let store = SqlStore::new(pool.get_ref());
    let mut rng = ThreadRandom;

    match backfill::generate(&store, &mut rng, person_id, &payload).await {
        Ok(outcome) => {
            info!(
                person_id,
                created = outcome.created,
                skipped = outcome.skipped,
                "Backfill finished"
            );
            class_count_cache::add_classes(person_id, outcome.created as i64).await;

            Ok(HttpResponse::Ok().json(json!({
                "message": "Backfill complete",
                "created": outcome.created,
                "skipped": outcome.skipped,
                "redirect": detail_path(person_id)
            })))
        }
        Err(BackfillError::PersonNotFound) => Ok(HttpResponse::NotFound().json(json!({
            "message": BackfillError::PersonNotFound.to_string(),
            "redirect": detail_path(person_id)
        }))),
        Err(e) if e.is_user_error() => Ok(HttpResponse::BadRequest().json(json!({
            "message": e.to_string(),
            "redirect": detail_path(person_id)
        }))),
        Err(e) => {
            error!(error = %e, person_id, "Backfill failed");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}
