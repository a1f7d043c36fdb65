use crate::{
    config::Config,
    model::person::Person,
    services::photo,
    utils::class_count_cache,
    utils::db_utils::{build_update, run_update},
    utils::person_filter,
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

/// Columns the dynamic update helper may touch.
const UPDATABLE_COLUMNS: &[&str] = &["name", "phone", "image_path"];

/// First required field an update payload would blank out, if any. Absent
/// fields are fine on a partial update; empty or null values are not.
fn blank_required_field(payload: &Value) -> Option<&'static str> {
    for field in ["name", "phone"] {
        match payload.get(field) {
            Some(Value::String(s)) if s.trim().is_empty() => return Some(field),
            Some(Value::Null) => return Some(field),
            _ => {}
        }
    }
    None
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreatePerson {
    #[schema(example = "Arif Hossain")]
    pub name: String,
    #[schema(example = "+8801712345678")]
    pub phone: String,
    /// Base64-encoded photo bytes, if a photo was submitted.
    #[schema(example = "aGVsbG8=", nullable = true)]
    pub photo: Option<String>,
    #[schema(example = "jpg", nullable = true)]
    pub photo_ext: Option<String>,
}

/// Create Person
#[utoipa::path(
    post,
    path = "/api/v1/people",
    request_body = CreatePerson,
    responses(
        (status = 200, description = "Person created successfully", body = Object, example = json!({
            "message": "Person added successfully",
            "id": 1
        })),
        (status = 400, description = "Name or phone missing, or bad photo payload"),
        (status = 500, description = "Internal server error")
    ),
    tag = "People"
)]
pub async fn create_person(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreatePerson>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    let phone = payload.phone.trim();
    if name.is_empty() || phone.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and phone are required"
        })));
    }

    let image_path = match &payload.photo {
        Some(data) => {
            let ext = payload.photo_ext.as_deref().unwrap_or("jpg");
            match photo::save_photo(&config.static_dir, data, ext) {
                Ok(path) => Some(path),
                Err(e) => {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": e.to_string()
                    })));
                }
            }
        }
        None => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO people (name, phone, image_path)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(phone)
    .bind(&image_path)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let id = res.last_insert_id();
            person_filter::insert(id);
            Ok(HttpResponse::Ok().json(json!({
                "message": "Person added successfully",
                "id": id
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to create person");
            // Do not leak an orphaned file when the insert fails
            photo::remove_photo(&config.static_dir, image_path.as_deref());
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, contact the administrator"
            })))
        }
    }
}

/// List People
#[utoipa::path(
    get,
    path = "/api/v1/people",
    responses(
        (status = 200, description = "Roster of enrolled people", body = [Person])
    ),
    tag = "People"
)]
pub async fn list_people(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let people = sqlx::query_as::<_, Person>("SELECT * FROM people ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch people");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(people))
}

/// Get Person by ID
#[utoipa::path(
    get,
    path = "/api/v1/people/{person_id}",
    params(
        ("person_id", Path, description = "Person ID")
    ),
    responses(
        (status = 200, description = "Person found", body = Person),
        (status = 404, description = "Person not found", body = Object, example = json!({
            "message": "Person not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "People"
)]
pub async fn get_person(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let person_id = path.into_inner();

    // Filter says definitely absent: skip the query.
    if !person_filter::might_exist(person_id) {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Person not found"
        })));
    }

    let person = sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = ?")
        .bind(person_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to fetch person");
            ErrorInternalServerError("Database error")
        })?;

    match person {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Person not found"
        }))),
    }
}

/// Update Person
///
/// Partial update; a new photo replaces the stored file on disk.
#[utoipa::path(
    put,
    path = "/api/v1/people/{person_id}",
    params(
        ("person_id", Path, description = "Person ID")
    ),
    request_body = CreatePerson,
    responses(
        (status = 200, description = "Person updated successfully"),
        (status = 404, description = "Person not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "People"
)]
pub async fn update_person(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let person_id = path.into_inner();
    let mut payload = body.into_inner();

    let current = sqlx::query_as::<_, Person>("SELECT * FROM people WHERE id = ?")
        .bind(person_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to fetch person");
            ErrorInternalServerError("Database error")
        })?;

    let Some(current) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Person not found"
        })));
    };

    // Required fields may be omitted on a partial update, but never blanked.
    if blank_required_field(&payload).is_some() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name and phone are required"
        })));
    }

    // A submitted photo becomes an image_path column value; the previous
    // file goes away only after the new one is on disk.
    let mut new_photo: Option<String> = None;
    if let Some(obj) = payload.as_object_mut() {
        let photo = obj.remove("photo").and_then(|v| v.as_str().map(String::from));
        let ext = obj
            .remove("photo_ext")
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| "jpg".to_string());

        if let Some(data) = photo {
            match photo::save_photo(&config.static_dir, &data, &ext) {
                Ok(path) => {
                    obj.insert("image_path".into(), Value::String(path.clone()));
                    new_photo = Some(path);
                }
                Err(e) => {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": e.to_string()
                    })));
                }
            }
        }
    }

    let update = match build_update("people", &payload, UPDATABLE_COLUMNS, "id", person_id) {
        Ok(update) => update,
        Err(e) => {
            // Do not leak the new file when the update never runs
            photo::remove_photo(&config.static_dir, new_photo.as_deref());
            return Err(e);
        }
    };

    // rows_affected is 0 when nothing changed; existence was already checked
    if let Err(e) = run_update(pool.get_ref(), update).await {
        error!(error = %e, person_id, "Failed to update person");
        photo::remove_photo(&config.static_dir, new_photo.as_deref());
        return Err(actix_web::error::ErrorInternalServerError(e));
    }

    if new_photo.is_some() {
        photo::remove_photo(&config.static_dir, current.image_path.as_deref());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Person updated successfully"
    })))
}

/// Delete Person
///
/// Removes the person, their attendance history, and their photo file.
#[utoipa::path(
    delete,
    path = "/api/v1/people/{person_id}",
    params(
        ("person_id", Path, description = "Person ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Person deleted"
        })),
        (status = 404, description = "Person not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "People"
)]
pub async fn delete_person(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
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

    sqlx::query("DELETE FROM attendance WHERE person_id = ?")
        .bind(person_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to delete attendance rows");
            ErrorInternalServerError("Database error")
        })?;

    sqlx::query("DELETE FROM people WHERE id = ?")
        .bind(person_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, person_id, "Failed to delete person");
            ErrorInternalServerError("Database error")
        })?;

    // The person record owns its photo file.
    photo::remove_photo(&config.static_dir, person.image_path.as_deref());
    person_filter::remove(person_id);
    class_count_cache::forget(person_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Person deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_cannot_blank_required_fields() {
        assert_eq!(blank_required_field(&json!({"name": ""})), Some("name"));
        assert_eq!(blank_required_field(&json!({"name": "   "})), Some("name"));
        assert_eq!(blank_required_field(&json!({"phone": ""})), Some("phone"));
        assert_eq!(blank_required_field(&json!({"name": null})), Some("name"));
        assert_eq!(
            blank_required_field(&json!({"name": "", "phone": ""})),
            Some("name")
        );
    }

    #[test]
    fn partial_updates_may_omit_required_fields() {
        assert_eq!(blank_required_field(&json!({"phone": "+880171"})), None);
        assert_eq!(blank_required_field(&json!({"image_path": null})), None);
        assert_eq!(
            blank_required_field(&json!({"name": "Arif", "phone": "+880171"})),
            None
        );
        assert_eq!(blank_required_field(&json!({})), None);
    }
}
