use actix_web::{error::ErrorInternalServerError, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::core::catalog::{self, ShiftSpec};
use crate::model::shift::ShiftTemplate;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct ShiftTemplateInput {
    #[schema(example = "NIGHT-2200")]
    pub code: String,
    #[schema(example = "Night shift")]
    pub name: String,
    /// Wall-clock "HH:MM" in the organization's offset.
    #[schema(example = "22:00")]
    pub start_time: String,
    #[schema(example = "06:00")]
    pub end_time: String,
    #[serde(default)]
    #[schema(example = true)]
    pub spans_midnight: bool,
    #[schema(example = "02:00", nullable = true)]
    pub break_start_time: Option<String>,
    #[schema(example = "02:30", nullable = true)]
    pub break_end_time: Option<String>,
}

struct ParsedShift {
    spec: ShiftSpec,
    derived: catalog::ShiftDerived,
}

fn parse_input(input: &ShiftTemplateInput) -> Result<ParsedShift, HttpResponse> {
    let bad_request =
        |e: catalog::CatalogError| HttpResponse::BadRequest().json(json!({ "message": e.to_string() }));

    let spec = ShiftSpec {
        start_minute: catalog::parse_hhmm(&input.start_time).map_err(bad_request)?,
        end_minute: catalog::parse_hhmm(&input.end_time).map_err(bad_request)?,
        spans_midnight: input.spans_midnight,
        break_start_minute: input
            .break_start_time
            .as_deref()
            .map(catalog::parse_hhmm)
            .transpose()
            .map_err(bad_request)?,
        break_end_minute: input
            .break_end_time
            .as_deref()
            .map(catalog::parse_hhmm)
            .transpose()
            .map_err(bad_request)?,
    };
    let derived = catalog::derive(&spec).map_err(bad_request)?;
    Ok(ParsedShift { spec, derived })
}

/// Create a shift template
#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = ShiftTemplateInput,
    responses(
        (status = 200, description = "Created", body = ShiftTemplate),
        (status = 400, description = "Invalid times or break window"),
        (status = 409, description = "Code already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ShiftTemplateInput>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let parsed = match parse_input(&payload) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    debug!(
        code = %payload.code,
        span_minutes = parsed.derived.total_span_minutes,
        paid_hours = parsed.derived.paid_hours_per_day,
        "Creating shift template"
    );

    let result = sqlx::query(
        r#"
        INSERT INTO shift_templates
            (code, name, start_minute, end_minute, spans_midnight,
             break_start_minute, break_end_minute, unpaid_break_minutes, paid_hours_per_day)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.code)
    .bind(&payload.name)
    .bind(parsed.spec.start_minute)
    .bind(parsed.spec.end_minute)
    .bind(parsed.spec.spans_midnight)
    .bind(parsed.spec.break_start_minute)
    .bind(parsed.spec.break_end_minute)
    .bind(parsed.derived.unpaid_break_minutes)
    .bind(parsed.derived.paid_hours_per_day)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let created = fetch_by_id(pool.get_ref(), res.last_insert_id()).await?;
            Ok(HttpResponse::Ok().json(created))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Shift code already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to create shift template");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

async fn fetch_by_id(pool: &MySqlPool, id: u64) -> actix_web::Result<ShiftTemplate> {
    sqlx::query_as::<_, ShiftTemplate>("SELECT * FROM shift_templates WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to fetch shift template");
            ErrorInternalServerError("Internal Server Error")
        })
}

/// List shift templates
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    responses(
        (status = 200, description = "All shift templates", body = [ShiftTemplate]),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn list_shifts(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let shifts =
        sqlx::query_as::<_, ShiftTemplate>("SELECT * FROM shift_templates ORDER BY code")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list shift templates");
                ErrorInternalServerError("Internal Server Error")
            })?;

    Ok(HttpResponse::Ok().json(shifts))
}

/// Get a shift template
#[utoipa::path(
    get,
    path = "/api/v1/shifts/{id}",
    params(("id" = u64, Path, description = "Shift template ID")),
    responses(
        (status = 200, description = "Shift template", body = ShiftTemplate),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn get_shift(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let shift = sqlx::query_as::<_, ShiftTemplate>("SELECT * FROM shift_templates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, id, "Failed to fetch shift template");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match shift {
        Some(s) => Ok(HttpResponse::Ok().json(s)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" }))),
    }
}

/// Update a shift template (full replace; derived fields recomputed)
#[utoipa::path(
    put,
    path = "/api/v1/shifts/{id}",
    params(("id" = u64, Path, description = "Shift template ID")),
    request_body = ShiftTemplateInput,
    responses(
        (status = 200, description = "Updated", body = ShiftTemplate),
        (status = 400, description = "Invalid times or break window"),
        (status = 404, description = "Not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ShiftTemplateInput>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let parsed = match parse_input(&payload) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };

    let result = sqlx::query(
        r#"
        UPDATE shift_templates
        SET code = ?, name = ?, start_minute = ?, end_minute = ?, spans_midnight = ?,
            break_start_minute = ?, break_end_minute = ?,
            unpaid_break_minutes = ?, paid_hours_per_day = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.code)
    .bind(&payload.name)
    .bind(parsed.spec.start_minute)
    .bind(parsed.spec.end_minute)
    .bind(parsed.spec.spans_midnight)
    .bind(parsed.spec.break_start_minute)
    .bind(parsed.spec.break_end_minute)
    .bind(parsed.derived.unpaid_break_minutes)
    .bind(parsed.derived.paid_hours_per_day)
    .bind(id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to update shift template");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" })));
    }

    let updated = fetch_by_id(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a shift template; refused while patterns or overrides reference it
#[utoipa::path(
    delete,
    path = "/api/v1/shifts/{id}",
    params(("id" = u64, Path, description = "Shift template ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Still referenced by a pattern or override"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn delete_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let referenced: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM weekly_patterns
             WHERE ? IN (mon_shift_id, tue_shift_id, wed_shift_id, thu_shift_id,
                         fri_shift_id, sat_shift_id, sun_shift_id))
          + (SELECT COUNT(*) FROM shift_overrides WHERE shift_id = ?)
        "#,
    )
    .bind(id)
    .bind(id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, id, "Failed to count shift references");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if referenced > 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Shift is referenced by a pattern or override and cannot be deleted"
        })));
    }

    let result = sqlx::query("DELETE FROM shift_templates WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => {
            Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" })))
        }
        Ok(_) => Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" }))),
        Err(e) => {
            // FK backstop: a reference created between the count and the delete.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Shift is referenced by a pattern or override and cannot be deleted"
                    })));
                }
            }
            error!(error = %e, id, "Failed to delete shift template");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
