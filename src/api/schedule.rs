use actix_web::{error::ErrorInternalServerError, web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::core::clock::OrgClock;
use crate::model::schedule::{PatternAssignment, ShiftOverride, WeeklyPattern};
use crate::store;

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateWeeklyPattern {
    #[schema(example = "5X8-DAY")]
    pub code: String,
    #[schema(example = "Five day week, day shift")]
    pub name: String,
    pub mon_shift_id: Option<u64>,
    pub tue_shift_id: Option<u64>,
    pub wed_shift_id: Option<u64>,
    pub thu_shift_id: Option<u64>,
    pub fri_shift_id: Option<u64>,
    pub sat_shift_id: Option<u64>,
    pub sun_shift_id: Option<u64>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreatePatternAssignment {
    pub employee_id: u64,
    pub pattern_id: u64,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub effective_date: NaiveDate,
    #[schema(example = "initial rota", nullable = true)]
    pub reason: Option<String>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct PutShiftOverride {
    pub employee_id: u64,
    #[schema(example = "2024-02-10", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    /// Null = explicit day off.
    pub shift_id: Option<u64>,
    #[schema(example = "holiday swap")]
    pub source_tag: String,
}

fn fk_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

/// Create a weekly pattern
#[utoipa::path(
    post,
    path = "/api/v1/patterns",
    request_body = CreateWeeklyPattern,
    responses(
        (status = 200, description = "Created", body = WeeklyPattern),
        (status = 409, description = "Code exists or a shift reference is invalid"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_pattern(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWeeklyPattern>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO weekly_patterns
            (code, name, mon_shift_id, tue_shift_id, wed_shift_id, thu_shift_id,
             fri_shift_id, sat_shift_id, sun_shift_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.code)
    .bind(&payload.name)
    .bind(payload.mon_shift_id)
    .bind(payload.tue_shift_id)
    .bind(payload.wed_shift_id)
    .bind(payload.thu_shift_id)
    .bind(payload.fri_shift_id)
    .bind(payload.sat_shift_id)
    .bind(payload.sun_shift_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            let created =
                sqlx::query_as::<_, WeeklyPattern>("SELECT * FROM weekly_patterns WHERE id = ?")
                    .bind(res.last_insert_id())
                    .fetch_one(pool.get_ref())
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to fetch created pattern");
                        ErrorInternalServerError("Internal Server Error")
                    })?;
            Ok(HttpResponse::Ok().json(created))
        }
        Err(e) if fk_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Pattern code already exists or a shift reference is invalid"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create pattern");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List weekly patterns
#[utoipa::path(
    get,
    path = "/api/v1/patterns",
    responses(
        (status = 200, description = "All weekly patterns", body = [WeeklyPattern]),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_patterns(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let patterns =
        sqlx::query_as::<_, WeeklyPattern>("SELECT * FROM weekly_patterns ORDER BY code")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list patterns");
                ErrorInternalServerError("Internal Server Error")
            })?;

    Ok(HttpResponse::Ok().json(patterns))
}

/// Assign a pattern to an employee from a date onward
#[utoipa::path(
    post,
    path = "/api/v1/patterns/assignments",
    request_body = CreatePatternAssignment,
    responses(
        (status = 200, description = "Created", body = PatternAssignment),
        (status = 409, description = "Employee or pattern reference is invalid"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_assignment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePatternAssignment>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO pattern_assignments (employee_id, pattern_id, effective_date, reason)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.pattern_id)
    .bind(payload.effective_date)
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => Ok(HttpResponse::Ok().json(PatternAssignment {
            id: res.last_insert_id(),
            employee_id: payload.employee_id,
            pattern_id: payload.pattern_id,
            effective_date: payload.effective_date,
            reason: payload.reason.clone(),
        })),
        Err(e) if fk_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Employee or pattern reference is invalid"
        }))),
        Err(e) => {
            error!(error = %e, "Failed to create assignment");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Upsert a single-day override (at most one per employee and date)
#[utoipa::path(
    put,
    path = "/api/v1/overrides",
    request_body = PutShiftOverride,
    responses(
        (status = 200, description = "Upserted", body = ShiftOverride),
        (status = 409, description = "Employee or shift reference is invalid"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn put_override(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    payload: web::Json<PutShiftOverride>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        r#"
        INSERT INTO shift_overrides (employee_id, work_date, shift_id, source_tag)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE shift_id = VALUES(shift_id), source_tag = VALUES(source_tag)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.work_date)
    .bind(payload.shift_id)
    .bind(&payload.source_tag)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        if fk_violation(&e) {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "Employee or shift reference is invalid"
            })));
        }
        error!(error = %e, "Failed to upsert override");
        return Ok(HttpResponse::InternalServerError().json(json!({
            "message": "Internal Server Error"
        })));
    }

    // The expected shift for that day just changed; refresh the cached
    // aggregate so lateness reflects the new schedule.
    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        ErrorInternalServerError("Internal Server Error")
    })?;
    if let Err(e) = store::recompute_attendance(
        &mut conn,
        clock.get_ref(),
        payload.employee_id,
        payload.work_date,
    )
    .await
    {
        warn!(error = %e, employee_id = payload.employee_id,
            "Override saved but recompute failed; record is stale until next recompute");
    }

    let saved = sqlx::query_as::<_, ShiftOverride>(
        "SELECT * FROM shift_overrides WHERE employee_id = ? AND work_date = ?",
    )
    .bind(payload.employee_id)
    .bind(payload.work_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch saved override");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(saved))
}
