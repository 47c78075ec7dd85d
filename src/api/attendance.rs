use actix_web::{error::ErrorInternalServerError, web, HttpResponse, Responder};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::clock::OrgClock;
use crate::model::attendance::AttendanceRecord;
use crate::store;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    /// Defaults to the caller's own employee id.
    pub employee_id: Option<u64>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

/// Read the cached day summary
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 404, description = "No record for that day"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = query
        .employee_id
        .or(auth.employee_id)
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;
    auth.require_self_or_hr(employee_id)?;

    let date = query.date.unwrap_or_else(|| clock.work_date(clock.now()));

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let record = store::fetch_attendance(&mut conn, employee_id, date)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, %date, "Failed to fetch attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match record {
        Some(r) => Ok(HttpResponse::Ok().json(r)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No attendance record for that day"
        }))),
    }
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct RecomputeRequest {
    pub employee_id: u64,
    #[schema(example = "2024-02-10", value_type = String, format = "date")]
    pub date: NaiveDate,
}

/// Force-recompute one employee-day from the punch ledger
#[utoipa::path(
    post,
    path = "/api/v1/attendance/recompute",
    request_body = RecomputeRequest,
    responses(
        (status = 200, description = "Recomputed record", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn recompute(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    payload: web::Json<RecomputeRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let record = store::recompute_attendance(
        &mut conn,
        clock.get_ref(),
        payload.employee_id,
        payload.date,
    )
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, date = %payload.date,
            "Forced recompute failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(employee_id = payload.employee_id, date = %payload.date, "Forced recompute");
    Ok(HttpResponse::Ok().json(record))
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct LockRequest {
    #[schema(example = "2024-02-01", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2024-02-10", value_type = String, format = "date")]
    pub to: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct LockResponse {
    pub locked: u64,
}

/// Finalize a date range: unlocked records without a clock-out become
/// INCOMPLETE, then everything in range is locked
#[utoipa::path(
    post,
    path = "/api/v1/attendance/lock",
    request_body = LockRequest,
    responses(
        (status = 200, description = "Rows finalized", body = LockResponse),
        (status = 400, description = "Range is malformed or not yet past the grace window"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn lock_days(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    config: web::Data<Config>,
    payload: web::Json<LockRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.from > payload.to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from must not be after to"
        })));
    }

    // Never race a last-moment punch: the newest day in the range must have
    // fully elapsed plus the configured grace.
    let (_, day_end) = clock.day_window(payload.to);
    let safe_after = day_end + Duration::minutes(config.day_lock_grace_minutes);
    if clock.now() < safe_after {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!(
                "Day {} has not fully elapsed; locking allowed after {}",
                payload.to, safe_after
            )
        })));
    }

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let locked = store::lock_day_range(&mut conn, payload.from, payload.to)
        .await
        .map_err(|e| {
            error!(error = %e, from = %payload.from, to = %payload.to, "Day lock failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    info!(from = %payload.from, to = %payload.to, locked, "Day lock complete");
    Ok(HttpResponse::Ok().json(LockResponse { locked }))
}
