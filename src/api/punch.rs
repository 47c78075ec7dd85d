use std::net::IpAddr;
use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::auth::kiosk::{verify_punch_credentials, KioskAuthError};
use crate::config::Config;
use crate::core::aggregate;
use crate::core::clock::OrgClock;
use crate::core::ledger::{validate_bucket, validate_sequence, validate_time_in, PunchRejection};
use crate::core::schedule::ExpectedShift;
use crate::model::attendance::AttendanceRecord;
use crate::model::punch::{PunchEvent, PunchSource, PunchType};
use crate::store;
use crate::utils::ip_guard;

#[derive(Deserialize, ToSchema)]
pub struct PunchRequest {
    #[schema(example = "TIME_IN")]
    pub punch_type: String,
    /// Defaults to the current instant.
    #[schema(value_type = Option<String>, format = "date-time")]
    pub timestamp: Option<DateTime<Utc>>,
    /// "YYYY-MM-DD"; defaults to the timestamp's work date.
    #[schema(example = "2024-02-10")]
    pub target_date: Option<String>,
    /// HR/Admin only: punch on behalf of another employee (recorded as MANUAL).
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct KioskPunchRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[schema(example = "TIME_IN")]
    pub punch_type: String,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub timestamp: Option<DateTime<Utc>>,
    #[schema(example = "2024-02-10")]
    pub target_date: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PunchResponse {
    pub punch: PunchEvent,
    /// Null only when the recompute failed after the punch committed; the
    /// punch is valid history and the record catches up on the next recompute.
    pub record: Option<AttendanceRecord>,
}

enum SubmitError {
    Rejected(PunchRejection),
    Busy,
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for SubmitError {
    fn from(e: sqlx::Error) -> Self {
        SubmitError::Storage(e)
    }
}

fn rejection_response(rejection: PunchRejection) -> HttpResponse {
    HttpResponse::build(rejection.status()).json(serde_json::json!({
        "error": rejection.reason(),
        "message": rejection.to_string(),
    }))
}

fn submit_error_response(err: SubmitError) -> HttpResponse {
    match err {
        SubmitError::Rejected(r) => rejection_response(r),
        SubmitError::Busy => HttpResponse::Conflict().json(serde_json::json!({
            "error": "busy",
            "message": "Another punch for this employee is being processed, try again",
        })),
        SubmitError::Storage(e) => {
            error!(error = %e, "Punch submission failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal Server Error"
            }))
        }
    }
}

fn parse_punch_type(raw: &str) -> Result<PunchType, PunchRejection> {
    PunchType::from_str(raw).map_err(|_| PunchRejection::InvalidPunchType)
}

fn parse_target_date(raw: Option<&str>) -> Result<Option<NaiveDate>, PunchRejection> {
    raw.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| PunchRejection::InvalidDate)
}

/// Validate-append-recompute under the per-(employee, day) advisory lock.
async fn submit(
    pool: &MySqlPool,
    clock: &OrgClock,
    employee_id: u64,
    punch_type: PunchType,
    source: PunchSource,
    at: DateTime<Utc>,
    target_date: Option<NaiveDate>,
) -> Result<PunchResponse, SubmitError> {
    let work_date = target_date.unwrap_or_else(|| clock.work_date(at));
    validate_bucket(work_date, clock.work_date(at)).map_err(SubmitError::Rejected)?;

    let mut conn = pool.acquire().await?;

    // Directory gate: only active employees punch, whatever the transport.
    match store::fetch_employee(&mut conn, employee_id).await? {
        Some(employee) if employee.status == "active" => {}
        _ => return Err(SubmitError::Rejected(PunchRejection::UserNotEligible)),
    }

    if !store::acquire_punch_lock(&mut conn, employee_id, work_date).await? {
        return Err(SubmitError::Busy);
    }

    let outcome = submit_locked(
        &mut conn, clock, employee_id, punch_type, source, at, work_date,
    )
    .await;

    store::release_punch_lock(&mut conn, employee_id, work_date).await;
    outcome
}

async fn submit_locked(
    conn: &mut MySqlConnection,
    clock: &OrgClock,
    employee_id: u64,
    punch_type: PunchType,
    source: PunchSource,
    at: DateTime<Utc>,
    work_date: NaiveDate,
) -> Result<PunchResponse, SubmitError> {
    let window = clock.day_window(work_date);

    let last = store::fetch_last_punch_type(&mut *conn, employee_id, window).await?;
    validate_sequence(last, punch_type).map_err(SubmitError::Rejected)?;

    if punch_type == PunchType::TimeIn {
        let target_is_today = work_date == clock.work_date(clock.now());
        let expected = store::resolve_expected(&mut *conn, employee_id, work_date).await?;
        validate_time_in(&expected, clock.minute_of_day(at), target_is_today)
            .map_err(SubmitError::Rejected)?;
    }

    let punch = store::insert_punch(&mut *conn, employee_id, at, punch_type, source).await?;

    // The punch is committed history now. A failed recompute is retried once
    // and otherwise left for the next recompute, never rolled back.
    let record = match store::recompute_attendance(&mut *conn, clock, employee_id, work_date).await
    {
        Ok(record) => Some(record),
        Err(first) => {
            warn!(error = %first, employee_id, %work_date, "Recompute failed, retrying");
            match store::recompute_attendance(conn, clock, employee_id, work_date).await {
                Ok(record) => Some(record),
                Err(second) => {
                    error!(error = %second, employee_id, %work_date,
                        "Recompute retry failed; attendance record is stale");
                    None
                }
            }
        }
    };

    Ok(PunchResponse { punch, record })
}

fn peer_ip(req: &HttpRequest) -> Option<IpAddr> {
    req.peer_addr().map(|addr| addr.ip())
}

/// Self-service (and MANUAL on-behalf) punch
#[utoipa::path(
    post,
    path = "/api/v1/punch",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Punch accepted", body = PunchResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not eligible or address not allowed"),
        (status = 422, description = "Rejected by scheduling or sequence gate", body = Object, example = json!({
            "error": "too_early",
            "message": "Too early to clock in for your shift"
        })),
        (status = 409, description = "Concurrent punch in flight"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Punch"
)]
pub async fn submit_punch(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    config: web::Data<Config>,
    body: web::Json<PunchRequest>,
) -> actix_web::Result<impl Responder> {
    let punch_type = match parse_punch_type(&body.punch_type) {
        Ok(t) => t,
        Err(r) => return Ok(rejection_response(r)),
    };
    let target_date = match parse_target_date(body.target_date.as_deref()) {
        Ok(d) => d,
        Err(r) => return Ok(rejection_response(r)),
    };

    let (employee_id, source) = match body.employee_id {
        Some(target) if Some(target) != auth.employee_id => {
            auth.require_hr_or_admin()?;
            info!(
                actor_id = auth.user_id,
                actor = %auth.username,
                employee_id = target,
                "Manual punch on behalf of employee"
            );
            (target, PunchSource::Manual)
        }
        _ => match auth.employee_id {
            Some(own) => (own, PunchSource::WebSelf),
            None => return Ok(rejection_response(PunchRejection::UserNotEligible)),
        },
    };

    if source == PunchSource::WebSelf
        && !ip_guard::ip_allowed(peer_ip(&req), &config.punch_allowed_ips)
    {
        return Ok(rejection_response(PunchRejection::IpNotAllowed));
    }

    let at = body.timestamp.unwrap_or_else(|| clock.now());
    match submit(
        pool.get_ref(),
        clock.get_ref(),
        employee_id,
        punch_type,
        source,
        at,
        target_date,
    )
    .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(resp)),
        Err(e) => Ok(submit_error_response(e)),
    }
}

/// Kiosk punch: anonymous transport, username/password in the body
#[utoipa::path(
    post,
    path = "/punch/kiosk",
    request_body = KioskPunchRequest,
    responses(
        (status = 200, description = "Punch accepted", body = PunchResponse),
        (status = 401, description = "Missing or invalid credentials", body = Object, example = json!({
            "error": "invalid_credentials",
            "message": "Invalid credentials"
        })),
        (status = 403, description = "Not eligible or address not allowed"),
        (status = 422, description = "Rejected by scheduling or sequence gate"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Punch"
)]
pub async fn submit_kiosk_punch(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    config: web::Data<Config>,
    body: web::Json<KioskPunchRequest>,
) -> actix_web::Result<impl Responder> {
    if !ip_guard::ip_allowed(peer_ip(&req), &config.punch_allowed_ips) {
        return Ok(rejection_response(PunchRejection::IpNotAllowed));
    }

    let punch_type = match parse_punch_type(&body.punch_type) {
        Ok(t) => t,
        Err(r) => return Ok(rejection_response(r)),
    };
    let target_date = match parse_target_date(body.target_date.as_deref()) {
        Ok(d) => d,
        Err(r) => return Ok(rejection_response(r)),
    };

    let username = body.username.as_deref().unwrap_or("");
    let password = body.password.as_deref().unwrap_or("");
    let user = match verify_punch_credentials(username, password, pool.get_ref()).await {
        Ok(user) => user,
        Err(KioskAuthError::Rejected(r)) => return Ok(rejection_response(r)),
        Err(KioskAuthError::Storage(e)) => {
            error!(error = %e, "Kiosk credential check failed");
            return Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal Server Error"
            })));
        }
    };
    let employee_id = match user.employee_id {
        Some(id) => id,
        None => return Ok(rejection_response(PunchRejection::UserNotEligible)),
    };

    let at = body.timestamp.unwrap_or_else(|| clock.now());
    match submit(
        pool.get_ref(),
        clock.get_ref(),
        employee_id,
        punch_type,
        PunchSource::Kiosk,
        at,
        target_date,
    )
    .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(resp)),
        Err(e) => Ok(submit_error_response(e)),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    /// Defaults to the caller's own employee id.
    pub employee_id: Option<u64>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct PunchStatusResponse {
    pub expected_shift: ExpectedShift,
    pub punches: Vec<PunchEvent>,
    pub last_punch: Option<PunchEvent>,
    pub break_count: u32,
    pub break_minutes: i64,
}

/// Day status: expected shift plus the punches so far
#[utoipa::path(
    get,
    path = "/api/v1/punch/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current day status", body = PunchStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Punch"
)]
pub async fn punch_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<OrgClock>,
    query: web::Query<StatusQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id.or(auth.employee_id) {
        Some(id) => id,
        None => return Ok(rejection_response(PunchRejection::UserNotEligible)),
    };
    auth.require_self_or_hr(employee_id)?;

    let date = query.date.unwrap_or_else(|| clock.work_date(clock.now()));

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let result: Result<PunchStatusResponse, sqlx::Error> = async {
        let expected = store::resolve_expected(&mut conn, employee_id, date).await?;
        let punches =
            store::fetch_day_punches(&mut conn, employee_id, clock.day_window(date)).await?;
        let summary = aggregate::aggregate_day(clock.get_ref(), &punches, &expected);
        Ok(PunchStatusResponse {
            last_punch: punches.last().cloned(),
            expected_shift: expected,
            punches,
            break_count: summary.break_count,
            break_minutes: summary.break_minutes,
        })
    }
    .await;

    match result {
        Ok(resp) => Ok(HttpResponse::Ok().json(resp)),
        Err(e) => {
            error!(error = %e, employee_id, %date, "Failed to build day status");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
