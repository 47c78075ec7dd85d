//! Shared SQL for the punch/attendance flow. Everything takes a pinned
//! `MySqlConnection` because the punch path must hold a per-(employee, day)
//! advisory lock, and `GET_LOCK` is connection-scoped.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::MySqlConnection;
use tracing::warn;

use crate::core::aggregate::{self, DaySummary};
use crate::core::clock::OrgClock;
use crate::core::schedule::{resolve_expected_shift, ExpectedShift};
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::Employee;
use crate::model::punch::{PunchEvent, PunchSource, PunchType};
use crate::model::schedule::{PatternAssignment, ShiftOverride, WeeklyPattern};
use crate::model::shift::ShiftTemplate;

const PUNCH_LOCK_WAIT_SECS: i64 = 5;

fn punch_lock_key(employee_id: u64, work_date: NaiveDate) -> String {
    format!("punch:{}:{}", employee_id, work_date)
}

/// Serializes the read-validate-append sequence for one employee/day.
/// Returns false when the lock could not be taken within the wait window
/// (another punch for the same employee/day is in flight).
pub async fn acquire_punch_lock(
    conn: &mut MySqlConnection,
    employee_id: u64,
    work_date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let granted: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, ?)")
        .bind(punch_lock_key(employee_id, work_date))
        .bind(PUNCH_LOCK_WAIT_SECS)
        .fetch_one(conn)
        .await?;
    Ok(granted == Some(1))
}

pub async fn release_punch_lock(
    conn: &mut MySqlConnection,
    employee_id: u64,
    work_date: NaiveDate,
) {
    let released = sqlx::query_scalar::<_, Option<i64>>("SELECT RELEASE_LOCK(?)")
        .bind(punch_lock_key(employee_id, work_date))
        .fetch_one(conn)
        .await;
    if let Err(e) = released {
        // The lock dies with the connection anyway.
        warn!(error = %e, employee_id, %work_date, "Failed to release punch lock");
    }
}

/// All punches inside `[start, end)`, oldest first.
pub async fn fetch_day_punches(
    conn: &mut MySqlConnection,
    employee_id: u64,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<PunchEvent>, sqlx::Error> {
    sqlx::query_as::<_, PunchEvent>(
        r#"
        SELECT id, employee_id, punched_at, punch_type, source
        FROM punch_events
        WHERE employee_id = ? AND punched_at >= ? AND punched_at < ?
        ORDER BY punched_at ASC, id ASC
        "#,
    )
    .bind(employee_id)
    .bind(window.0)
    .bind(window.1)
    .fetch_all(conn)
    .await
}

/// Last punch type inside the day window; the state-machine key.
pub async fn fetch_last_punch_type(
    conn: &mut MySqlConnection,
    employee_id: u64,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Option<PunchType>, sqlx::Error> {
    sqlx::query_scalar::<_, PunchType>(
        r#"
        SELECT punch_type
        FROM punch_events
        WHERE employee_id = ? AND punched_at >= ? AND punched_at < ?
        ORDER BY punched_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(window.0)
    .bind(window.1)
    .fetch_optional(conn)
    .await
}

pub async fn insert_punch(
    conn: &mut MySqlConnection,
    employee_id: u64,
    punched_at: DateTime<Utc>,
    punch_type: PunchType,
    source: PunchSource,
) -> Result<PunchEvent, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO punch_events (employee_id, punched_at, punch_type, source)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(punched_at)
    .bind(punch_type)
    .bind(source)
    .execute(conn)
    .await?;

    Ok(PunchEvent {
        id: result.last_insert_id(),
        employee_id,
        punched_at,
        punch_type,
        source,
    })
}

pub async fn fetch_employee(
    conn: &mut MySqlConnection,
    id: u64,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_template(
    conn: &mut MySqlConnection,
    id: u64,
) -> Result<Option<ShiftTemplate>, sqlx::Error> {
    sqlx::query_as::<_, ShiftTemplate>("SELECT * FROM shift_templates WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

#[derive(sqlx::FromRow)]
struct AssignmentPatternRow {
    id: u64,
    employee_id: u64,
    pattern_id: u64,
    effective_date: NaiveDate,
    reason: Option<String>,
    code: String,
    name: String,
    mon_shift_id: Option<u64>,
    tue_shift_id: Option<u64>,
    wed_shift_id: Option<u64>,
    thu_shift_id: Option<u64>,
    fri_shift_id: Option<u64>,
    sat_shift_id: Option<u64>,
    sun_shift_id: Option<u64>,
}

impl AssignmentPatternRow {
    fn split(self) -> (PatternAssignment, WeeklyPattern) {
        (
            PatternAssignment {
                id: self.id,
                employee_id: self.employee_id,
                pattern_id: self.pattern_id,
                effective_date: self.effective_date,
                reason: self.reason,
            },
            WeeklyPattern {
                id: self.pattern_id,
                code: self.code,
                name: self.name,
                mon_shift_id: self.mon_shift_id,
                tue_shift_id: self.tue_shift_id,
                wed_shift_id: self.wed_shift_id,
                thu_shift_id: self.thu_shift_id,
                fri_shift_id: self.fri_shift_id,
                sat_shift_id: self.sat_shift_id,
                sun_shift_id: self.sun_shift_id,
            },
        )
    }
}

/// Fetches the schedule rows for (employee, date) and runs the precedence
/// resolver over them.
pub async fn resolve_expected(
    conn: &mut MySqlConnection,
    employee_id: u64,
    date: NaiveDate,
) -> Result<ExpectedShift, sqlx::Error> {
    let override_row = sqlx::query_as::<_, ShiftOverride>(
        r#"
        SELECT id, employee_id, work_date, shift_id, source_tag
        FROM shift_overrides
        WHERE employee_id = ? AND work_date = ?
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;

    // Only the latest effective assignment can win, so one row suffices.
    let assignment = sqlx::query_as::<_, AssignmentPatternRow>(
        r#"
        SELECT a.id, a.employee_id, a.pattern_id, a.effective_date, a.reason,
               p.code, p.name,
               p.mon_shift_id, p.tue_shift_id, p.wed_shift_id, p.thu_shift_id,
               p.fri_shift_id, p.sat_shift_id, p.sun_shift_id
        FROM pattern_assignments a
        JOIN weekly_patterns p ON p.id = a.pattern_id
        WHERE a.employee_id = ? AND a.effective_date <= ?
        ORDER BY a.effective_date DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(&mut *conn)
    .await?;

    let assignments: Vec<(PatternAssignment, WeeklyPattern)> = assignment
        .map(AssignmentPatternRow::split)
        .into_iter()
        .collect();

    let mut candidate_ids = Vec::new();
    if let Some(ov) = override_row.as_ref().and_then(|o| o.shift_id) {
        candidate_ids.push(ov);
    }
    if let Some((_, pattern)) = assignments.first() {
        if let Some(slot) = pattern.slot_for(date.weekday()) {
            candidate_ids.push(slot);
        }
    }

    let mut templates: HashMap<u64, ShiftTemplate> = HashMap::new();
    for id in candidate_ids {
        if let Some(template) = fetch_template(&mut *conn, id).await? {
            templates.insert(id, template);
        }
    }

    Ok(resolve_expected_shift(
        date,
        override_row.as_ref(),
        &assignments,
        |id| templates.get(&id).cloned(),
    ))
}

pub async fn fetch_attendance(
    conn: &mut MySqlConnection,
    employee_id: u64,
    work_date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE employee_id = ? AND work_date = ?",
    )
    .bind(employee_id)
    .bind(work_date)
    .fetch_optional(conn)
    .await
}

async fn upsert_attendance(
    conn: &mut MySqlConnection,
    employee_id: u64,
    work_date: NaiveDate,
    summary: &DaySummary,
) -> Result<(), sqlx::Error> {
    // Locked rows stay as they are even if a recompute races the locker.
    sqlx::query(
        r#"
        INSERT INTO attendance_records
            (employee_id, work_date, status, actual_in_at, actual_out_at,
             worked_minutes, break_minutes, break_count, late_minutes,
             undertime_minutes, overtime_minutes_raw, is_locked)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        ON DUPLICATE KEY UPDATE
            status = IF(is_locked, status, VALUES(status)),
            actual_in_at = IF(is_locked, actual_in_at, VALUES(actual_in_at)),
            actual_out_at = IF(is_locked, actual_out_at, VALUES(actual_out_at)),
            worked_minutes = IF(is_locked, worked_minutes, VALUES(worked_minutes)),
            break_minutes = IF(is_locked, break_minutes, VALUES(break_minutes)),
            break_count = IF(is_locked, break_count, VALUES(break_count)),
            late_minutes = IF(is_locked, late_minutes, VALUES(late_minutes)),
            undertime_minutes = IF(is_locked, undertime_minutes, VALUES(undertime_minutes)),
            overtime_minutes_raw = IF(is_locked, overtime_minutes_raw, VALUES(overtime_minutes_raw))
        "#,
    )
    .bind(employee_id)
    .bind(work_date)
    .bind(summary.status)
    .bind(summary.actual_in_at)
    .bind(summary.actual_out_at)
    .bind(summary.worked_minutes)
    .bind(summary.break_minutes)
    .bind(summary.break_count)
    .bind(summary.late_minutes)
    .bind(summary.undertime_minutes)
    .bind(summary.overtime_minutes_raw)
    .execute(conn)
    .await?;
    Ok(())
}

/// Recomputes the cached day summary from the ledger. Idempotent; a locked
/// record is returned untouched.
pub async fn recompute_attendance(
    conn: &mut MySqlConnection,
    clock: &OrgClock,
    employee_id: u64,
    work_date: NaiveDate,
) -> Result<AttendanceRecord, sqlx::Error> {
    if let Some(existing) = fetch_attendance(&mut *conn, employee_id, work_date).await? {
        if existing.is_locked {
            return Ok(existing);
        }
    }

    let expected = resolve_expected(&mut *conn, employee_id, work_date).await?;
    let punches =
        fetch_day_punches(&mut *conn, employee_id, clock.day_window(work_date)).await?;
    let summary = aggregate::aggregate_day(clock, &punches, &expected);

    upsert_attendance(&mut *conn, employee_id, work_date, &summary).await?;

    fetch_attendance(conn, employee_id, work_date)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Day-lock pass: finalize every unlocked record in the range. Days that
/// never saw a clock-out are marked INCOMPLETE. Returns the number of rows
/// finalized.
pub async fn lock_day_range(
    conn: &mut MySqlConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let records = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT * FROM attendance_records
        WHERE work_date >= ? AND work_date <= ? AND is_locked = 0
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    let mut locked = 0u64;
    for record in records {
        let status = aggregate::locked_status(record.status, record.actual_out_at.is_some());
        let result = sqlx::query(
            "UPDATE attendance_records SET status = ?, is_locked = 1 WHERE id = ? AND is_locked = 0",
        )
        .bind(status)
        .bind(record.id)
        .execute(&mut *conn)
        .await?;
        locked += result.rows_affected();
    }
    Ok(locked)
}
