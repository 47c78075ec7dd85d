use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

/// Daily outcome. LATE wins over PRESENT whenever late minutes are positive;
/// INCOMPLETE is only ever set by the day-lock pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, Display,
)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Incomplete,
}

/// Derived per-(employee, work_date) summary, recomputed from the day's punches
/// and the expected shift. Cached, not authoritative: the punch ledger is.
/// Once `is_locked` is set the record is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2024-02-10", value_type = String, format = "date")]
    pub work_date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub actual_in_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub actual_out_at: Option<DateTime<Utc>>,

    /// Minutes between first in and last out; null until both exist.
    pub worked_minutes: Option<i64>,

    pub break_minutes: i64,
    pub break_count: u32,

    /// Clamped at zero; an early arrival is never negative lateness.
    pub late_minutes: i64,
    pub undertime_minutes: i64,

    /// Raw overshoot past scheduled end. Approval/payroll treatment is out of scope.
    pub overtime_minutes_raw: i64,

    pub is_locked: bool,
}
