use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// The four clock-event kinds, in the order the daily chain accepts them.
/// BREAK_OUT / BREAK_IN are stored verbatim; the aggregator treats them as
/// interchangeable toggle markers when pairing breaks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
    Display,
    EnumString,
)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchType {
    TimeIn,
    BreakOut,
    BreakIn,
    TimeOut,
}

/// Where the punch came from. KIOSK and WEB_SELF pass the transport IP gate;
/// MANUAL is an HR/Admin correction and bypasses it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
    Display,
    EnumString,
)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchSource {
    Kiosk,
    WebSelf,
    Manual,
}

/// One appended clock event. Immutable once written; corrections go through
/// the administrative path, never through updates here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PunchEvent {
    pub id: u64,
    pub employee_id: u64,

    /// The instant the punch took effect (UTC).
    #[schema(value_type = String, format = "date-time")]
    pub punched_at: DateTime<Utc>,

    pub punch_type: PunchType,
    pub source: PunchSource,
}
