use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Weekly rotation: one nullable shift-template slot per weekday (null = day off).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WeeklyPattern {
    #[schema(example = 1)]
    pub id: u64,

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

impl WeeklyPattern {
    /// Shift-template slot for a weekday; `None` means a day off.
    pub fn slot_for(&self, weekday: Weekday) -> Option<u64> {
        match weekday {
            Weekday::Mon => self.mon_shift_id,
            Weekday::Tue => self.tue_shift_id,
            Weekday::Wed => self.wed_shift_id,
            Weekday::Thu => self.thu_shift_id,
            Weekday::Fri => self.fri_shift_id,
            Weekday::Sat => self.sat_shift_id,
            Weekday::Sun => self.sun_shift_id,
        }
    }
}

/// Links an employee to a weekly pattern from `effective_date` onward.
/// The assignment in force for a date is the one with the greatest
/// `effective_date <= date`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PatternAssignment {
    pub id: u64,
    pub employee_id: u64,
    pub pattern_id: u64,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub effective_date: NaiveDate,

    #[schema(example = "initial rota", nullable = true)]
    pub reason: Option<String>,
}

/// Single-day exception; wins over any pattern assignment.
/// A null `shift_id` is an explicit day off, not "no override".
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftOverride {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2024-02-10", value_type = String, format = "date")]
    pub work_date: NaiveDate,

    pub shift_id: Option<u64>,

    #[schema(example = "holiday swap")]
    pub source_tag: String,
}
