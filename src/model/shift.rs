use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reusable shift definition. Minute-of-day fields are wall-clock minutes in the
/// organization's fixed offset; `unpaid_break_minutes` and `paid_hours_per_day`
/// are derived on create/update and never written by callers directly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "code": "DAY-0900",
        "name": "Day shift",
        "start_minute": 540,
        "end_minute": 1080,
        "spans_midnight": false,
        "break_start_minute": 720,
        "break_end_minute": 780,
        "unpaid_break_minutes": 60,
        "paid_hours_per_day": 8.0
    })
)]
pub struct ShiftTemplate {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "DAY-0900")]
    pub code: String,

    #[schema(example = "Day shift")]
    pub name: String,

    /// Scheduled start, minutes after local midnight (0..=1439).
    #[schema(example = 540)]
    pub start_minute: u16,

    /// Scheduled end, minutes after local midnight (0..=1439).
    #[schema(example = 1080)]
    pub end_minute: u16,

    /// True when the shift ends on the following calendar day.
    #[schema(example = false)]
    pub spans_midnight: bool,

    #[schema(example = 720, nullable = true)]
    pub break_start_minute: Option<u16>,

    #[schema(example = 780, nullable = true)]
    pub break_end_minute: Option<u16>,

    #[schema(example = 60)]
    pub unpaid_break_minutes: u16,

    #[schema(example = 8.0)]
    pub paid_hours_per_day: f64,
}
