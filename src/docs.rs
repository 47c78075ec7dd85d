use crate::api::attendance::{LockRequest, LockResponse, RecomputeRequest};
use crate::api::punch::{KioskPunchRequest, PunchRequest, PunchResponse, PunchStatusResponse};
use crate::api::schedule::{CreatePatternAssignment, CreateWeeklyPattern, PutShiftOverride};
use crate::api::shift::ShiftTemplateInput;
use crate::core::schedule::{ExpectedShift, ScheduleSource};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::punch::{PunchEvent, PunchSource, PunchType};
use crate::model::schedule::{PatternAssignment, ShiftOverride, WeeklyPattern};
use crate::model::shift::ShiftTemplate;
use utoipa::openapi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## Employee Time Tracking Service

Resolves which shift an employee is expected to work, records validated clock
events, and derives daily attendance summaries.

### Key Features
- **Shift Catalog**: reusable shift templates with derived break and paid-hour totals
- **Weekly Patterns & Overrides**: per-day override > latest effective pattern > none
- **Punch Ledger**: TIME_IN / BREAK_IN / BREAK_OUT / TIME_OUT state machine with
  scheduling-window gates; every rejection carries a reason code
- **Attendance**: per-day summary (lateness, undertime, overtime, breaks) with
  end-of-day locking

### Security
Self-service endpoints use **JWT Bearer authentication**; kiosk punches carry
employee credentials in the request body and are IP- and rate-limited.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::punch::submit_punch,
        crate::api::punch::submit_kiosk_punch,
        crate::api::punch::punch_status,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,

        crate::api::schedule::create_pattern,
        crate::api::schedule::list_patterns,
        crate::api::schedule::create_assignment,
        crate::api::schedule::put_override,

        crate::api::attendance::get_attendance,
        crate::api::attendance::recompute,
        crate::api::attendance::lock_days
    ),
    components(
        schemas(
            PunchRequest,
            KioskPunchRequest,
            PunchResponse,
            PunchStatusResponse,
            PunchEvent,
            PunchType,
            PunchSource,
            ShiftTemplate,
            ShiftTemplateInput,
            WeeklyPattern,
            CreateWeeklyPattern,
            PatternAssignment,
            CreatePatternAssignment,
            ShiftOverride,
            PutShiftOverride,
            ExpectedShift,
            ScheduleSource,
            AttendanceRecord,
            AttendanceStatus,
            RecomputeRequest,
            LockRequest,
            LockResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Punch", description = "Clock-event submission and day status"),
        (name = "Shift", description = "Shift template catalog"),
        (name = "Schedule", description = "Weekly patterns, assignments, and overrides"),
        (name = "Attendance", description = "Daily summaries, recompute, and day lock"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
