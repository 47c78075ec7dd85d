use chrono::{DateTime, Utc};

use crate::core::clock::OrgClock;
use crate::core::schedule::ExpectedShift;
use crate::model::attendance::AttendanceStatus;
use crate::model::punch::{PunchEvent, PunchType};

/// Field set the aggregator produces for one (employee, work_date); the store
/// layer upserts it into `attendance_records`. Pure function of the day's
/// punches and the expected shift, so recomputation is idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub status: AttendanceStatus,
    pub actual_in_at: Option<DateTime<Utc>>,
    pub actual_out_at: Option<DateTime<Utc>>,
    pub worked_minutes: Option<i64>,
    pub break_minutes: i64,
    pub break_count: u32,
    pub late_minutes: i64,
    pub undertime_minutes: i64,
    pub overtime_minutes_raw: i64,
}

/// Aggregates one day's punches against the expected shift.
///
/// `punches` must already be restricted to the day window; ordering is
/// normalized here. Break markers are toggles: whichever of BREAK_OUT /
/// BREAK_IN arrives while no break is open opens one, the next marker closes
/// it. An unclosed trailing break contributes nothing.
pub fn aggregate_day(
    clock: &OrgClock,
    punches: &[PunchEvent],
    expected: &ExpectedShift,
) -> DaySummary {
    let mut ordered: Vec<&PunchEvent> = punches.iter().collect();
    ordered.sort_by_key(|p| (p.punched_at, p.id));

    let actual_in_at = ordered
        .iter()
        .find(|p| p.punch_type == PunchType::TimeIn)
        .or_else(|| ordered.first())
        .map(|p| p.punched_at);

    let actual_out_at = ordered
        .iter()
        .rev()
        .find(|p| p.punch_type == PunchType::TimeOut)
        .map(|p| p.punched_at);

    let mut break_count = 0u32;
    let mut break_minutes = 0i64;
    let mut open_break: Option<DateTime<Utc>> = None;
    for punch in &ordered {
        if matches!(punch.punch_type, PunchType::BreakOut | PunchType::BreakIn) {
            match open_break.take() {
                None => open_break = Some(punch.punched_at),
                Some(opened_at) => {
                    break_count += 1;
                    break_minutes += (punch.punched_at - opened_at).num_minutes().max(0);
                }
            }
        }
    }

    let in_minute = actual_in_at.map(|at| clock.minute_of_day(at));
    let out_minute = actual_out_at.map(|at| clock.minute_of_day(at));
    let start = expected.scheduled_start_minutes.map(i64::from);
    let end = expected.scheduled_end_minutes.map(i64::from);

    let late_minutes = match (in_minute, start) {
        (Some(actual), Some(scheduled)) => (actual - scheduled).max(0),
        _ => 0,
    };
    let undertime_minutes = match (out_minute, end) {
        (Some(actual), Some(scheduled)) => (scheduled - actual).max(0),
        _ => 0,
    };
    let overtime_minutes_raw = match (out_minute, end) {
        (Some(actual), Some(scheduled)) => (actual - scheduled).max(0),
        _ => 0,
    };

    let worked_minutes = match (actual_in_at, actual_out_at) {
        (Some(in_at), Some(out_at)) => Some((out_at - in_at).num_minutes()),
        _ => None,
    };

    let status = if actual_in_at.is_none() && actual_out_at.is_none() {
        AttendanceStatus::Absent
    } else if late_minutes > 0 {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    };

    DaySummary {
        status,
        actual_in_at,
        actual_out_at,
        worked_minutes,
        break_minutes,
        break_count,
        late_minutes,
        undertime_minutes,
        overtime_minutes_raw,
    }
}

/// Day-lock status transition: any locked day without a clock-out is
/// INCOMPLETE; everything else keeps its computed status.
pub fn locked_status(current: AttendanceStatus, has_out: bool) -> AttendanceStatus {
    if has_out {
        current
    } else {
        AttendanceStatus::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::ScheduleSource;
    use crate::model::punch::PunchSource;
    use chrono::{Duration, TimeZone};

    fn clock() -> OrgClock {
        OrgClock::new(0)
    }

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap()
    }

    fn punch(id: u64, punch_type: PunchType, minute: i64) -> PunchEvent {
        PunchEvent {
            id,
            employee_id: 7,
            punched_at: day_start() + Duration::minutes(minute),
            punch_type,
            source: PunchSource::Kiosk,
        }
    }

    fn shift(start: Option<u16>, end: Option<u16>) -> ExpectedShift {
        ExpectedShift {
            shift: None,
            source: if start.is_some() {
                ScheduleSource::Pattern
            } else {
                ScheduleSource::None
            },
            scheduled_start_minutes: start,
            scheduled_end_minutes: end,
        }
    }

    #[test]
    fn break_pair_and_worked_minutes() {
        let punches = [
            punch(1, PunchType::TimeIn, 0),
            punch(2, PunchType::BreakOut, 120),
            punch(3, PunchType::BreakIn, 135),
            punch(4, PunchType::TimeOut, 480),
        ];
        let summary = aggregate_day(&clock(), &punches, &shift(None, None));
        assert_eq!(summary.break_count, 1);
        assert_eq!(summary.break_minutes, 15);
        assert_eq!(summary.worked_minutes, Some(480));
        assert_eq!(summary.status, AttendanceStatus::Present);
    }

    #[test]
    fn break_markers_toggle_in_either_order() {
        // Strict BREAK_IN-then-BREAK_OUT ledger order pairs the same way.
        let punches = [
            punch(1, PunchType::TimeIn, 540),
            punch(2, PunchType::BreakIn, 720),
            punch(3, PunchType::BreakOut, 765),
            punch(4, PunchType::TimeOut, 1080),
        ];
        let summary = aggregate_day(&clock(), &punches, &shift(Some(540), Some(1080)));
        assert_eq!(summary.break_count, 1);
        assert_eq!(summary.break_minutes, 45);
    }

    #[test]
    fn unclosed_trailing_break_contributes_nothing() {
        let punches = [
            punch(1, PunchType::TimeIn, 540),
            punch(2, PunchType::BreakOut, 720),
        ];
        let summary = aggregate_day(&clock(), &punches, &shift(Some(540), Some(1080)));
        assert_eq!(summary.break_count, 0);
        assert_eq!(summary.break_minutes, 0);
    }

    #[test]
    fn lateness_clamped_at_zero() {
        let on_time = aggregate_day(
            &clock(),
            &[punch(1, PunchType::TimeIn, 500)],
            &shift(Some(540), Some(1080)),
        );
        assert_eq!(on_time.late_minutes, 0);
        assert_eq!(on_time.status, AttendanceStatus::Present);

        let late = aggregate_day(
            &clock(),
            &[punch(1, PunchType::TimeIn, 600)],
            &shift(Some(540), Some(1080)),
        );
        assert_eq!(late.late_minutes, 60);
        assert_eq!(late.status, AttendanceStatus::Late);
    }

    #[test]
    fn undertime_and_overtime_from_scheduled_end() {
        let early_leaver = aggregate_day(
            &clock(),
            &[
                punch(1, PunchType::TimeIn, 540),
                punch(2, PunchType::TimeOut, 1000),
            ],
            &shift(Some(540), Some(1080)),
        );
        assert_eq!(early_leaver.undertime_minutes, 80);
        assert_eq!(early_leaver.overtime_minutes_raw, 0);

        let stayer = aggregate_day(
            &clock(),
            &[
                punch(1, PunchType::TimeIn, 540),
                punch(2, PunchType::TimeOut, 1140),
            ],
            &shift(Some(540), Some(1080)),
        );
        assert_eq!(stayer.undertime_minutes, 0);
        assert_eq!(stayer.overtime_minutes_raw, 60);
    }

    #[test]
    fn no_punches_is_absent() {
        let summary = aggregate_day(&clock(), &[], &shift(Some(540), Some(1080)));
        assert_eq!(summary.status, AttendanceStatus::Absent);
        assert_eq!(summary.actual_in_at, None);
        assert_eq!(summary.worked_minutes, None);
        assert_eq!(summary.late_minutes, 0);
    }

    #[test]
    fn missing_time_in_falls_back_to_earliest_punch() {
        // Legacy data may start the day with a stray break marker.
        let punches = [
            punch(1, PunchType::BreakOut, 100),
            punch(2, PunchType::TimeOut, 480),
        ];
        let summary = aggregate_day(&clock(), &punches, &shift(Some(60), Some(540)));
        assert_eq!(
            summary.actual_in_at,
            Some(day_start() + Duration::minutes(100))
        );
        assert_eq!(summary.late_minutes, 40);
    }

    #[test]
    fn recompute_is_idempotent() {
        let punches = [
            punch(1, PunchType::TimeIn, 600),
            punch(2, PunchType::BreakOut, 720),
            punch(3, PunchType::BreakIn, 750),
            punch(4, PunchType::TimeOut, 1100),
        ];
        let expected = shift(Some(540), Some(1080));
        let first = aggregate_day(&clock(), &punches, &expected);
        let second = aggregate_day(&clock(), &punches, &expected);
        assert_eq!(first, second);
    }

    #[test]
    fn unsorted_input_is_normalized() {
        let punches = [
            punch(4, PunchType::TimeOut, 480),
            punch(2, PunchType::BreakOut, 120),
            punch(1, PunchType::TimeIn, 0),
            punch(3, PunchType::BreakIn, 135),
        ];
        let summary = aggregate_day(&clock(), &punches, &shift(None, None));
        assert_eq!(summary.break_minutes, 15);
        assert_eq!(summary.worked_minutes, Some(480));
    }

    #[test]
    fn locked_status_forces_incomplete_without_out() {
        assert_eq!(
            locked_status(AttendanceStatus::Late, false),
            AttendanceStatus::Incomplete
        );
        assert_eq!(
            locked_status(AttendanceStatus::Late, true),
            AttendanceStatus::Late
        );
    }
}
