use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::model::schedule::{PatternAssignment, ShiftOverride, WeeklyPattern};
use crate::model::shift::ShiftTemplate;

/// Which rule produced the expected shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleSource {
    Override,
    Pattern,
    None,
}

/// Resolution result for one (employee, date). `shift: None` with
/// `source: Override` is an explicit day off; with `source: None` the employee
/// simply has no schedule on record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExpectedShift {
    pub shift: Option<ShiftTemplate>,
    pub source: ScheduleSource,
    pub scheduled_start_minutes: Option<u16>,
    pub scheduled_end_minutes: Option<u16>,
}

impl ExpectedShift {
    fn none() -> Self {
        Self {
            shift: None,
            source: ScheduleSource::None,
            scheduled_start_minutes: None,
            scheduled_end_minutes: None,
        }
    }

    fn from_slot(slot: Option<ShiftTemplate>, source: ScheduleSource) -> Self {
        // Scheduled minutes are the template's stored fields as-is; overnight
        // shifts are not unwrapped here (the TIME_IN window gate compares raw
        // minute-of-day values).
        let (start, end) = match &slot {
            Some(t) => (Some(t.start_minute), Some(t.end_minute)),
            None => (None, None),
        };
        Self {
            shift: slot,
            source,
            scheduled_start_minutes: start,
            scheduled_end_minutes: end,
        }
    }
}

/// One precedence rule: returns `Some(slot)` when it applies to the date,
/// where the slot itself may still be an explicit day off.
type Strategy =
    fn(NaiveDate, Option<&ShiftOverride>, &[(PatternAssignment, WeeklyPattern)])
        -> Option<(Option<u64>, ScheduleSource)>;

/// Highest precedence wins; order is the whole contract.
const STRATEGIES: [Strategy; 2] = [override_slot, pattern_slot];

fn override_slot(
    date: NaiveDate,
    override_row: Option<&ShiftOverride>,
    _assignments: &[(PatternAssignment, WeeklyPattern)],
) -> Option<(Option<u64>, ScheduleSource)> {
    let row = override_row.filter(|o| o.work_date == date)?;
    Some((row.shift_id, ScheduleSource::Override))
}

fn pattern_slot(
    date: NaiveDate,
    _override_row: Option<&ShiftOverride>,
    assignments: &[(PatternAssignment, WeeklyPattern)],
) -> Option<(Option<u64>, ScheduleSource)> {
    let (_, pattern) = assignments
        .iter()
        .filter(|(a, _)| a.effective_date <= date)
        .max_by_key(|(a, _)| a.effective_date)?;
    Some((pattern.slot_for(date.weekday()), ScheduleSource::Pattern))
}

/// Resolves the expected shift for a date from pre-fetched rows.
/// `template_by_id` supplies the shift templates the winning slot refers to;
/// a dangling reference degrades to "no shift" rather than failing.
pub fn resolve_expected_shift(
    date: NaiveDate,
    override_row: Option<&ShiftOverride>,
    assignments: &[(PatternAssignment, WeeklyPattern)],
    template_by_id: impl Fn(u64) -> Option<ShiftTemplate>,
) -> ExpectedShift {
    for strategy in STRATEGIES {
        if let Some((slot, source)) = strategy(date, override_row, assignments) {
            return ExpectedShift::from_slot(slot.and_then(&template_by_id), source);
        }
    }
    ExpectedShift::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: u64, start: u16, end: u16) -> ShiftTemplate {
        ShiftTemplate {
            id,
            code: format!("S{id}"),
            name: format!("Shift {id}"),
            start_minute: start,
            end_minute: end,
            spans_midnight: false,
            break_start_minute: None,
            break_end_minute: None,
            unpaid_break_minutes: 0,
            paid_hours_per_day: (end - start) as f64 / 60.0,
        }
    }

    fn pattern_all_days(id: u64, shift_id: u64) -> WeeklyPattern {
        WeeklyPattern {
            id,
            code: format!("P{id}"),
            name: format!("Pattern {id}"),
            mon_shift_id: Some(shift_id),
            tue_shift_id: Some(shift_id),
            wed_shift_id: Some(shift_id),
            thu_shift_id: Some(shift_id),
            fri_shift_id: Some(shift_id),
            sat_shift_id: Some(shift_id),
            sun_shift_id: Some(shift_id),
        }
    }

    fn assignment(pattern_id: u64, effective: NaiveDate) -> PatternAssignment {
        PatternAssignment {
            id: 1,
            employee_id: 7,
            pattern_id,
            effective_date: effective,
            reason: None,
        }
    }

    fn lookup(templates: Vec<ShiftTemplate>) -> impl Fn(u64) -> Option<ShiftTemplate> {
        move |id| templates.iter().find(|t| t.id == id).cloned()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn override_beats_pattern() {
        let shift_a = template(1, 540, 1080);
        let shift_b = template(2, 600, 1140);
        let rows = vec![(
            assignment(10, date(2024, 1, 1)),
            pattern_all_days(10, shift_a.id),
        )];
        let ov = ShiftOverride {
            id: 1,
            employee_id: 7,
            work_date: date(2024, 2, 10),
            shift_id: Some(shift_b.id),
            source_tag: "swap".into(),
        };
        let find = lookup(vec![shift_a.clone(), shift_b.clone()]);

        let on_override_day =
            resolve_expected_shift(date(2024, 2, 10), Some(&ov), &rows, &find);
        assert_eq!(on_override_day.source, ScheduleSource::Override);
        assert_eq!(on_override_day.shift.as_ref().map(|s| s.id), Some(shift_b.id));

        let day_before = resolve_expected_shift(date(2024, 2, 9), None, &rows, &find);
        assert_eq!(day_before.source, ScheduleSource::Pattern);
        assert_eq!(day_before.shift.as_ref().map(|s| s.id), Some(shift_a.id));
    }

    #[test]
    fn override_day_off_is_still_an_override() {
        let shift_a = template(1, 540, 1080);
        let rows = vec![(
            assignment(10, date(2024, 1, 1)),
            pattern_all_days(10, shift_a.id),
        )];
        let ov = ShiftOverride {
            id: 1,
            employee_id: 7,
            work_date: date(2024, 2, 10),
            shift_id: None,
            source_tag: "forced off".into(),
        };

        let resolved =
            resolve_expected_shift(date(2024, 2, 10), Some(&ov), &rows, lookup(vec![shift_a]));
        assert_eq!(resolved.source, ScheduleSource::Override);
        assert!(resolved.shift.is_none());
        assert!(resolved.scheduled_start_minutes.is_none());
    }

    #[test]
    fn latest_effective_assignment_wins() {
        let shift_a = template(1, 540, 1080);
        let shift_b = template(2, 600, 1140);
        let rows = vec![
            (
                assignment(10, date(2024, 1, 1)),
                pattern_all_days(10, shift_a.id),
            ),
            (
                assignment(20, date(2024, 2, 1)),
                pattern_all_days(20, shift_b.id),
            ),
        ];
        let find = lookup(vec![shift_a.clone(), shift_b.clone()]);

        let jan = resolve_expected_shift(date(2024, 1, 15), None, &rows, &find);
        assert_eq!(jan.shift.as_ref().map(|s| s.id), Some(shift_a.id));

        let feb = resolve_expected_shift(date(2024, 2, 15), None, &rows, &find);
        assert_eq!(feb.shift.as_ref().map(|s| s.id), Some(shift_b.id));
    }

    #[test]
    fn future_assignment_does_not_apply() {
        let shift_a = template(1, 540, 1080);
        let rows = vec![(
            assignment(10, date(2024, 6, 1)),
            pattern_all_days(10, shift_a.id),
        )];

        let resolved =
            resolve_expected_shift(date(2024, 1, 15), None, &rows, lookup(vec![shift_a]));
        assert_eq!(resolved.source, ScheduleSource::None);
        assert!(resolved.shift.is_none());
    }

    #[test]
    fn pattern_day_off_slot_resolves_to_no_shift() {
        let shift_a = template(1, 540, 1080);
        let mut pattern = pattern_all_days(10, shift_a.id);
        pattern.sat_shift_id = None;
        pattern.sun_shift_id = None;
        let rows = vec![(assignment(10, date(2024, 1, 1)), pattern)];
        let find = lookup(vec![shift_a]);

        // 2024-02-10 is a Saturday.
        let sat = resolve_expected_shift(date(2024, 2, 10), None, &rows, &find);
        assert_eq!(sat.source, ScheduleSource::Pattern);
        assert!(sat.shift.is_none());

        let fri = resolve_expected_shift(date(2024, 2, 9), None, &rows, &find);
        assert!(fri.shift.is_some());
        assert_eq!(sat.scheduled_start_minutes, None);
        assert_eq!(fri.scheduled_start_minutes, Some(540));
    }
}
