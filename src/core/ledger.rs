use actix_web::http::StatusCode;
use chrono::NaiveDate;
use derive_more::Display;
use strum_macros::IntoStaticStr;

use crate::core::schedule::ExpectedShift;
use crate::model::punch::PunchType;

/// Every way a punch can be refused. The wire `error` field is the snake_case
/// name; nothing is rejected silently and no rejection mutates the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PunchRejection {
    #[display(fmt = "Username and password are required")]
    MissingCredentials,
    #[display(fmt = "Invalid credentials")]
    InvalidCredentials,
    #[display(fmt = "This account is not linked to an employee and cannot punch")]
    UserNotEligible,
    #[display(fmt = "Punching is not allowed from this address")]
    IpNotAllowed,
    #[display(fmt = "Unknown punch type")]
    InvalidPunchType,
    #[display(fmt = "Malformed date")]
    InvalidDate,
    #[display(fmt = "No shift is scheduled for you today")]
    NoShiftToday,
    #[display(fmt = "Too early to clock in for your shift")]
    TooEarly,
    #[display(fmt = "Your shift window has already ended")]
    TooLate,
    #[display(fmt = "Clock-in is only accepted for the current work day")]
    WrongDate,
    #[display(fmt = "You have already clocked out today")]
    AlreadyClockedOut,
    #[display(fmt = "Punch is out of order for today")]
    InvalidSequence,
}

impl PunchRejection {
    /// snake_case reason code used in response bodies.
    pub fn reason(&self) -> &'static str {
        (*self).into()
    }

    pub fn status(&self) -> StatusCode {
        use PunchRejection::*;
        match self {
            MissingCredentials | InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserNotEligible | IpNotAllowed => StatusCode::FORBIDDEN,
            InvalidPunchType | InvalidDate => StatusCode::BAD_REQUEST,
            NoShiftToday | TooEarly | TooLate | WrongDate | AlreadyClockedOut
            | InvalidSequence => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// The only punch accepted after `last`, if any. TIME_OUT is terminal for the
/// day; the chain allows exactly one break pair.
pub fn next_allowed(last: Option<PunchType>) -> Option<PunchType> {
    match last {
        None => Some(PunchType::TimeIn),
        Some(PunchType::TimeIn) => Some(PunchType::BreakIn),
        Some(PunchType::BreakIn) => Some(PunchType::BreakOut),
        Some(PunchType::BreakOut) => Some(PunchType::TimeOut),
        Some(PunchType::TimeOut) => None,
    }
}

/// A caller-supplied target date must agree with the bucket the punch instant
/// actually falls in. Sequence validation, the advisory lock, and the insert
/// all key on the target bucket, so an instant outside it would land in a
/// different day's chain than the one just validated.
pub fn validate_bucket(target: NaiveDate, punched: NaiveDate) -> Result<(), PunchRejection> {
    if target == punched {
        Ok(())
    } else {
        Err(PunchRejection::WrongDate)
    }
}

/// State-machine check keyed by the last punch of the employee's current
/// work-day bucket.
pub fn validate_sequence(
    last: Option<PunchType>,
    requested: PunchType,
) -> Result<(), PunchRejection> {
    match next_allowed(last) {
        None => Err(PunchRejection::AlreadyClockedOut),
        Some(expected) if expected == requested => Ok(()),
        Some(_) => Err(PunchRejection::InvalidSequence),
    }
}

/// TIME_IN-only scheduling gates, checked after the sequence check passes.
///
/// `minute_of_day` is raw elapsed minutes since the day started; for
/// spans_midnight shifts the window is compared unwrapped, so the late bound
/// is the stored end minute on the same day.
pub fn validate_time_in(
    expected: &ExpectedShift,
    minute_of_day: i64,
    target_is_today: bool,
) -> Result<(), PunchRejection> {
    if !target_is_today {
        return Err(PunchRejection::WrongDate);
    }
    let start = match expected.scheduled_start_minutes {
        Some(start) => start as i64,
        None => return Err(PunchRejection::NoShiftToday),
    };
    if minute_of_day < start {
        return Err(PunchRejection::TooEarly);
    }
    if let Some(end) = expected.scheduled_end_minutes {
        if minute_of_day > end as i64 {
            return Err(PunchRejection::TooLate);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schedule::ScheduleSource;

    fn window(start: Option<u16>, end: Option<u16>) -> ExpectedShift {
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
    fn full_chain_each_step_once() {
        let chain = [
            PunchType::TimeIn,
            PunchType::BreakIn,
            PunchType::BreakOut,
            PunchType::TimeOut,
        ];
        let mut last = None;
        for punch in chain {
            assert_eq!(validate_sequence(last, punch), Ok(()));
            last = Some(punch);
        }
        // A fifth punch of any type is rejected.
        for punch in chain {
            assert_eq!(
                validate_sequence(last, punch),
                Err(PunchRejection::AlreadyClockedOut)
            );
        }
    }

    #[test]
    fn out_of_order_punches_rejected() {
        assert_eq!(
            validate_sequence(None, PunchType::TimeOut),
            Err(PunchRejection::InvalidSequence)
        );
        assert_eq!(
            validate_sequence(None, PunchType::BreakIn),
            Err(PunchRejection::InvalidSequence)
        );
        assert_eq!(
            validate_sequence(Some(PunchType::TimeIn), PunchType::TimeIn),
            Err(PunchRejection::InvalidSequence)
        );
        assert_eq!(
            validate_sequence(Some(PunchType::BreakIn), PunchType::TimeOut),
            Err(PunchRejection::InvalidSequence)
        );
    }

    #[test]
    fn time_in_window_gates() {
        let shift = window(Some(540), Some(1080));
        assert_eq!(
            validate_time_in(&shift, 500, true),
            Err(PunchRejection::TooEarly)
        );
        assert_eq!(validate_time_in(&shift, 600, true), Ok(()));
        assert_eq!(validate_time_in(&shift, 540, true), Ok(()));
        assert_eq!(validate_time_in(&shift, 1080, true), Ok(()));
        assert_eq!(
            validate_time_in(&shift, 1081, true),
            Err(PunchRejection::TooLate)
        );
    }

    #[test]
    fn time_in_requires_today_and_a_shift() {
        let shift = window(Some(540), Some(1080));
        assert_eq!(
            validate_time_in(&shift, 600, false),
            Err(PunchRejection::WrongDate)
        );
        assert_eq!(
            validate_time_in(&window(None, None), 600, true),
            Err(PunchRejection::NoShiftToday)
        );
    }

    #[test]
    fn open_ended_window_never_too_late() {
        let shift = window(Some(540), None);
        assert_eq!(validate_time_in(&shift, 1439, true), Ok(()));
    }

    #[test]
    fn punch_instant_must_fall_in_target_bucket() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(validate_bucket(today, today), Ok(()));

        // A timestamp from yesterday cannot ride into today's bucket: today's
        // empty chain would accept a TIME_IN even though yesterday already
        // ended in TIME_OUT.
        assert_eq!(
            validate_bucket(today, yesterday),
            Err(PunchRejection::WrongDate)
        );
        // Nor the reverse, which would validate against yesterday's chain
        // while the row lands in today's window.
        assert_eq!(
            validate_bucket(yesterday, today),
            Err(PunchRejection::WrongDate)
        );
    }

    #[test]
    fn reason_codes_are_snake_case() {
        assert_eq!(PunchRejection::TooEarly.reason(), "too_early");
        assert_eq!(PunchRejection::IpNotAllowed.reason(), "ip_not_allowed");
        assert_eq!(
            PunchRejection::AlreadyClockedOut.reason(),
            "already_clocked_out"
        );
    }
}
