use derive_more::Display;

/// Validation failures for shift-template input. Mapped to 400s at the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CatalogError {
    #[display(fmt = "time must be HH:MM between 00:00 and 23:59: {}", _0)]
    InvalidTime(String),
    #[display(fmt = "end must be after start unless the shift spans midnight")]
    EndNotAfterStart,
    #[display(fmt = "break window requires both a start and an end")]
    HalfOpenBreak,
}

/// Caller-supplied shape of a shift, already in minute-of-day form.
#[derive(Debug, Clone, Copy)]
pub struct ShiftSpec {
    pub start_minute: u16,
    pub end_minute: u16,
    pub spans_midnight: bool,
    pub break_start_minute: Option<u16>,
    pub break_end_minute: Option<u16>,
}

/// Derived fields written alongside the caller-supplied ones on create/update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftDerived {
    pub total_span_minutes: u32,
    pub unpaid_break_minutes: u16,
    pub paid_hours_per_day: f64,
}

/// Strict "HH:MM" to minute-of-day (0..=1439).
pub fn parse_hhmm(text: &str) -> Result<u16, CatalogError> {
    let invalid = || CatalogError::InvalidTime(text.to_string());

    let (h, m) = text.split_once(':').ok_or_else(invalid)?;
    if h.len() != 2 || m.len() != 2 {
        return Err(invalid());
    }
    let hours: u16 = h.parse().map_err(|_| invalid())?;
    let minutes: u16 = m.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Validates a spec and computes its derived totals.
///
/// The span adds 1440 when the shift wraps past midnight, and so does the
/// break end when it lands before the break start. Break overlap is clipped
/// to the shift span, so a break lying outside the shift contributes zero.
pub fn derive(spec: &ShiftSpec) -> Result<ShiftDerived, CatalogError> {
    if spec.end_minute <= spec.start_minute && !spec.spans_midnight {
        return Err(CatalogError::EndNotAfterStart);
    }

    let start = spec.start_minute as u32;
    let end = if spec.spans_midnight && spec.end_minute <= spec.start_minute {
        spec.end_minute as u32 + 1440
    } else {
        spec.end_minute as u32
    };
    let total_span_minutes = end - start;

    let unpaid_break_minutes = match (spec.break_start_minute, spec.break_end_minute) {
        (None, None) => 0,
        (Some(bs), Some(be)) => {
            // Unwrap the break onto the same axis as the shift: a break
            // starting "before" the shift start belongs to the post-midnight
            // leg of an overnight shift.
            let bs = if (bs as u32) < start { bs as u32 + 1440 } else { bs as u32 };
            let be = if (be as u32) < bs { be as u32 + 1440 } else { be as u32 };
            let overlap = be.min(end).saturating_sub(bs.max(start));
            overlap.min(total_span_minutes) as u16
        }
        _ => return Err(CatalogError::HalfOpenBreak),
    };

    let paid_minutes = total_span_minutes - unpaid_break_minutes as u32;
    let paid_hours_per_day = (paid_minutes as f64 / 60.0 * 100.0).round() / 100.0;

    Ok(ShiftDerived {
        total_span_minutes,
        unpaid_break_minutes,
        paid_hours_per_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: u16, end: u16, wraps: bool, brk: Option<(u16, u16)>) -> ShiftSpec {
        ShiftSpec {
            start_minute: start,
            end_minute: end,
            spans_midnight: wraps,
            break_start_minute: brk.map(|(s, _)| s),
            break_end_minute: brk.map(|(_, e)| e),
        }
    }

    #[test]
    fn parses_wall_clock_times() {
        assert_eq!(parse_hhmm("09:00"), Ok(540));
        assert_eq!(parse_hhmm("00:00"), Ok(0));
        assert_eq!(parse_hhmm("23:59"), Ok(1439));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("9:00").is_err());
        assert!(parse_hhmm("09:60").is_err());
        assert!(parse_hhmm("0900").is_err());
    }

    #[test]
    fn day_shift_with_lunch() {
        let d = derive(&spec(540, 1080, false, Some((720, 780)))).unwrap();
        assert_eq!(d.total_span_minutes, 540);
        assert_eq!(d.unpaid_break_minutes, 60);
        assert_eq!(d.paid_hours_per_day, 8.0);
    }

    #[test]
    fn rejects_end_before_start_without_wrap() {
        assert_eq!(
            derive(&spec(1080, 540, false, None)),
            Err(CatalogError::EndNotAfterStart)
        );
    }

    #[test]
    fn overnight_span_adds_a_day() {
        // 22:00 -> 06:00 = 8h.
        let d = derive(&spec(1320, 360, true, None)).unwrap();
        assert_eq!(d.total_span_minutes, 480);
        assert_eq!(d.paid_hours_per_day, 8.0);
    }

    #[test]
    fn overnight_break_after_midnight_is_counted() {
        // 22:00 -> 06:00, break 02:00 -> 02:30.
        let d = derive(&spec(1320, 360, true, Some((120, 150)))).unwrap();
        assert_eq!(d.unpaid_break_minutes, 30);
        assert_eq!(d.paid_hours_per_day, 7.5);
    }

    #[test]
    fn break_outside_shift_is_clipped_to_zero() {
        // 09:00 -> 18:00, "break" 19:00 -> 20:00.
        let d = derive(&spec(540, 1080, false, Some((1140, 1200)))).unwrap();
        assert_eq!(d.unpaid_break_minutes, 0);
    }

    #[test]
    fn paid_hours_round_to_two_decimals() {
        // 09:00 -> 17:05, break 50 min: 435 paid minutes = 7.25h.
        let d = derive(&spec(540, 1025, false, Some((720, 770)))).unwrap();
        assert_eq!(d.paid_hours_per_day, 7.25);
        // 475 minutes -> 7.92, not 7.9166...
        let d = derive(&spec(540, 1025, false, Some((720, 730)))).unwrap();
        assert_eq!(d.paid_hours_per_day, 7.92);
    }

    #[test]
    fn half_open_break_rejected() {
        let mut s = spec(540, 1080, false, Some((720, 780)));
        s.break_end_minute = None;
        assert_eq!(derive(&s), Err(CatalogError::HalfOpenBreak));
    }
}
