use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Day-bucketing clock for the organization's single site. One fixed UTC
/// offset, no daylight-saving transitions; every punch and attendance record
/// is bucketed into the `[start_of_day, end_of_day)` window this produces.
#[derive(Debug, Clone, Copy)]
pub struct OrgClock {
    offset: FixedOffset,
}

impl OrgClock {
    /// `utc_offset_minutes` east of UTC, e.g. 480 for UTC+8.
    /// Panics on an out-of-range offset; validated once at startup.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .expect("UTC_OFFSET_MINUTES out of range");
        Self { offset }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Calendar date the instant falls on in the organizational offset.
    pub fn work_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// `[start, end)` window of a work date, as UTC instants.
    pub fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start =
            (local_midnight - Duration::seconds(self.offset.local_minus_utc() as i64)).and_utc();
        (start, start + Duration::hours(24))
    }

    /// 00:00:00 of the instant's work date, as a UTC instant.
    pub fn start_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.day_window(self.work_date(at)).0
    }

    /// Exclusive upper bound of the instant's work date.
    pub fn end_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        self.day_window(self.work_date(at)).1
    }

    /// Whole minutes elapsed since the work day started, 0..=1439.
    pub fn minute_of_day(&self, at: DateTime<Utc>) -> i64 {
        (at - self.start_of_day(at)).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn buckets_by_local_date_not_utc_date() {
        // UTC+8: 2024-03-01 18:00 UTC is already 2024-03-02 locally.
        let clock = OrgClock::new(480);
        assert_eq!(
            clock.work_date(utc(2024, 3, 1, 18, 0)),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(
            clock.work_date(utc(2024, 3, 1, 15, 59)),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn day_window_is_24h_half_open() {
        let clock = OrgClock::new(480);
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let (start, end) = clock.day_window(date);

        // Local midnight of UTC+8 is 16:00 UTC the previous day.
        assert_eq!(start, utc(2024, 3, 1, 16, 0));
        assert_eq!(end, utc(2024, 3, 2, 16, 0));
        assert_eq!(clock.work_date(start), date);
        assert_ne!(clock.work_date(end), date);
    }

    #[test]
    fn minute_of_day_counts_from_local_midnight() {
        let clock = OrgClock::new(480);
        // 01:00 UTC = 09:00 local = minute 540.
        assert_eq!(clock.minute_of_day(utc(2024, 3, 2, 1, 0)), 540);
        assert_eq!(clock.minute_of_day(utc(2024, 3, 1, 16, 0)), 0);
        assert_eq!(clock.minute_of_day(utc(2024, 3, 2, 15, 59)), 1439);
    }

    #[test]
    fn negative_offset_works() {
        let clock = OrgClock::new(-300); // UTC-5
        assert_eq!(
            clock.work_date(utc(2024, 3, 2, 3, 0)),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        let (start, _) = clock.day_window(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(start, utc(2024, 3, 1, 5, 0));
    }
}
