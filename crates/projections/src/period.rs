//! Calendar periods and their instants in a business time zone.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::{ProjectionError, Result};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportPeriod {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ProjectionError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Half-open instant bounds `[start of first day, start of day after last)`
    /// in `tz`.
    pub fn bounds(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        let after_end = self.end.succ_opt().unwrap_or(self.end);
        (day_start(self.start, tz), day_start(after_end, tz))
    }

    pub fn contains(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        let (from, until) = self.bounds(tz);
        from <= instant && instant < until
    }
}

/// Local midnight of `date` in `tz`.
///
/// Where midnight falls in a DST gap the naive time is read as UTC.
pub fn day_start(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = ReportPeriod::new(date(2024, 5, 2), date(2024, 5, 1)).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidRange { .. }));
    }

    #[test]
    fn single_day_range_is_allowed() {
        let period = ReportPeriod::new(date(2024, 5, 1), date(2024, 5, 1)).unwrap();
        assert_eq!(period, ReportPeriod::day(date(2024, 5, 1)));
    }

    #[test]
    fn utc_bounds_cover_whole_days() {
        let (from, until) = ReportPeriod::new(date(2024, 5, 1), date(2024, 5, 3))
            .unwrap()
            .bounds(Tz::UTC);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn zone_shifts_day_boundaries() {
        let period = ReportPeriod::day(date(2024, 5, 1));
        let (from, until) = period.bounds(chrono_tz::Asia::Ho_Chi_Minh);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 4, 30, 17, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 5, 1, 17, 0, 0).unwrap());

        let late_evening_utc = Utc.with_ymd_and_hms(2024, 4, 30, 18, 0, 0).unwrap();
        assert!(period.contains(late_evening_utc, chrono_tz::Asia::Ho_Chi_Minh));
        assert!(!period.contains(late_evening_utc, Tz::UTC));
    }

    #[test]
    fn upper_bound_is_exclusive() {
        let period = ReportPeriod::day(date(2024, 5, 1));
        let next_midnight = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        assert!(!period.contains(next_midnight, Tz::UTC));
    }

    #[test]
    fn dst_day_is_shorter() {
        let tz = chrono_tz::Europe::Berlin;
        let (from, until) = ReportPeriod::day(date(2024, 3, 31)).bounds(tz);
        assert_eq!((until - from).num_hours(), 23);
    }
}
