use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Europe::London;
use chrono_tz::Tz;

/// The scoring week: Monday 00:00:00 through Sunday 23:59:59 in the fixed
/// scoring zone (Europe/London).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl WeekWindow {
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// True when an event's `[start, end]` date range intersects the window.
    pub fn intersects(&self, event_start: NaiveDate, event_end: NaiveDate) -> bool {
        event_start <= self.end_date() && event_end >= self.start_date()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }
}

/// Compute the scoring week containing `now`.
///
/// Pure and deterministic: any `now` within the same London calendar week
/// yields an identical window, which makes backfill and dry-run invocations
/// with arbitrary timestamps safe.
pub fn scoring_week(now: DateTime<Utc>) -> WeekWindow {
    let local = now.with_timezone(&London);
    let monday = local.date_naive() - Duration::days(local.weekday().num_days_from_monday() as i64);
    window_for_monday(monday)
}

/// Scoring week for the week containing an arbitrary date (backfill entry
/// point; the date needn't be a Monday).
pub fn scoring_week_for_date(date: NaiveDate) -> WeekWindow {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    window_for_monday(monday)
}

fn window_for_monday(monday: NaiveDate) -> WeekWindow {
    let sunday = monday + Duration::days(6);

    // London DST transitions happen at 01:00/02:00, so midnight and 23:59:59
    // always exist; `earliest`/`latest` keep this total anyway.
    let start = monday
        .and_hms_opt(0, 0, 0)
        .expect("valid naive time")
        .and_local_timezone(London)
        .earliest()
        .expect("Monday midnight exists in Europe/London");
    let end = sunday
        .and_hms_opt(23, 59, 59)
        .expect("valid naive time")
        .and_local_timezone(London)
        .latest()
        .expect("Sunday 23:59:59 exists in Europe/London");

    WeekWindow { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn window_runs_monday_to_sunday() {
        // 2026-07-16 is a Thursday.
        let w = scoring_week(utc(2026, 7, 16, 12));
        assert_eq!(w.start.weekday(), Weekday::Mon);
        assert_eq!(w.end.weekday(), Weekday::Sun);
        assert_eq!(w.start_date(), NaiveDate::from_ymd_opt(2026, 7, 13).unwrap());
        assert_eq!(w.end_date(), NaiveDate::from_ymd_opt(2026, 7, 19).unwrap());
    }

    #[test]
    fn any_now_in_the_same_week_gives_the_same_window() {
        let a = scoring_week(utc(2026, 7, 13, 0));
        let b = scoring_week(utc(2026, 7, 16, 9));
        let c = scoring_week(utc(2026, 7, 19, 23));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn utc_evening_sunday_can_already_be_london_monday() {
        // 2026-06-28 23:30 UTC is 00:30 Monday in London (BST).
        let w = scoring_week(utc(2026, 6, 28, 23));
        assert_eq!(w.start_date(), NaiveDate::from_ymd_opt(2026, 6, 29).unwrap());
    }

    #[test]
    fn dst_transition_weeks_keep_local_boundaries() {
        // Clocks go forward in London on 2026-03-29.
        let spring = scoring_week(utc(2026, 3, 27, 12));
        assert_eq!(spring.start.weekday(), Weekday::Mon);
        assert_eq!(
            spring.end_date(),
            NaiveDate::from_ymd_opt(2026, 3, 29).unwrap()
        );

        // Clocks go back on 2025-10-26.
        let autumn = scoring_week(utc(2025, 10, 24, 12));
        assert_eq!(autumn.start.weekday(), Weekday::Mon);
        assert_eq!(
            autumn.end_date(),
            NaiveDate::from_ymd_opt(2025, 10, 26).unwrap()
        );
    }

    #[test]
    fn backfill_date_resolves_to_its_week() {
        let w = scoring_week_for_date(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        assert_eq!(w.start_date(), NaiveDate::from_ymd_opt(2025, 4, 7).unwrap());
        assert_eq!(w.end_date(), NaiveDate::from_ymd_opt(2025, 4, 13).unwrap());
    }

    #[test]
    fn intersection_covers_partial_overlap() {
        let w = scoring_week(utc(2026, 7, 16, 12));
        let d = |m, day| NaiveDate::from_ymd_opt(2026, m, day).unwrap();
        assert!(w.intersects(d(7, 16), d(7, 19)));
        assert!(w.intersects(d(7, 10), d(7, 13))); // ends on window start
        assert!(w.intersects(d(7, 19), d(7, 22))); // starts on window end
        assert!(!w.intersects(d(7, 20), d(7, 23)));
        assert!(!w.intersects(d(7, 6), d(7, 12)));
    }
}
