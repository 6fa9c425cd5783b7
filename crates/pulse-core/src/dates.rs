//! Calendar helpers shared by the streak calculator and activity buckets.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday-aligned start of the calendar week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monday_is_its_own_week_start() {
        assert_eq!(week_start(d(2026, 8, 24)), d(2026, 8, 24));
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        assert_eq!(week_start(d(2026, 8, 30)), d(2026, 8, 24));
    }

    #[test]
    fn midweek_rolls_back_to_monday() {
        assert_eq!(week_start(d(2026, 8, 26)), d(2026, 8, 24));
    }
}
