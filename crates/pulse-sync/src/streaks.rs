//! Posting-streak computation over an employee's per-day activity.
//!
//! The unit of a streak is the calendar week (Monday-aligned), not the
//! day: posting once on Tuesday and once the following Monday is a
//! two-week streak.

use chrono::{Duration, NaiveDate};
use pulse_core::{week_start, PostingActivity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakSummary {
    /// Length of the trailing run, or 0 when it is no longer active.
    pub current_streak: i64,
    pub longest_streak: i64,
    /// True when the last posting week is this week or last week.
    pub is_active: bool,
    pub last_post_date: Option<NaiveDate>,
}

/// Collapse activity days into distinct week-start dates, then walk them:
/// a run continues while consecutive week-starts are exactly 7 days apart.
pub fn compute_streaks(activities: &[PostingActivity], today: NaiveDate) -> StreakSummary {
    let mut weeks: Vec<NaiveDate> = activities
        .iter()
        .filter(|a| a.post_count > 0)
        .map(|a| week_start(a.date))
        .collect();
    weeks.sort();
    weeks.dedup();

    let Some(&last_week) = weeks.last() else {
        return StreakSummary::default();
    };

    let mut longest = 1i64;
    let mut run = 1i64;
    for pair in weeks.windows(2) {
        if pair[1] - pair[0] == Duration::days(7) {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let is_active = week_start(today) - last_week <= Duration::days(7);
    let last_post_date = activities
        .iter()
        .filter(|a| a.post_count > 0)
        .map(|a| a.date)
        .max();

    StreakSummary {
        current_streak: if is_active { run } else { 0 },
        longest_streak: longest,
        is_active,
        last_post_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn activity(date: NaiveDate, count: i64) -> PostingActivity {
        PostingActivity {
            employee_id: Uuid::new_v4(),
            date,
            post_count: count,
        }
    }

    #[test]
    fn no_activity_is_all_zero_not_an_error() {
        let summary = compute_streaks(&[], day(2024, 6, 10));
        assert_eq!(summary, StreakSummary::default());
    }

    #[test]
    fn days_in_the_same_week_collapse_to_one_streak_week() {
        // Mon Jun 3 and Thu Jun 6, 2024 are the same calendar week.
        let acts = vec![activity(day(2024, 6, 3), 1), activity(day(2024, 6, 6), 2)];
        let summary = compute_streaks(&acts, day(2024, 6, 7));
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
        assert!(summary.is_active);
        assert_eq!(summary.last_post_date, Some(day(2024, 6, 6)));
    }

    #[test]
    fn consecutive_weeks_extend_the_streak() {
        let acts = vec![
            activity(day(2024, 5, 21), 1), // week of May 20
            activity(day(2024, 5, 29), 1), // week of May 27
            activity(day(2024, 6, 4), 1),  // week of Jun 3
        ];
        let summary = compute_streaks(&acts, day(2024, 6, 5));
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);
    }

    #[test]
    fn a_gap_week_breaks_the_run() {
        let acts = vec![
            activity(day(2024, 5, 6), 1),  // week of May 6
            activity(day(2024, 5, 13), 1), // week of May 13
            // week of May 20 skipped
            activity(day(2024, 5, 28), 1), // week of May 27
        ];
        let summary = compute_streaks(&acts, day(2024, 5, 30));
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 2);
    }

    #[test]
    fn posting_last_week_still_counts_as_active() {
        let acts = vec![activity(day(2024, 5, 28), 1)]; // week of May 27
        let summary = compute_streaks(&acts, day(2024, 6, 5)); // week of Jun 3
        assert!(summary.is_active);
        assert_eq!(summary.current_streak, 1);
    }

    #[test]
    fn an_old_trailing_run_reports_zero_current_streak() {
        let acts = vec![
            activity(day(2024, 4, 2), 1),
            activity(day(2024, 4, 9), 1),
        ];
        let summary = compute_streaks(&acts, day(2024, 6, 10));
        assert!(!summary.is_active);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 2);
        // The last posting date survives even when the streak is dead.
        assert_eq!(summary.last_post_date, Some(day(2024, 4, 9)));
    }

    #[test]
    fn zero_count_days_are_ignored() {
        let acts = vec![activity(day(2024, 6, 3), 0)];
        let summary = compute_streaks(&acts, day(2024, 6, 5));
        assert_eq!(summary, StreakSummary::default());
    }
}
