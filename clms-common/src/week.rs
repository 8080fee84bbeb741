//! Week index arithmetic for batch progression
//!
//! A batch progresses through its course one week at a time, anchored by its
//! start date. The week index is 1-based and derived, never stored: day 0
//! through day 6 fall in week 1, day 7 starts week 2, and so on with no
//! upper bound.

use chrono::{DateTime, Utc};

/// Seconds per day, used for whole-day truncation
const SECONDS_PER_DAY: i64 = 86_400;

/// Compute the 1-based week index a batch is currently in.
///
/// Returns `None` when `now` is before `start_date`: a batch with a future
/// start date has not started and has no current week. Callers treat this
/// as "skip, nothing to unlock yet".
///
/// For `now >= start_date` the result is always `Some(week)` with
/// `week >= 1`: elapsed whole days divided by 7, plus one. The boundary day
/// belongs to the later week (exactly 7 elapsed days is week 2).
pub fn current_week(start_date: DateTime<Utc>, now: DateTime<Utc>) -> Option<u32> {
    let elapsed_seconds = now.signed_duration_since(start_date).num_seconds();
    if elapsed_seconds < 0 {
        return None;
    }

    let elapsed_days = elapsed_seconds / SECONDS_PER_DAY;
    Some((elapsed_days / 7) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_week_one_at_start() {
        let start = ts(2025, 1, 6, 0, 0, 0);
        assert_eq!(current_week(start, start), Some(1));
    }

    #[test]
    fn test_week_one_through_day_six() {
        let start = ts(2025, 1, 6, 0, 0, 0);
        for day in 0..7 {
            let now = start + Duration::days(day);
            assert_eq!(current_week(start, now), Some(1), "day {}", day);
        }
        // One second before the 7-day boundary is still week 1
        let now = start + Duration::days(7) - Duration::seconds(1);
        assert_eq!(current_week(start, now), Some(1));
    }

    #[test]
    fn test_week_two_at_seven_days() {
        // Day 7 falls in week 2, not week 1: floor(7/7) + 1 = 2
        let start = ts(2025, 1, 6, 0, 0, 0);
        let now = start + Duration::days(7);
        assert_eq!(current_week(start, now), Some(2));
    }

    #[test]
    fn test_week_index_for_multi_week_elapsed() {
        let start = ts(2025, 1, 6, 0, 0, 0);
        assert_eq!(current_week(start, start + Duration::days(13)), Some(2));
        assert_eq!(current_week(start, start + Duration::days(14)), Some(3));
        assert_eq!(current_week(start, start + Duration::days(70)), Some(11));
    }

    #[test]
    fn test_no_upper_bound() {
        // A batch running for years keeps incrementing
        let start = ts(2020, 1, 6, 0, 0, 0);
        let now = start + Duration::days(365 * 4);
        assert_eq!(current_week(start, now), Some((365 * 4 / 7) as u32 + 1));
    }

    #[test]
    fn test_future_start_is_not_started() {
        // A batch whose start date is ahead of now has no current week
        let start = ts(2025, 6, 2, 0, 0, 0);
        let now = start - Duration::days(3);
        assert_eq!(current_week(start, now), None);

        // Even one second early counts as not started
        let now = start - Duration::seconds(1);
        assert_eq!(current_week(start, now), None);
    }

    #[test]
    fn test_at_least_one_for_all_past_starts() {
        let start = ts(2025, 1, 6, 0, 0, 0);
        for day in [0i64, 1, 6, 7, 30, 100, 1000] {
            let week = current_week(start, start + Duration::days(day)).unwrap();
            assert!(week >= 1, "week {} for day {}", week, day);
        }
    }

    #[test]
    fn test_non_decreasing_as_time_advances() {
        let start = ts(2025, 1, 6, 12, 30, 0);
        let mut previous = 0u32;
        for hours in (0..24 * 7 * 6).step_by(7) {
            let now = start + Duration::hours(hours);
            let week = current_week(start, now).unwrap();
            assert!(
                week >= previous,
                "week decreased from {} to {} at +{}h",
                previous,
                week,
                hours
            );
            previous = week;
        }
    }

    #[test]
    fn test_partial_days_truncate() {
        // 6 days 23 hours elapsed is still 6 whole days, week 1
        let start = ts(2025, 1, 6, 0, 0, 0);
        let now = start + Duration::days(6) + Duration::hours(23);
        assert_eq!(current_week(start, now), Some(1));
    }
}
