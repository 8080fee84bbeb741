//! Timestamp and run-scheduling utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Compute the next scheduled run instant strictly after `now`.
///
/// The scheduler runs once per day at `run_hour:00:00` UTC. When `now` is
/// exactly on the run instant the result is the following day, so a run that
/// completes within the same second cannot fire twice.
pub fn next_run_after(now: DateTime<Utc>, run_hour: u32) -> DateTime<Utc> {
    let run_hour = run_hour.min(23);
    let today_run = now
        .date_naive()
        .and_hms_opt(run_hour, 0, 0)
        .expect("hour <= 23 always forms a valid time")
        .and_utc();

    if today_run > now {
        today_run
    } else {
        today_run + Duration::days(1)
    }
}

/// Duration from `now` until `next`, saturating to zero if `next` has passed
pub fn duration_until(now: DateTime<Utc>, next: DateTime<Utc>) -> std::time::Duration {
    next.signed_duration_since(now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

/// Clamp a configured run hour into the valid 0..=23 range
pub fn clamp_run_hour(configured: i64) -> u32 {
    configured.clamp(0, 23) as u32
}
