//! Daily check-in streaks
//!
//! Streaks count consecutive local calendar days with a check-in. All
//! comparisons drop the time of day and use the local timezone.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// Points for a check-in before the streak bonus
pub const BASE_CHECKIN_POINTS: i64 = 10;

/// Streak length needed for each bonus step
pub const STREAK_STEP_DAYS: u32 = 7;

/// Bonus steps stop counting after this many (35+ day streaks)
pub const MAX_STREAK_STEPS: u32 = 5;

/// Local calendar date of a stored timestamp
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// New streak value after checking in on `today`
pub fn calculate_new_streak(last_checkin: Option<NaiveDate>, streak: u32, today: NaiveDate) -> u32 {
    let Some(last) = last_checkin else {
        return 1;
    };

    if last == today {
        return streak;
    }

    if today.pred_opt() == Some(last) {
        return streak.saturating_add(1);
    }

    1
}

fn bonus_steps(streak: u32) -> u32 {
    (streak / STREAK_STEP_DAYS).min(MAX_STREAK_STEPS)
}

/// Points earned by a check-in that lands on `streak`.
///
/// `10 * (1 + min(streak / 7, 5) * 0.5)`, kept in integers: every step adds
/// half the base.
pub fn checkin_points(streak: u32) -> i64 {
    BASE_CHECKIN_POINTS + (BASE_CHECKIN_POINTS / 2) * i64::from(bonus_steps(streak))
}

/// Multiplier applied to the base points, for display
pub fn streak_multiplier(streak: u32) -> f64 {
    1.0 + f64::from(bonus_steps(streak)) * 0.5
}

/// Whether the stored check-in falls on the same local day as `now`
pub fn has_checked_in_today(last_checkin: Option<DateTime<Utc>>, now: DateTime<Local>) -> bool {
    last_checkin.is_some_and(|ts| local_date(ts) == now.date_naive())
}

/// Time left until the next local midnight, when a new check-in opens
pub fn time_until_next_checkin(now: DateTime<Local>) -> Duration {
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return Duration::zero();
    };
    let Some(midnight) = tomorrow.and_hms_opt(0, 0, 0) else {
        return Duration::zero();
    };

    // Midnight can be skipped by a DST jump; fall back to naive arithmetic
    let left = match Local.from_local_datetime(&midnight).earliest() {
        Some(next) => next - now,
        None => midnight - now.naive_local(),
    };

    left.max(Duration::zero())
}

/// Countdown label, e.g. `"5h 42m"`
pub fn format_countdown(left: Duration) -> String {
    let minutes = left.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
