use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Usage counters
// ---------------------------------------------------------------------------

/// Live usage for one caller. Both counters are tied to a fixed UTC window
/// (calendar hour / calendar day) and reset when the window rolls over.
#[derive(Debug, Clone)]
pub(crate) struct UsageCounter {
    pub queries_this_hour: u32,
    /// Start of the hour the hourly counter belongs to.
    pub hour_window: DateTime<Utc>,
    pub queries_today: u32,
    /// UTC date the daily counter belongs to.
    pub day_window: NaiveDate,
}

impl UsageCounter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            queries_this_hour: 0,
            hour_window: hour_start(now),
            queries_today: 0,
            day_window: now.date_naive(),
        }
    }

    /// Reset any counter whose window has elapsed. Part of the atomic
    /// reservation path: callers must hold the counter lock.
    pub fn roll(&mut self, now: DateTime<Utc>) {
        let hour = hour_start(now);
        if self.hour_window != hour {
            self.hour_window = hour;
            self.queries_this_hour = 0;
        }
        let day = now.date_naive();
        if self.day_window != day {
            self.day_window = day;
            self.queries_today = 0;
        }
    }

    /// Hourly count as of `now`, without mutating.
    pub fn hour_count_at(&self, now: DateTime<Utc>) -> u32 {
        if self.hour_window == hour_start(now) {
            self.queries_this_hour
        } else {
            0
        }
    }

    /// Daily count as of `now`, without mutating.
    pub fn day_count_at(&self, now: DateTime<Utc>) -> u32 {
        if self.day_window == now.date_naive() {
            self.queries_today
        } else {
            0
        }
    }
}

/// Truncate a timestamp to the start of its UTC hour.
pub(crate) fn hour_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(now.hour(), 0, 0)
        .expect("valid hour-of-day")
        .and_utc()
}

/// The next hourly window boundary after `hour_window`.
pub(crate) fn next_hour(hour_window: DateTime<Utc>) -> DateTime<Utc> {
    hour_window + chrono::Duration::hours(1)
}

/// Midnight UTC of the day after `day_window`.
pub(crate) fn next_day(day_window: NaiveDate) -> DateTime<Utc> {
    day_window
        .succ_opt()
        .expect("date within supported range")
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc()
}

// ---------------------------------------------------------------------------
// API snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub queries_this_hour: u32,
    pub queries_today: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitsView {
    pub queries_per_hour: u32,
    pub queries_per_day: u32,
}

/// Static policy plus a usage snapshot, as returned by `GET /run/policy`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    pub caller: String,
    pub max_query_duration_seconds: u64,
    pub max_result_rows: usize,
    pub max_result_size_mb: u64,
    pub allowed_engines: Vec<String>,
    pub allowed_file_types: Vec<String>,
    pub max_file_size_mb: u64,
    pub rate_limits: RateLimitsView,
    pub usage: UsageSnapshot,
}
