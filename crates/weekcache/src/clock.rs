//! Wall-clock access and calendar helpers

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike,
    Utc,
};

/// Source of "now" and of the device's local calendar
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds
    fn now_millis(&self) -> i64;

    /// Local wall-clock time of an epoch-millisecond instant
    fn local_datetime(&self, millis: i64) -> Option<NaiveDateTime>;

    /// Today's local calendar date
    fn today(&self) -> Option<NaiveDate> {
        self.local_datetime(self.now_millis()).map(|dt| dt.date())
    }
}

/// The device clock in the device's time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn local_datetime(&self, millis: i64) -> Option<NaiveDateTime> {
        Local
            .timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.naive_local())
    }
}

/// Manually driven clock in a fixed UTC offset
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
    offset: FixedOffset,
}

impl FixedClock {
    /// Clock stopped at `now`, reporting local times in `now`'s offset
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            millis: AtomicI64::new(now.timestamp_millis()),
            offset: *now.offset(),
        }
    }

    /// Clock stopped at a local wall-clock time in UTC
    pub fn at_utc(local: NaiveDateTime) -> Self {
        Self::new(local.and_utc().fixed_offset())
    }

    /// Jump to a new local wall-clock time in the clock's offset
    pub fn set_local(&self, local: NaiveDateTime) {
        if let Some(dt) = self.offset.from_local_datetime(&local).single() {
            self.millis.store(dt.timestamp_millis(), Ordering::SeqCst);
        }
    }

    /// Move the clock forward (or back, for negative durations)
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn local_datetime(&self, millis: i64) -> Option<NaiveDateTime> {
        self.offset
            .timestamp_millis_opt(millis)
            .single()
            .map(|dt| dt.naive_local())
    }
}

/// Whether two instants fall on the same local calendar date
///
/// Compares year/month/day, not elapsed time: 23:59 and 00:01 the next day
/// are different days.
pub fn same_local_day(clock: &dyn Clock, a_millis: i64, b_millis: i64) -> bool {
    match (clock.local_datetime(a_millis), clock.local_datetime(b_millis)) {
        (Some(a), Some(b)) => a.date() == b.date(),
        _ => false,
    }
}

/// Elapsed fraction of the current Monday-based week, in `[0, 1)`
pub fn week_fraction(now: NaiveDateTime) -> f64 {
    let days = now.weekday().num_days_from_monday() as f64;
    let seconds =
        now.num_seconds_from_midnight() as f64 + now.nanosecond().min(999_999_999) as f64 / 1e9;

    ((days + seconds / 86_400.0) / 7.0).clamp(0.0, 1.0)
}
