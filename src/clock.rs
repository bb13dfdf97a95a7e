use chrono::{DateTime, Local, NaiveDate, Utc};

/// Abstraction over "current time" to make behavior deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The calendar date a snapshot is filed under.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock. `today` follows the local timezone, matching the day the
/// user sees on the bank portals.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// A clock fixed at midnight UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::default()).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
