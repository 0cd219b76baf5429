use chrono::{DateTime, Local, Timelike, Utc};

/// Represents an entity responsible for providing time across the
/// application. This allows it to be swapped out for testing.
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Hour of the day in the viewer's timezone, 0..=23. Only the
    /// time-of-day distribution depends on it; date buckets stay UTC.
    fn local_hour(&self) -> u32;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}
