//! Read-only projections over the persisted records. Nothing in here
//! mutates a store; all increments happen in the write path of
//! [VisitorEngine](super::VisitorEngine).

use chrono::{Duration, NaiveDate};

use crate::utils::time::series_label;

use super::storage::entities::{DailyCounters, DeviceDistribution, TimeDistribution};

/// Days shown in the trend series.
pub const SERIES_DAYS: i64 = 7;

/// One point of the trend series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPoint {
    pub label: String,
    pub count: u64,
}

/// Everything the presentation layer reads, captured in one shot.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub series: Vec<SeriesPoint>,
    pub total: u64,
    pub since: Option<NaiveDate>,
    pub time: TimeDistribution,
    pub devices: DeviceDistribution,
}

/// Projects the last 7 days ending at `today`, oldest first. Days without a
/// bucket show as 0.
pub fn last_7_days(counters: &DailyCounters, today: NaiveDate) -> Vec<SeriesPoint> {
    (0..SERIES_DAYS)
        .rev()
        .map(|back| today - Duration::days(back))
        .map(|date| SeriesPoint {
            label: series_label(date),
            count: counters.count_for(date),
        })
        .collect()
}

pub fn project(
    counters: &DailyCounters,
    time: TimeDistribution,
    devices: DeviceDistribution,
    today: NaiveDate,
) -> StatsSnapshot {
    StatsSnapshot {
        series: last_7_days(counters, today),
        total: counters.total(),
        since: counters.oldest(),
        time,
        devices,
    }
}
