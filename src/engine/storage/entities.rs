use chrono::Days;
use chrono::NaiveDate;
use chrono::Utc;

use chrono::DateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::classify::DeviceClass;

/// Days a daily bucket is retained. Purging happens on every write, so a
/// stale bucket never outlives the next countable visit by more than one
/// write cycle.
pub const RETENTION_DAYS: u64 = 30;

/// A long-lived visitor token. Created once and never mutated afterwards;
/// the dedup gate replaces it wholesale once it outlives its TTL.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct VisitorIdentity {
    pub id: Arc<str>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl VisitorIdentity {
    /// Mints a fresh identity token.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self {
            id: format!("visitor_{}", Uuid::new_v4().simple()).into(),
            created_at: now,
        }
    }
}

/// Moment of the last view that passed the dedup gate. Its absence is what
/// makes the next view countable.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy)]
pub struct LastCountedMarker {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub counted_at: DateTime<Utc>,
}

/// Identity and marker persisted together as one record. Either half can be
/// absent: a fresh profile has neither, an expired identity is dropped along
/// with its marker.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct IdentityRecord {
    pub identity: Option<VisitorIdentity>,
    pub marker: Option<LastCountedMarker>,
}

/// Visit counts keyed by UTC calendar day. A date absent from the map is a
/// count of 0.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
#[serde(transparent)]
pub struct DailyCounters {
    counts: BTreeMap<NaiveDate, u64>,
}

impl DailyCounters {
    /// Increments the bucket for `date` and drops every bucket strictly
    /// older than the retention window.
    pub fn record(&mut self, date: NaiveDate) {
        *self.counts.entry(date).or_insert(0) += 1;
        if let Some(cutoff) = date.checked_sub_days(Days::new(RETENTION_DAYS)) {
            self.counts.retain(|bucket, _| *bucket >= cutoff);
        }
    }

    pub fn count_for(&self, date: NaiveDate) -> u64 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Sum of all retained buckets. Bounded by the retention window, so this
    /// is not an all-time total.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn oldest(&self) -> Option<NaiveDate> {
        self.counts.keys().next().copied()
    }
}

/// Time-of-day buckets of countable visits. Half-open hour ranges: morning
/// [6,12), afternoon [12,18), evening [18,24), night [0,6). Lifetime
/// counters, no retention.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct TimeDistribution {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
}

impl TimeDistribution {
    pub fn record(&mut self, hour: u32) {
        match hour {
            6..=11 => self.morning += 1,
            12..=17 => self.afternoon += 1,
            18..=23 => self.evening += 1,
            _ => self.night += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.morning + self.afternoon + self.evening + self.night
    }
}

/// Device-class buckets of countable visits. Lifetime counters, no
/// retention.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct DeviceDistribution {
    pub pc: u64,
    pub mobile: u64,
    pub tablet: u64,
    pub other: u64,
}

impl DeviceDistribution {
    pub fn record(&mut self, class: DeviceClass) {
        match class {
            DeviceClass::Pc => self.pc += 1,
            DeviceClass::Mobile => self.mobile += 1,
            DeviceClass::Tablet => self.tablet += 1,
            DeviceClass::Other => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.pc + self.mobile + self.tablet + self.other
    }
}
