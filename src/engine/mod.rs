use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::engine::{
    classify::classify,
    gate::should_count,
    query::{SeriesPoint, StatsSnapshot},
    storage::{
        entities::{DeviceDistribution, TimeDistribution},
        stat_store::StatStore,
    },
};

pub mod classify;
pub mod gate;
pub mod query;
pub mod storage;

/// A single page activation as reported by the presentation layer.
#[derive(Debug, Clone)]
pub struct PageView {
    /// Moment of the activation. Daily buckets are keyed by its UTC
    /// calendar day.
    pub now: DateTime<Utc>,
    /// Viewer-local hour, 0..=23. Feeds only the time-of-day distribution.
    pub local_hour: u32,
    pub user_agent: String,
}

/// Outcome of running one view through the dedup gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub countable: bool,
}

/// The visitor analytics engine. The gate decision and every counter
/// increment for one view run under a single write section, so concurrent
/// activations can never double count and queries always see a consistent
/// snapshot. Counters move only through [VisitorEngine::on_view_activated];
/// the query methods are strictly read-only.
///
/// The engine assumes it is the single writer for its store: the lock
/// spans tasks inside one process, while the store's file locks only guard
/// individual record reads and writes. Two processes tracking against the
/// same directory at the same moment can each judge a view countable.
pub struct VisitorEngine<S: StatStore> {
    store: S,
    guard: RwLock<()>,
}

impl<S: StatStore> VisitorEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            guard: RwLock::new(()),
        }
    }

    /// Runs one page activation through the dedup gate. Exactly one bucket
    /// of each aggregate moves when the view is judged countable; nothing
    /// moves otherwise.
    pub async fn on_view_activated(&self, view: PageView) -> Result<Activation> {
        let _write = self.guard.write().await;

        let mut identity = self.store.load_identity().await?;
        if !should_count(&mut identity, view.now) {
            debug!("View inside dedup window, not counting");
            return Ok(Activation { countable: false });
        }
        self.store.save_identity(&identity).await?;

        let mut daily = self.store.load_daily().await?;
        daily.record(view.now.date_naive());
        self.store.save_daily(&daily).await?;

        let mut time = self.store.load_time_distribution().await?;
        time.record(view.local_hour);
        self.store.save_time_distribution(&time).await?;

        let mut devices = self.store.load_device_distribution().await?;
        devices.record(classify(&view.user_agent));
        self.store.save_device_distribution(&devices).await?;

        info!("Counted visit on {}", view.now.date_naive());
        Ok(Activation { countable: true })
    }

    /// Captures all aggregates in one consistent read section.
    pub async fn snapshot(&self, today: NaiveDate) -> Result<StatsSnapshot> {
        let _read = self.guard.read().await;
        let daily = self.store.load_daily().await?;
        let time = self.store.load_time_distribution().await?;
        let devices = self.store.load_device_distribution().await?;
        Ok(query::project(&daily, time, devices, today))
    }

    /// The last-7-days series ending at `today`, oldest first.
    pub async fn series(&self, today: NaiveDate) -> Result<Vec<SeriesPoint>> {
        let _read = self.guard.read().await;
        let daily = self.store.load_daily().await?;
        Ok(query::last_7_days(&daily, today))
    }

    /// Sum of all retained daily buckets.
    pub async fn total(&self) -> Result<u64> {
        let _read = self.guard.read().await;
        Ok(self.store.load_daily().await?.total())
    }

    pub async fn time_distribution(&self) -> Result<TimeDistribution> {
        let _read = self.guard.read().await;
        self.store.load_time_distribution().await
    }

    pub async fn device_distribution(&self) -> Result<DeviceDistribution> {
        let _read = self.guard.read().await;
        self.store.load_device_distribution().await
    }

    /// Drops all persisted analytics back to their defaults, identity
    /// included.
    pub async fn reset(&self) -> Result<()> {
        let _write = self.guard.write().await;
        self.store.save_identity(&Default::default()).await?;
        self.store.save_daily(&Default::default()).await?;
        self.store.save_time_distribution(&Default::default()).await?;
        self.store
            .save_device_distribution(&Default::default())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod engine_tests {
    use anyhow::Result;
    use chrono::{
        DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    };
    use tempfile::tempdir;

    use crate::{
        engine::{
            storage::{
                entities::{IdentityRecord, LastCountedMarker, VisitorIdentity},
                stat_store::{FileStatStore, MockStatStore},
            },
            PageView, VisitorEngine,
        },
        utils::logging::TEST_LOGGING,
    };

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
    );

    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
    const TABLET_UA: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15";

    fn start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn view_at(now: DateTime<Utc>, user_agent: &str) -> PageView {
        PageView {
            now,
            local_hour: now.hour(),
            user_agent: user_agent.to_string(),
        }
    }

    fn file_engine(dir: &std::path::Path) -> Result<VisitorEngine<FileStatStore>> {
        Ok(VisitorEngine::new(FileStatStore::new(dir.to_owned())?))
    }

    #[tokio::test]
    async fn test_fresh_identity_scenario() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let engine = file_engine(dir.path())?;

        let first = engine.on_view_activated(view_at(start(), DESKTOP_UA)).await?;
        assert!(first.countable);
        assert_eq!(engine.total().await?, 1);
        let series = engine.series(start().date_naive()).await?;
        assert_eq!(series[6].count, 1);

        let second = engine
            .on_view_activated(view_at(start() + Duration::hours(1), DESKTOP_UA))
            .await?;
        assert!(!second.countable);
        assert_eq!(engine.total().await?, 1);
        assert_eq!(engine.time_distribution().await?.total(), 1);
        assert_eq!(engine.device_distribution().await?.total(), 1);

        let third = engine
            .on_view_activated(view_at(start() + Duration::hours(25), DESKTOP_UA))
            .await?;
        assert!(third.countable);
        assert_eq!(engine.total().await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_queries_never_move_distributions() -> Result<()> {
        let dir = tempdir()?;
        let engine = file_engine(dir.path())?;

        engine.on_view_activated(view_at(start(), TABLET_UA)).await?;

        for _ in 0..5 {
            let snapshot = engine.snapshot(start().date_naive()).await?;
            assert_eq!(snapshot.time.total(), 1);
            assert_eq!(snapshot.devices.tablet, 1);
            assert_eq!(snapshot.devices.total(), 1);
        }

        // One countable visit, one increment per aggregate, no matter how
        // often the read path ran in between.
        assert_eq!(engine.time_distribution().await?.total(), 1);
        assert_eq!(engine.device_distribution().await?.total(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_distributions_track_countable_visits() -> Result<()> {
        let dir = tempdir()?;
        let engine = file_engine(dir.path())?;

        let mut counted = 0;
        for day in 0..3 {
            let now = start() + Duration::days(day) + Duration::hours(day as i64);
            let ua = if day % 2 == 0 { DESKTOP_UA } else { TABLET_UA };
            if engine.on_view_activated(view_at(now, ua)).await?.countable {
                counted += 1;
            }
        }

        assert_eq!(counted, 3);
        assert_eq!(engine.time_distribution().await?.total(), counted);
        assert_eq!(engine.device_distribution().await?.total(), counted);
        assert_eq!(engine.total().await?, counted);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_first_views_count_once() -> Result<()> {
        let dir = tempdir()?;
        let engine = file_engine(dir.path())?;

        let (a, b) = tokio::join!(
            engine.on_view_activated(view_at(start(), DESKTOP_UA)),
            engine.on_view_activated(view_at(start(), TABLET_UA)),
        );

        let countable = [a?, b?].iter().filter(|v| v.countable).count();
        assert_eq!(countable, 1);
        assert_eq!(engine.total().await?, 1);
        assert_eq!(engine.time_distribution().await?.total(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_suppressed_view_writes_nothing() -> Result<()> {
        let mut store = MockStatStore::new();
        store.expect_load_identity().returning(|| {
            Ok(IdentityRecord {
                identity: Some(VisitorIdentity::generate(start() - Duration::hours(2))),
                marker: Some(LastCountedMarker {
                    counted_at: start() - Duration::hours(2),
                }),
            })
        });
        store.expect_save_identity().never();
        store.expect_save_daily().never();
        store.expect_save_time_distribution().never();
        store.expect_save_device_distribution().never();

        let engine = VisitorEngine::new(store);
        let activation = engine.on_view_activated(view_at(start(), DESKTOP_UA)).await?;
        assert!(!activation.countable);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_clears_all_records() -> Result<()> {
        let dir = tempdir()?;
        let engine = file_engine(dir.path())?;

        engine.on_view_activated(view_at(start(), DESKTOP_UA)).await?;
        engine.reset().await?;

        assert_eq!(engine.total().await?, 0);
        assert_eq!(engine.time_distribution().await?.total(), 0);
        assert_eq!(engine.device_distribution().await?.total(), 0);

        // A fresh identity means the next view counts again.
        let next = engine.on_view_activated(view_at(start(), DESKTOP_UA)).await?;
        assert!(next.countable);
        Ok(())
    }
}
