use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::{DailyCounters, DeviceDistribution, IdentityRecord, TimeDistribution};

/// Interface for abstracting persistence of the four analytics records.
/// Loads are fail-open: a record that is missing or cannot be read back
/// comes out as its default so analytics never block anything else.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatStore: Send + Sync + 'static {
    async fn load_identity(&self) -> Result<IdentityRecord>;
    async fn save_identity(&self, record: &IdentityRecord) -> Result<()>;

    async fn load_daily(&self) -> Result<DailyCounters>;
    async fn save_daily(&self, counters: &DailyCounters) -> Result<()>;

    async fn load_time_distribution(&self) -> Result<TimeDistribution>;
    async fn save_time_distribution(&self, distribution: &TimeDistribution) -> Result<()>;

    async fn load_device_distribution(&self) -> Result<DeviceDistribution>;
    async fn save_device_distribution(&self, distribution: &DeviceDistribution) -> Result<()>;
}

const IDENTITY_RECORD: &str = "identity.json";
const DAILY_RECORD: &str = "daily.json";
const TIME_RECORD: &str = "time_distribution.json";
const DEVICE_RECORD: &str = "device_distribution.json";

/// The main realization of [StatStore]. Each logical record is one JSON
/// file inside the stats directory, guarded by advisory file locks.
pub struct FileStatStore {
    stats_dir: PathBuf,
}

impl FileStatStore {
    pub fn new(stats_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&stats_dir)?;

        Ok(Self { stats_dir })
    }

    async fn read_record<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.stats_dir.join(name);
        let raw = match read_locked(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<T>(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                // A corrupt record is discarded on its own; the other
                // records stay untouched. Might happen after a shutdown
                // cutting off a write.
                warn!("Discarding corrupt record {name}: {e}");
                Ok(T::default())
            }
        }
    }

    async fn write_record<T: Serialize + Sync>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.stats_dir.join(name);
        debug!("Writing record {path:?}");

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = write_with_file(&mut file, value).await;
        file.unlock_async().await?;
        result
    }
}

async fn read_locked(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path).await?;
    file.lock_shared()?;
    let mut raw = Vec::new();
    let read = file.read_to_end(&mut raw).await;
    file.unlock_async().await?;
    read?;
    Ok(raw)
}

async fn write_with_file<T: Serialize>(file: &mut File, value: &T) -> Result<()> {
    // Truncate only once the exclusive lock is held. A reader holding the
    // shared lock must never observe an empty record.
    file.set_len(0).await?;
    let buffer = serde_json::to_vec(value)?;
    file.write_all(&buffer).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl StatStore for FileStatStore {
    async fn load_identity(&self) -> Result<IdentityRecord> {
        self.read_record(IDENTITY_RECORD).await
    }

    async fn save_identity(&self, record: &IdentityRecord) -> Result<()> {
        self.write_record(IDENTITY_RECORD, record).await
    }

    async fn load_daily(&self) -> Result<DailyCounters> {
        self.read_record(DAILY_RECORD).await
    }

    async fn save_daily(&self, counters: &DailyCounters) -> Result<()> {
        self.write_record(DAILY_RECORD, counters).await
    }

    async fn load_time_distribution(&self) -> Result<TimeDistribution> {
        self.read_record(TIME_RECORD).await
    }

    async fn save_time_distribution(&self, distribution: &TimeDistribution) -> Result<()> {
        self.write_record(TIME_RECORD, distribution).await
    }

    async fn load_device_distribution(&self) -> Result<DeviceDistribution> {
        self.read_record(DEVICE_RECORD).await
    }

    async fn save_device_distribution(&self, distribution: &DeviceDistribution) -> Result<()> {
        self.write_record(DEVICE_RECORD, distribution).await
    }
}
