mod json_file;
mod memory;

pub use json_file::JsonFileSnapshotStore;
pub use memory::MemorySnapshotStore;

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::DailySnapshot;

/// Persistence for daily snapshots, one record per calendar date.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The stored snapshot for `date`, if any.
    async fn get(&self, date: NaiveDate) -> Result<Option<DailySnapshot>>;

    /// Overwrite the stored snapshot for `snapshot.date`.
    async fn save(&self, snapshot: &DailySnapshot) -> Result<()>;

    /// All stored dates, oldest first.
    async fn list_dates(&self) -> Result<Vec<NaiveDate>>;

    /// The stored snapshot for `date`, or an empty one for that date.
    async fn load(&self, date: NaiveDate) -> Result<DailySnapshot> {
        Ok(self
            .get(date)
            .await?
            .unwrap_or_else(|| DailySnapshot::new(date)))
    }

    /// The most recent stored snapshot strictly before `date`.
    async fn latest_before(&self, date: NaiveDate) -> Result<Option<DailySnapshot>> {
        let dates = self.list_dates().await?;
        match dates.into_iter().filter(|d| *d < date).max() {
            Some(previous) => self.get(previous).await,
            None => Ok(None),
        }
    }
}
