//! In-memory snapshot storage for testing.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::SnapshotStore;
use crate::models::DailySnapshot;

/// In-memory storage for testing purposes.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<NaiveDate, DailySnapshot>>,
    saves: Mutex<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailySnapshot>> {
        let snapshots = self.snapshots.lock().await;
        Ok(snapshots.get(&date).cloned())
    }

    async fn save(&self, snapshot: &DailySnapshot) -> Result<()> {
        let mut snapshots = self.snapshots.lock().await;
        snapshots.insert(snapshot.date, snapshot.clone());
        *self.saves.lock().await += 1;
        Ok(())
    }

    async fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let snapshots = self.snapshots.lock().await;
        Ok(snapshots.keys().copied().collect())
    }
}
