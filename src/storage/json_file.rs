use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::fs;

use super::SnapshotStore;
use crate::models::DailySnapshot;

/// JSON file-based snapshot storage.
///
/// Directory structure:
/// ```text
/// data/
///   snapshots/
///     2026-03-18.json
///     2026-03-19.json
/// ```
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous version intact.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    base_path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.base_path.join("snapshots")
    }

    /// Path of the snapshot file for `date`.
    pub fn snapshot_file(&self, date: NaiveDate) -> PathBuf {
        self.snapshots_dir()
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailySnapshot>> {
        let path = self.snapshot_file(date);
        let snapshot: Option<DailySnapshot> = self.read_json(&path).await?;
        if let Some(snapshot) = &snapshot {
            if snapshot.date != date {
                anyhow::bail!(
                    "Snapshot file {} is dated {}, expected {}",
                    path.display(),
                    snapshot.date,
                    date
                );
            }
        }
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &DailySnapshot) -> Result<()> {
        let path = self.snapshot_file(snapshot.date);
        self.write_json(&path, snapshot).await?;
        tracing::info!(path = %path.display(), accounts = snapshot.len(), "Saved snapshot");
        Ok(())
    }

    async fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();

        let mut entries = match fs::read_dir(self.snapshots_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dates),
            Err(e) => return Err(e).context("Failed to read snapshots directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            match NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(_) => tracing::debug!(file = stem, "Ignoring non-snapshot file"),
            }
        }

        dates.sort();
        Ok(dates)
    }
}
