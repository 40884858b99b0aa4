// Processed-File Ledger
//
// Records which source files a pipeline has already appended to its silver
// table. The ledger is committed only after the sink write succeeds, so a
// crash between the two re-processes the batch (at-least-once).
//
// A checkpoint location has a single writer: runs that share one are
// serialized through CheckpointLock.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const LEDGER_FILE: &str = "progress.json";

/// One writer lock per checkpoint location in this process
static CHECKPOINT_LOCKS: LazyLock<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Exclusive hold on a checkpoint location, released on drop
pub struct CheckpointLock {
    _guard: OwnedMutexGuard<()>,
}

impl CheckpointLock {
    /// Wait until no other run holds `checkpoint_location`, then take it
    pub async fn acquire(checkpoint_location: &str) -> Self {
        let lock = {
            let mut locks = CHECKPOINT_LOCKS
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(checkpoint_location.to_string())
                .or_default()
                .clone()
        };

        Self {
            _guard: lock.lock_owned().await,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressLedger {
    /// Source file names already written to the sink
    pub processed: BTreeSet<String>,
    /// Number of committed batches
    pub batches: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressLedger {
    fn ledger_path(checkpoint_location: &str) -> PathBuf {
        Path::new(checkpoint_location).join(LEDGER_FILE)
    }

    /// Load the ledger, or an empty one if the pipeline never committed
    pub async fn load(checkpoint_location: &str) -> Result<Self> {
        let path = Self::ledger_path(checkpoint_location);

        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Corrupt checkpoint ledger at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.processed.contains(file_name)
    }

    /// Record a batch of files and persist the ledger (write temp file, then rename)
    pub async fn commit<I>(&mut self, checkpoint_location: &str, files: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.processed.extend(files);
        self.batches += 1;
        self.updated_at = Some(Utc::now());

        tokio::fs::create_dir_all(checkpoint_location)
            .await
            .with_context(|| format!("Failed to create checkpoint location {}", checkpoint_location))?;

        let path = Self::ledger_path(checkpoint_location);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(self)?;

        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to commit {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("stream_checkpoint");

        let ledger = ProgressLedger::load(location.to_str().unwrap()).await.unwrap();
        assert_eq!(ledger, ProgressLedger::default());
    }

    #[tokio::test]
    async fn test_commit_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("stream_checkpoint");
        let location = location.to_str().unwrap();

        let mut ledger = ProgressLedger::load(location).await.unwrap();
        ledger
            .commit(location, vec!["part-0001.csv".to_string()])
            .await
            .unwrap();
        ledger
            .commit(location, vec!["part-0002.csv".to_string()])
            .await
            .unwrap();

        let reloaded = ProgressLedger::load(location).await.unwrap();
        assert_eq!(reloaded.batches, 2);
        assert!(reloaded.contains("part-0001.csv"));
        assert!(reloaded.contains("part-0002.csv"));
        assert!(reloaded.updated_at.is_some());
        assert!(!Path::new(location).join("progress.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("progress.json"), "{").unwrap();

        let result = ProgressLedger::load(dir.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_checkpoint_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("stream_checkpoint");
        let location = location.to_str().unwrap().to_string();

        let held = CheckpointLock::acquire(&location).await;

        let waiter = {
            let location = location.clone();
            tokio::spawn(async move {
                let _lock = CheckpointLock::acquire(&location).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // Other locations are independent
        let other = dir.path().join("other_checkpoint");
        let _other = CheckpointLock::acquire(other.to_str().unwrap()).await;

        drop(held);
        waiter.await.unwrap();
    }
}
