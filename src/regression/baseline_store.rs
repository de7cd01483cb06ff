//! The baseline store (spec §3 `BaselineStore`, §5 concurrency model, §6
//! persistence layout): one append-only JSON array per query hash, with a
//! per-hash exclusive lock on save and a global advisory lock for pruning.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::metrics::ComplexityClass;
use crate::plan::AccessType;

/// One append-only historical record for a query (spec §3 `BaselineSnapshot`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub timestamp: DateTime<Utc>,
    pub composite_score: f64,
    pub grade: String,
    pub execution_time_ms: f64,
    pub rows_examined: f64,
    pub rows_returned: f64,
    pub complexity: ComplexityClass,
    pub access_type: AccessType,
    pub indexes_used: Vec<String>,
    pub finding_counts: HashMap<String, u32>,
    pub table_size: Option<f64>,
    pub buffer_pool_utilization: f64,
    pub is_cold_cache: bool,
    pub time_per_row: f64,
}

impl BaselineSnapshot {
    pub fn time_per_row(execution_time_ms: f64, rows_examined: f64) -> f64 {
        execution_time_ms / rows_examined.max(1.0)
    }
}

/// Internal store failures. Never propagated as `AnalysisError` — spec §7
/// `StoreUnavailable` is represented as data (`has_baseline=false` + an Info
/// finding), so callers convert this into that shape instead of bubbling it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("baseline store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("baseline store serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait BaselineStore: Send + Sync {
    fn save(&self, hash: &str, snapshot: BaselineSnapshot) -> Result<(), StoreError>;
    fn load(&self, hash: &str) -> Result<Option<BaselineSnapshot>, StoreError>;
    fn history(&self, hash: &str, k: usize) -> Result<Vec<BaselineSnapshot>, StoreError>;
    fn prune(&self, max_age_days: i64) -> Result<(), StoreError>;
}

/// One file per hash (`<dir>/<hash>.json`), a JSON array of snapshots in
/// save order. Per-hash locks are created lazily in a `DashMap` so unrelated
/// hashes never block each other; a single process-wide mutex stands in for
/// the "global advisory lock" pruning takes (spec §5).
pub struct FileBaselineStore {
    directory: PathBuf,
    max_snapshots_per_hash: usize,
    locks: DashMap<String, Arc<Mutex<()>>>,
    prune_lock: Mutex<()>,
}

impl FileBaselineStore {
    pub fn new(directory: impl Into<PathBuf>, max_snapshots_per_hash: usize) -> std::io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory, max_snapshots_per_hash, locks: DashMap::new(), prune_lock: Mutex::new(()) })
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.directory.join(format!("{hash}.json"))
    }

    fn lock_for(&self, hash: &str) -> Arc<Mutex<()>> {
        self.locks.entry(hash.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn read_all(path: &Path) -> Result<Vec<BaselineSnapshot>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl BaselineStore for FileBaselineStore {
    fn save(&self, hash: &str, snapshot: BaselineSnapshot) -> Result<(), StoreError> {
        let lock = self.lock_for(hash);
        let _guard = lock.lock().unwrap();
        let path = self.path_for(hash);
        let mut all = Self::read_all(&path)?;
        all.push(snapshot);
        if all.len() > self.max_snapshots_per_hash {
            let excess = all.len() - self.max_snapshots_per_hash;
            all.drain(0..excess);
        }
        let text = serde_json::to_string_pretty(&all)?;
        fs::write(&path, text)?;
        Ok(())
    }

    fn load(&self, hash: &str) -> Result<Option<BaselineSnapshot>, StoreError> {
        let all = Self::read_all(&self.path_for(hash))?;
        Ok(all.into_iter().last())
    }

    fn history(&self, hash: &str, k: usize) -> Result<Vec<BaselineSnapshot>, StoreError> {
        let all = Self::read_all(&self.path_for(hash))?;
        let start = all.len().saturating_sub(k);
        Ok(all[start..].to_vec())
    }

    fn prune(&self, max_age_days: i64) -> Result<(), StoreError> {
        let _guard = self.prune_lock.lock().unwrap();
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let entries = fs::read_dir(&self.directory)?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let mut all = Self::read_all(&path)?;
            all.retain(|s| s.timestamp >= cutoff);
            if all.is_empty() {
                fs::remove_file(&path)?;
            } else {
                let text = serde_json::to_string_pretty(&all)?;
                fs::write(&path, text)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn snapshot(score: f64) -> BaselineSnapshot {
        BaselineSnapshot {
            timestamp: Utc::now(),
            composite_score: score,
            grade: "A".to_string(),
            execution_time_ms: 10.0,
            rows_examined: 100.0,
            rows_returned: 10.0,
            complexity: ComplexityClass::Linear,
            access_type: AccessType::IndexScan,
            indexes_used: Vec::new(),
            finding_counts: HashMap::new(),
            table_size: None,
            buffer_pool_utilization: 0.0,
            is_cold_cache: false,
            time_per_row: 0.1,
        }
    }

    #[test]
    fn load_returns_the_last_saved_snapshot() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        store.save("h1", snapshot(90.0)).unwrap();
        store.save("h1", snapshot(95.0)).unwrap();
        let loaded = store.load("h1").unwrap().unwrap();
        assert_eq!(loaded.composite_score, 95.0);
    }

    #[test]
    fn missing_hash_is_empty_history() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        assert!(store.load("missing").unwrap().is_none());
        assert!(store.history("missing", 10).unwrap().is_empty());
    }

    #[test]
    fn history_caps_per_hash() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 3).unwrap();
        for i in 0..5 {
            store.save("h1", snapshot(i as f64)).unwrap();
        }
        let history = store.history("h1", 100).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().composite_score, 4.0);
    }

    #[test]
    fn prune_removes_old_snapshots() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        let mut old = snapshot(1.0);
        old.timestamp = Utc::now() - Duration::days(200);
        store.save("h1", old).unwrap();
        store.save("h1", snapshot(2.0)).unwrap();
        store.prune(90).unwrap();
        let history = store.history("h1", 100).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].composite_score, 2.0);
    }
}
