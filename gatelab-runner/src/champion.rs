//! Champion store — the single persisted current-state record.
//!
//! Exactly one champion exists at any time. The record is overwritten
//! wholesale (write to temp file, then rename — atomic on POSIX); partial
//! field updates are impossible by construction.
//!
//! Concurrent runs serialize on a sentinel lock file: the read-decide-write
//! unit holds the lock from load to commit. A monotonically increasing
//! `version` is re-checked at commit time, so a run that lost the race
//! detects the fresh champion and retries its decision instead of
//! overwriting it.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use gatelab_core::StrategyParams;

use crate::metrics::SymbolMetrics;

/// The persisted champion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub symbol: String,
    pub params: StrategyParams,
    pub metrics: SymbolMetrics,
    /// Leaderboard score at the time of promotion.
    pub score: f64,
    /// Incremented on every replace; checked at commit time.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Champion {
    /// Short identity used in audit rows: `symbol@params_id[..12]`.
    pub fn identity(&self) -> String {
        let id = self.params.params_id();
        format!("{}@{}", self.symbol, &id[..12])
    }

    /// A neutral-metrics champion used when no record exists yet.
    pub fn bootstrap(symbol: impl Into<String>, params: StrategyParams, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            params,
            metrics: SymbolMetrics::neutral(),
            score: 0.0,
            version: 0,
            updated_at: now,
        }
    }
}

/// Errors from champion persistence.
#[derive(Debug, Error)]
pub enum ChampionError {
    #[error("champion I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("champion record corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("lock at {path} held by another run (gave up after {attempts} attempts)")]
    LockBusy { path: PathBuf, attempts: u32 },
    #[error("version conflict: expected {expected}, found {found} — another run committed first")]
    VersionConflict { expected: u64, found: u64 },
}

/// Held for the duration of one read-decide-write unit. Dropping releases
/// the sentinel file.
#[derive(Debug)]
pub struct StoreGuard {
    lock_path: PathBuf,
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// File-backed champion store.
#[derive(Debug, Clone)]
pub struct ChampionStore {
    path: PathBuf,
    lock_attempts: u32,
    lock_backoff: Duration,
}

impl ChampionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_attempts: 50,
            lock_backoff: Duration::from_millis(100),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut p = self.path.clone();
        p.set_extension("lock");
        p
    }

    /// Acquire the store lock, retrying with backoff while another run
    /// holds it.
    pub fn lock(&self) -> Result<StoreGuard, ChampionError> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        for attempt in 0..self.lock_attempts {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(_) => return Ok(StoreGuard { lock_path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if attempt + 1 < self.lock_attempts {
                        thread::sleep(self.lock_backoff);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ChampionError::LockBusy {
            path: lock_path,
            attempts: self.lock_attempts,
        })
    }

    /// Load the current champion, or `None` when no record exists.
    pub fn load(&self) -> Result<Option<Champion>, ChampionError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the current champion, bootstrapping a neutral record if none
    /// exists yet. The bootstrap is persisted so later runs agree on it.
    pub fn load_or_bootstrap(
        &self,
        _guard: &StoreGuard,
        symbol: &str,
        params: &StrategyParams,
        now: DateTime<Utc>,
    ) -> Result<Champion, ChampionError> {
        if let Some(champion) = self.load()? {
            return Ok(champion);
        }
        let champion = Champion::bootstrap(symbol, params.clone(), now);
        self.write_record(&champion)?;
        info!(symbol, "bootstrapped neutral champion");
        Ok(champion)
    }

    /// Commit a replacement champion.
    ///
    /// Requires the lock guard (proof the caller is inside the serialized
    /// unit) and the version the caller's decision was based on. The new
    /// record's version becomes `expected_version + 1`. If the on-disk
    /// record advanced past `expected_version`, the commit is refused and
    /// the caller must re-decide against the fresh champion.
    pub fn commit(
        &self,
        _guard: &StoreGuard,
        mut new_champion: Champion,
        expected_version: u64,
    ) -> Result<Champion, ChampionError> {
        if let Some(current) = self.load()? {
            if current.version != expected_version {
                return Err(ChampionError::VersionConflict {
                    expected: expected_version,
                    found: current.version,
                });
            }
        }
        new_champion.version = expected_version + 1;
        self.write_record(&new_champion)?;
        Ok(new_champion)
    }

    /// Whole-record write: temp file + rename, never an in-place update.
    fn write_record(&self, champion: &Champion) -> Result<(), ChampionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        let json = serde_json::to_string_pretty(champion)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
