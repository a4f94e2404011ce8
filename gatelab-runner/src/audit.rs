//! Audit log — append-only CSV, one row per refresh decision.
//!
//! Every run appends exactly one entry, whether the champion changed or
//! not, so the log is a complete decision history rather than a changelog.
//! Rows are never edited or deleted; the writer opens in append mode and
//! emits the header only when creating the file.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The refresh engine's decision for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshDecision {
    Retain,
    Replace,
}

/// One append-only audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub run_ts: DateTime<Utc>,
    pub decision: RefreshDecision,
    /// `symbol@params_id` of the champion before the decision.
    pub champion_before: String,
    /// `symbol@params_id` after the decision (same as before on retain).
    pub champion_after: String,
    pub rationale: String,
}

/// Errors from audit log I/O.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("audit CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Append-only CSV audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. The header is written only when the file is new.
    pub fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every entry in append order. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            entries.push(row?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(decision: RefreshDecision, minute: u32) -> AuditEntry {
        AuditEntry {
            run_ts: Utc.with_ymd_and_hms(2024, 3, 4, 21, minute, 0).unwrap(),
            decision,
            champion_before: "QQQ@abc123".into(),
            champion_after: match decision {
                RefreshDecision::Retain => "QQQ@abc123".into(),
                RefreshDecision::Replace => "QQQ@def456".into(),
            },
            rationale: "test".into(),
        }
    }

    #[test]
    fn append_and_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path().join("audit.csv"));

        log.append(&entry(RefreshDecision::Retain, 0)).unwrap();
        log.append(&entry(RefreshDecision::Replace, 1)).unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision, RefreshDecision::Retain);
        assert_eq!(entries[1].decision, RefreshDecision::Replace);
        assert_eq!(entries[1].champion_after, "QQQ@def456");
    }

    #[test]
    fn n_appends_yield_n_rows_in_order() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path().join("audit.csv"));

        for i in 0..5 {
            log.append(&entry(RefreshDecision::Retain, i)).unwrap();
        }
        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 5);
        let stamps: Vec<_> = entries.iter().map(|e| e.run_ts).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
    }

    #[test]
    fn existing_rows_survive_later_appends() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path().join("audit.csv"));

        log.append(&entry(RefreshDecision::Replace, 0)).unwrap();
        let first = log.read_all().unwrap();
        log.append(&entry(RefreshDecision::Retain, 1)).unwrap();
        let both = log.read_all().unwrap();

        assert_eq!(both[0], first[0]);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn missing_file_is_empty_log() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path().join("nope.csv"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn header_written_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("audit.csv");
        let log = AuditLog::new(&path);
        log.append(&entry(RefreshDecision::Retain, 0)).unwrap();
        log.append(&entry(RefreshDecision::Retain, 1)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header_count = contents.lines().filter(|l| l.starts_with("run_ts")).count();
        assert_eq!(header_count, 1);
    }
}
