//! Append-only journal of backup attempts.
//!
//! Every invocation adds exactly one record, whether the archive was created
//! or not. Two stores are supported and picked from the journal path: SQLite
//! for `.db`, `.sqlite` and `.sqlite3`, CSV for everything else.

pub mod csv_file;
pub mod sqlite;

use crate::archive::naming::expand_home;
use crate::archive::ArchiveOutcome;
use crate::utils::errors::error_chain;
use crate::utils::JournalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

const SQLITE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    Success,
    Fail,
}

impl JournalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalStatus::Success => "success",
            JournalStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the journal. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub source_path: String,
    /// Absent when no archive was created
    pub archive_path: Option<String>,
    /// UTC, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub status: JournalStatus,
}

impl From<&ArchiveOutcome> for JournalRecord {
    fn from(outcome: &ArchiveOutcome) -> Self {
        Self {
            source_path: outcome.source.to_string_lossy().to_string(),
            archive_path: outcome
                .archive_path()
                .map(|p| p.to_string_lossy().to_string()),
            timestamp: outcome.timestamp.to_string(),
            status: outcome.status(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalBackend {
    Csv,
    Sqlite,
}

impl JournalBackend {
    pub fn for_path(path: &Path) -> Self {
        let is_sqlite = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SQLITE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if is_sqlite {
            JournalBackend::Sqlite
        } else {
            JournalBackend::Csv
        }
    }
}

/// Handle to a journal location, passed to whoever needs to record attempts.
#[derive(Debug, Clone)]
pub struct JournalRecorder {
    path: PathBuf,
    backend: JournalBackend,
}

impl JournalRecorder {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = expand_home(path.as_ref());
        let backend = JournalBackend::for_path(&path);
        Self { path, backend }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> JournalBackend {
        self.backend
    }

    /// Append the record describing `outcome`. A failed outcome still
    /// produces a complete row.
    pub fn record_invocation(&self, outcome: &ArchiveOutcome) -> Result<(), JournalError> {
        self.append(&JournalRecord::from(outcome))
    }

    pub fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let result = match self.backend {
            JournalBackend::Csv => csv_file::append(&self.path, record),
            JournalBackend::Sqlite => sqlite::append(&self.path, record),
        };

        match &result {
            Ok(()) => debug!(
                "Journal {:?} entry appended to {} (status: {})",
                self.backend,
                self.path.display(),
                record.status
            ),
            Err(e) => error!("{}", error_chain(e)),
        }

        result
    }

    /// All records in insertion order; a journal that does not exist yet is empty.
    pub fn read_records(&self) -> Result<Vec<JournalRecord>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        match self.backend {
            JournalBackend::Csv => csv_file::read_all(&self.path),
            JournalBackend::Sqlite => sqlite::read_all(&self.path),
        }
    }
}

/// Record `outcome` in the journal at `journal_path`.
pub fn record_invocation(outcome: &ArchiveOutcome, journal_path: &Path) -> Result<(), JournalError> {
    JournalRecorder::new(journal_path).record_invocation(outcome)
}
