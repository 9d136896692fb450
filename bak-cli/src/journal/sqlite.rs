//! SQLite journal store.

use super::{JournalRecord, JournalStatus};
use crate::utils::JournalError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS journal (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  source_path TEXT NOT NULL,
  archive_path TEXT,
  timestamp TEXT NOT NULL,
  status TEXT NOT NULL CHECK(status IN ('success','fail'))
);
"#;

/// Other processes may hold the write lock briefly while appending.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

impl ToSql for JournalStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for JournalStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "success" => Ok(JournalStatus::Success),
            "fail" => Ok(JournalStatus::Fail),
            other => Err(FromSqlError::Other(
                format!("unknown journal status: {other}").into(),
            )),
        }
    }
}

fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA synchronous = FULL;")?;
    Ok(conn)
}

pub fn append(path: &Path, record: &JournalRecord) -> Result<(), JournalError> {
    insert(path, record).map_err(|e| JournalError::write(path, e))
}

fn insert(path: &Path, record: &JournalRecord) -> rusqlite::Result<()> {
    let mut conn = open(path)?;
    // Write lock before the schema check, so waiting happens in the busy handler
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(SCHEMA)?;
    tx.execute(
        "INSERT INTO journal (source_path, archive_path, timestamp, status) VALUES (?1, ?2, ?3, ?4)",
        params![
            record.source_path,
            record.archive_path,
            record.timestamp,
            record.status
        ],
    )?;
    tx.commit()
}

pub fn read_all(path: &Path) -> Result<Vec<JournalRecord>, JournalError> {
    select_all(path).map_err(|e| JournalError::read(path, e))
}

fn select_all(path: &Path) -> rusqlite::Result<Vec<JournalRecord>> {
    let conn = open(path)?;
    conn.execute_batch(SCHEMA)?;
    let mut stmt = conn.prepare(
        "SELECT source_path, archive_path, timestamp, status FROM journal ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(JournalRecord {
            source_path: row.get(0)?,
            archive_path: row.get(1)?,
            timestamp: row.get(2)?,
            status: row.get(3)?,
        })
    })?;
    rows.collect()
}
