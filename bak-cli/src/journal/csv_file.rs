//! CSV journal store.
//!
//! Each append opens the file in append mode and holds an exclusive lock
//! while it checks for the header and writes one complete row in a single
//! `write_all`, so concurrent processes never interleave partial rows.

use super::JournalRecord;
use crate::utils::JournalError;
use fs2::FileExt;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

type BoxError = Box<dyn Error + Send + Sync>;

pub fn append(path: &Path, record: &JournalRecord) -> Result<(), JournalError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| JournalError::write(path, e))?;

    file.lock_exclusive().map_err(|e| JournalError::write(path, e))?;
    let result = write_locked(&mut file, record);
    // Closing the file releases the lock as well
    if let Err(e) = FileExt::unlock(&file) {
        debug!("Unlocking journal {} failed: {}", path.display(), e);
    }

    result.map_err(|e| JournalError::write(path, e))
}

fn write_locked(file: &mut File, record: &JournalRecord) -> Result<(), BoxError> {
    // The header goes in only while the file is still empty
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    let row = writer.into_inner().map_err(|e| e.into_error())?;

    file.write_all(&row)?;
    file.sync_data()?;
    Ok(())
}

pub fn read_all(path: &Path) -> Result<Vec<JournalRecord>, JournalError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| JournalError::read(path, e))?;

    reader
        .deserialize()
        .collect::<Result<Vec<JournalRecord>, csv::Error>>()
        .map_err(|e| JournalError::read(path, e))
}
