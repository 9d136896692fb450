//! One program run: archive, then journal the attempt, then report.

use crate::archive::{ArchiveOutcome, Archiver, BackupRequest};
use crate::clock::Clock;
use crate::journal::JournalRecorder;
use crate::utils::JournalError;
use std::io::{self, Write};
use tracing::{error, info};

pub const BACKUP_FAILED_NOTICE: &str =
    "Error: backup failed. Check the journal and the log file for details.";
pub const JOURNAL_FAILED_NOTICE: &str =
    "Warning: backup created but could not be recorded in the journal. Check the log file for details.";
pub const BOTH_FAILED_NOTICE: &str =
    "Error: backup failed and could not be recorded in the journal. Check the log file for details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    Success,
    BackupFailed,
    /// The archive exists but the journal append failed
    JournalFailed,
}

impl InvocationStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            InvocationStatus::Success => 0,
            InvocationStatus::BackupFailed => 1,
            InvocationStatus::JournalFailed => 3,
        }
    }
}

#[derive(Debug)]
pub struct InvocationReport {
    pub outcome: ArchiveOutcome,
    pub journal: Result<(), JournalError>,
}

impl InvocationReport {
    pub fn status(&self) -> InvocationStatus {
        match (&self.outcome.result, &self.journal) {
            (Err(_), _) => InvocationStatus::BackupFailed,
            (Ok(_), Err(_)) => InvocationStatus::JournalFailed,
            (Ok(_), Ok(())) => InvocationStatus::Success,
        }
    }

    /// Print the archive path on success and a short notice on failure.
    /// Error details stay in the diagnostic log.
    pub fn print(&self, stdout: &mut impl Write, stderr: &mut impl Write) -> io::Result<()> {
        if let Some(path) = self.outcome.archive_path() {
            writeln!(stdout, "{}", path.display())?;
        }

        match (self.outcome.result.is_ok(), self.journal.is_ok()) {
            (true, true) => {}
            (true, false) => writeln!(stderr, "{JOURNAL_FAILED_NOTICE}")?,
            (false, true) => writeln!(stderr, "{BACKUP_FAILED_NOTICE}")?,
            (false, false) => writeln!(stderr, "{BOTH_FAILED_NOTICE}")?,
        }

        Ok(())
    }
}

/// Run the archiver once and append exactly one journal record for it.
pub fn run_backup<C: Clock>(
    request: &BackupRequest,
    archiver: &Archiver<C>,
    journal: &JournalRecorder,
) -> InvocationReport {
    info!("Backup started");

    let outcome = archiver.run(request);
    let journal_result = journal.record_invocation(&outcome);

    let report = InvocationReport {
        outcome,
        journal: journal_result,
    };

    match report.status() {
        InvocationStatus::Success => info!("Backup done"),
        InvocationStatus::BackupFailed => error!("Backup done with status fail"),
        InvocationStatus::JournalFailed => error!(
            "Backup done but the journal at {} was not updated",
            journal.path().display()
        ),
    }

    report
}
