//! Backup CLI Library
//!
//! Archives a directory into a timestamped compressed file and records every
//! attempt in an append-only journal.

pub mod archive;
pub mod clock;
pub mod config;
pub mod fs;
pub mod invocation;
pub mod journal;
pub mod utils;

// Re-export commonly used types
pub use archive::format::ArchiveFormat;
pub use archive::naming::NamingScheme;
pub use archive::{ArchiveOutcome, Archiver, BackupRequest};
pub use config::Config;
pub use invocation::{run_backup, InvocationReport, InvocationStatus};
pub use journal::{record_invocation, JournalRecord, JournalRecorder, JournalStatus};
pub use utils::errors::{ArchiveError, ArchiveErrorKind, JournalError};
