//! Utility modules for the backup CLI.

pub mod errors;
pub mod logger;

pub use errors::{ArchiveError, ArchiveErrorKind, JournalError};
