//! Custom error types for archive creation and journaling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Destination is not writable: {}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write archive {}: {source}", path.display())]
    ArchiveWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Payload-free classification of an [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorKind {
    SourceNotFound,
    DestinationUnwritable,
    UnsupportedFormat,
    ArchiveWriteFailed,
}

impl ArchiveError {
    pub fn kind(&self) -> ArchiveErrorKind {
        match self {
            ArchiveError::SourceNotFound(_) => ArchiveErrorKind::SourceNotFound,
            ArchiveError::DestinationUnwritable { .. } => ArchiveErrorKind::DestinationUnwritable,
            ArchiveError::UnsupportedFormat(_) => ArchiveErrorKind::UnsupportedFormat,
            ArchiveError::ArchiveWriteFailed { .. } => ArchiveErrorKind::ArchiveWriteFailed,
        }
    }
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to write journal {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read journal {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl JournalError {
    pub(crate) fn write<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        JournalError::WriteFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn read<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        JournalError::ReadFailed {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Render an error with all of its causes, for the diagnostic log.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        cause = inner.source();
    }
    rendered
}
