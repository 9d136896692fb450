//! Archive creation: resolve paths, name the archive, walk the source and
//! write the compressed result.

pub mod format;
pub mod naming;
pub mod writer;

use crate::clock::{Clock, SystemClock};
use crate::fs::walker::{total_size, walk_directory, WalkOptions};
use crate::journal::JournalStatus;
use crate::utils::errors::error_chain;
use crate::utils::ArchiveError;
use format::ArchiveFormat;
use naming::{NamingScheme, Timestamp};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use writer::StagedArchive;

/// One backup attempt as requested on the command line.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Format name; validated by the archiver so a bad value is still journaled
    pub format: String,
}

impl BackupRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            format: format.into(),
        }
    }
}

/// Result of one archiver run, consumed by the journal and by the CLI.
#[derive(Debug)]
pub struct ArchiveOutcome {
    /// Absolute source path (home-expanded, even when archiving failed)
    pub source: PathBuf,
    pub timestamp: Timestamp,
    pub result: Result<PathBuf, ArchiveError>,
}

impl ArchiveOutcome {
    pub fn archive_path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn status(&self) -> JournalStatus {
        if self.result.is_ok() {
            JournalStatus::Success
        } else {
            JournalStatus::Fail
        }
    }
}

/// Creates archives. The clock is injected so names can be pinned in tests.
#[derive(Debug, Clone)]
pub struct Archiver<C: Clock = SystemClock> {
    clock: C,
    naming: NamingScheme,
    walk: WalkOptions,
}

impl Archiver<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Archiver<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Archiver<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            naming: NamingScheme::default(),
            walk: WalkOptions::default(),
        }
    }

    pub fn naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    /// Skip entries whose file name contains any of `patterns`.
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.walk.exclude_patterns = patterns;
        self
    }

    /// Archive `source` according to `destination` and `format`, returning
    /// the absolute path of the written archive.
    pub fn create_archive(
        &self,
        source: &Path,
        destination: &Path,
        format: &str,
    ) -> Result<PathBuf, ArchiveError> {
        self.archive_at(source, destination, format, Timestamp::new(self.clock.now()))
    }

    /// Run `request` and capture everything the journal needs, failures included.
    pub fn run(&self, request: &BackupRequest) -> ArchiveOutcome {
        let timestamp = Timestamp::new(self.clock.now());
        let source =
            naming::resolve_path(&request.source).unwrap_or_else(|_| request.source.clone());

        info!(
            "Archiving {} into {} (format: {}, naming: {:?})",
            source.display(),
            request.destination.display(),
            request.format,
            self.naming
        );

        let result = self.archive_at(&request.source, &request.destination, &request.format, timestamp);

        match &result {
            Ok(path) => info!("Created archive {}", path.display()),
            Err(e) => warn!("Archive failed ({:?}): {}", e.kind(), error_chain(e)),
        }

        ArchiveOutcome {
            source,
            timestamp,
            result,
        }
    }

    fn archive_at(
        &self,
        source: &Path,
        destination: &Path,
        format: &str,
        timestamp: Timestamp,
    ) -> Result<PathBuf, ArchiveError> {
        // Checked before touching the filesystem
        let format: ArchiveFormat = format.parse()?;

        let source = naming::resolve_path(source)
            .map_err(|_| ArchiveError::SourceNotFound(source.to_path_buf()))?;
        let destination =
            naming::resolve_path(destination).map_err(|e| ArchiveError::DestinationUnwritable {
                path: destination.to_path_buf(),
                source: Some(e),
            })?;

        if !source.is_dir() {
            return Err(ArchiveError::SourceNotFound(source));
        }
        if !destination.is_dir() {
            return Err(ArchiveError::DestinationUnwritable {
                path: destination,
                source: None,
            });
        }

        let target = naming::archive_path(&source, &destination, &timestamp, format, self.naming);
        let write_failed = |source: io::Error| ArchiveError::ArchiveWriteFailed {
            path: target.clone(),
            source,
        };

        let entries = walk_directory(&source, &self.walk).map_err(write_failed)?;
        debug!(
            "Walked {}: {} entries, {} bytes",
            source.display(),
            entries.len(),
            total_size(&entries)
        );

        let mut staged = StagedArchive::create(&target).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                ArchiveError::DestinationUnwritable {
                    path: target.parent().unwrap_or(&destination).to_path_buf(),
                    source: Some(e),
                }
            }
            _ => write_failed(e),
        })?;
        debug!("Staging archive at {}", staged.temp_path().display());

        staged.write(&entries, format).map_err(write_failed)?;
        staged.commit().map_err(write_failed)
    }
}
