//! Path resolution and archive naming.
//!
//! Archive names are `<base>_<YYYY-MM-DD_HH:MM:SS>.<extension>` with the
//! timestamp in UTC. Where `<base>` comes from is decided by [`NamingScheme`].

use crate::archive::format::ArchiveFormat;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
const JOURNAL_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the archive file name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// `<destination>_<timestamp>.<ext>`, written next to the destination directory
    #[default]
    Destination,
    /// `<destination>/<source name>_<timestamp>.<ext>`
    Source,
}

/// UTC instant truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at.trunc_subsecs(0))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Sortable form used inside archive file names.
    pub fn file_stamp(&self) -> String {
        self.0.format(FILE_STAMP_FORMAT).to_string()
    }
}

/// Human-readable form stored in the journal.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(JOURNAL_STAMP_FORMAT))
    }
}

/// Replace a leading `~` component with the current user's home directory.
///
/// `~user` forms are left untouched.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) if components.as_path().as_os_str().is_empty() => home,
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Home-expand and absolutize `path` without touching the filesystem.
///
/// Symlinks are not resolved. `.` components and trailing separators are
/// dropped and `..` is folded lexically, so the last component is always the
/// directory's own name unless the path is the root.
pub fn resolve_path(path: &Path) -> std::io::Result<PathBuf> {
    let expanded = expand_home(path);
    let absolute = std::path::absolute(&expanded)?;

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

/// Full path of the archive for already resolved `source` and `destination`.
pub fn archive_path(
    source: &Path,
    destination: &Path,
    timestamp: &Timestamp,
    format: ArchiveFormat,
    scheme: NamingScheme,
) -> PathBuf {
    let suffix = format!("_{}.{}", timestamp.file_stamp(), format.extension());

    match scheme {
        NamingScheme::Destination => match (destination.parent(), destination.file_name()) {
            (Some(parent), Some(name)) => parent.join(append(name, &suffix)),
            _ => destination.join(&suffix),
        },
        NamingScheme::Source => {
            let name = source
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| OsString::from("archive"));
            destination.join(append(&name, &suffix))
        }
    }
}

fn append(name: &std::ffi::OsStr, suffix: &str) -> OsString {
    let mut file_name = name.to_os_string();
    file_name.push(suffix);
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference_stamp() -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2020, 9, 12, 4, 6, 34).unwrap())
    }

    #[test]
    fn test_timestamp_formats() {
        let at = Utc.with_ymd_and_hms(2020, 9, 12, 4, 6, 34).unwrap()
            + chrono::Duration::milliseconds(870);
        let stamp = Timestamp::new(at);

        assert_eq!(stamp.file_stamp(), "2020-09-12_04:06:34");
        assert_eq!(stamp.to_string(), "2020-09-12 04:06:34");
        assert_eq!(stamp, reference_stamp());
    }

    #[test]
    #[cfg(unix)]
    fn test_reference_destination_scheme() {
        let path = archive_path(
            Path::new("/tmp/mydir"),
            Path::new("/home/user/alex"),
            &reference_stamp(),
            ArchiveFormat::Zip,
            NamingScheme::Destination,
        );
        assert_eq!(path, PathBuf::from("/home/user/alex_2020-09-12_04:06:34.zip"));
    }

    #[test]
    #[cfg(unix)]
    fn test_source_scheme() {
        let path = archive_path(
            Path::new("/tmp/mydir"),
            Path::new("/home/user/alex"),
            &reference_stamp(),
            ArchiveFormat::GzTar,
            NamingScheme::Source,
        );
        assert_eq!(
            path,
            PathBuf::from("/home/user/alex/mydir_2020-09-12_04:06:34.tar.gz")
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_destination_scheme_at_root() {
        let path = archive_path(
            Path::new("/tmp/mydir"),
            Path::new("/"),
            &reference_stamp(),
            ArchiveFormat::Tar,
            NamingScheme::Destination,
        );
        assert_eq!(path, PathBuf::from("/_2020-09-12_04:06:34.tar"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_drops_trailing_separator_and_dots() -> std::io::Result<()> {
        assert_eq!(
            resolve_path(Path::new("/home/user/alex/"))?,
            PathBuf::from("/home/user/alex")
        );
        assert_eq!(
            resolve_path(Path::new("/home/./user/alex/."))?,
            PathBuf::from("/home/user/alex")
        );
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_folds_parent_components() -> std::io::Result<()> {
        assert_eq!(resolve_path(Path::new("/a/b/.."))?, PathBuf::from("/a"));
        assert_eq!(resolve_path(Path::new("/a/b/../c/"))?, PathBuf::from("/a/c"));
        assert_eq!(resolve_path(Path::new("/.."))?, PathBuf::from("/"));

        let dest = resolve_path(Path::new("/home/user/alex/sub/.."))?;
        let path = archive_path(
            Path::new("/tmp/mydir"),
            &dest,
            &reference_stamp(),
            ArchiveFormat::Zip,
            NamingScheme::Destination,
        );
        assert_eq!(path, PathBuf::from("/home/user/alex_2020-09-12_04:06:34.zip"));
        Ok(())
    }

    #[test]
    fn test_resolve_relative_is_absolute() -> std::io::Result<()> {
        let resolved = resolve_path(Path::new("some/dir"))?;
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/dir"));
        Ok(())
    }

    #[test]
    fn test_expand_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home(Path::new("~")), home);
        assert_eq!(expand_home(Path::new("~/backups")), home.join("backups"));
        assert_eq!(expand_home(Path::new("~alex/x")), PathBuf::from("~alex/x"));
        assert_eq!(expand_home(Path::new("a/~/b")), PathBuf::from("a/~/b"));
    }

    #[test]
    #[cfg(windows)]
    fn test_reference_destination_scheme_windows() {
        let path = archive_path(
            Path::new(r"C:\tmp\mydir"),
            Path::new(r"C:\Users\alex"),
            &reference_stamp(),
            ArchiveFormat::Zip,
            NamingScheme::Destination,
        );
        assert_eq!(path, PathBuf::from(r"C:\Users\alex_2020-09-12_04:06:34.zip"));
    }
}
