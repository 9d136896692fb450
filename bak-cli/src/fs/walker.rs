//! Directory traversal for archive creation.
//!
//! Produces every entry below a root (directories included, so empty ones
//! survive in the archive) with its path relative to that root.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Entries whose file name contains any of these are skipped, along with
    /// everything beneath them
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Named pipe. Never opened for reading.
    Fifo,
    /// Socket or device node
    Special,
}

/// An entry discovered during walking
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Full path to the entry
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    pub kind: EntryKind,

    /// Size in bytes (0 for anything but regular files)
    pub size: u64,
}

impl WalkEntry {
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Self> {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let file_type = entry.file_type();

        // Symlinks are recorded as links; their targets are never followed
        let (kind, size) = if file_type.is_symlink() {
            (EntryKind::Symlink, 0)
        } else if file_type.is_dir() {
            (EntryKind::Dir, 0)
        } else if file_type.is_file() {
            (EntryKind::File, entry.metadata()?.len())
        } else if is_fifo(&file_type) {
            (EntryKind::Fifo, 0)
        } else {
            (EntryKind::Special, 0)
        };

        Ok(Self {
            path,
            relative_path,
            kind,
            size,
        })
    }
}

/// Walk a directory tree and collect all entries below `root`, sorted by name
/// within each directory. The root itself is not included.
///
/// # Example
/// ```no_run
/// use bak_cli::fs::walker::{walk_directory, WalkOptions};
/// use std::path::Path;
///
/// let entries = walk_directory(Path::new("/data"), &WalkOptions::default()).unwrap();
/// println!("Found {} entries", entries.len());
/// ```
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<WalkEntry>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !should_exclude(entry, &options.exclude_patterns));

    for entry in walker {
        let entry = entry?;
        entries.push(WalkEntry::from_entry(&entry, root)?);
    }

    Ok(entries)
}

/// Total size of all regular files in `entries`
pub fn total_size(entries: &[WalkEntry]) -> u64 {
    entries.iter().map(|e| e.size).sum()
}

#[cfg(unix)]
fn is_fifo(file_type: &std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    file_type.is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_file_type: &std::fs::FileType) -> bool {
    false
}

/// Check if a directory entry should be excluded based on patterns
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern.as_str()))
}
