//! Archive serialization with atomic placement.
//!
//! The archive is written to a hidden temporary file in the target's directory
//! and renamed over the target only after every byte has been flushed and
//! synced. A failed write drops the temporary file, so a file at the target
//! path is always a complete archive.
//!
//! Named pipes become FIFO members in tar archives and are left out of zip
//! archives. Sockets and device nodes are left out of both. Neither is ever
//! opened, so a pipe with no writer cannot stall the run.

use crate::archive::format::ArchiveFormat;
use crate::fs::walker::{EntryKind, WalkEntry};
use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// An archive being written next to its final location.
pub struct StagedArchive {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedArchive {
    /// Create the temporary file in the directory that will hold `target`.
    ///
    /// On unix the file is requested with mode `0o666`, so the archive ends up
    /// with the same permissions as any other file the user creates under
    /// their umask.
    pub fn create(target: &Path) -> io::Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(".bak-").suffix(".partial");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let temp = builder.tempfile_in(dir)?;

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Serialize `entries` into the temporary file using `format`.
    pub fn write(&mut self, entries: &[WalkEntry], format: ArchiveFormat) -> io::Result<()> {
        let writer = BufWriter::new(self.temp.as_file());

        match format {
            ArchiveFormat::Zip => write_zip(writer, entries)?.flush()?,
            ArchiveFormat::Tar => write_tarball(writer, entries)?.flush()?,
            ArchiveFormat::GzTar => {
                let encoder = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
                write_tarball(encoder, entries)?.finish()?.flush()?
            }
            ArchiveFormat::BzTar => {
                let encoder = bzip2::write::BzEncoder::new(writer, bzip2::Compression::default());
                write_tarball(encoder, entries)?.finish()?.flush()?
            }
            ArchiveFormat::XzTar => {
                let encoder = xz2::write::XzEncoder::new(writer, 6);
                write_tarball(encoder, entries)?.finish()?.flush()?
            }
        }

        Ok(())
    }

    /// Sync the temporary file and rename it onto the target path.
    ///
    /// An existing file at the target is replaced.
    pub fn commit(self) -> io::Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        self.temp.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.target)
    }
}

fn write_tarball<W: Write>(writer: W, entries: &[WalkEntry]) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);

    for entry in entries {
        match entry.kind {
            EntryKind::Fifo => {
                let metadata = std::fs::symlink_metadata(&entry.path)?;
                let mut header = tar::Header::new_gnu();
                header.set_metadata_in_mode(&metadata, tar::HeaderMode::Complete);
                header.set_entry_type(tar::EntryType::Fifo);
                header.set_size(0);
                builder.append_data(&mut header, &entry.relative_path, io::empty())?;
            }
            EntryKind::Special => skip_special(entry),
            _ => builder.append_path_with_name(&entry.path, &entry.relative_path)?,
        }
    }

    builder.into_inner()
}

fn write_zip<W: Write + Seek>(writer: W, entries: &[WalkEntry]) -> io::Result<W> {
    let mut zip = ZipWriter::new(writer);

    for entry in entries {
        if matches!(entry.kind, EntryKind::Fifo | EntryKind::Special) {
            skip_special(entry);
            continue;
        }

        let name = zip_name(&entry.relative_path);
        let options = zip_options(&entry.path)?;

        match entry.kind {
            EntryKind::Dir => zip.add_directory(name, options).map_err(io::Error::other)?,
            EntryKind::Symlink => {
                let target = std::fs::read_link(&entry.path)?;
                zip.add_symlink(name, target.to_string_lossy(), options)
                    .map_err(io::Error::other)?
            }
            EntryKind::File => {
                let options = options.large_file(entry.size >= u64::from(u32::MAX));
                zip.start_file(name, options).map_err(io::Error::other)?;
                io::copy(&mut File::open(&entry.path)?, &mut zip)?;
            }
            EntryKind::Fifo | EntryKind::Special => {}
        }
    }

    zip.finish().map_err(io::Error::other)
}

fn skip_special(entry: &WalkEntry) {
    warn!(
        "Skipping {:?} entry {}: not storable in this format",
        entry.kind,
        entry.path.display()
    );
}

fn zip_options(path: &Path) -> io::Result<SimpleFileOptions> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    Ok(match unix_mode(path)? {
        Some(mode) => options.unix_permissions(mode),
        None => options,
    })
}

/// Zip member names always use `/` separators.
fn zip_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(std::fs::symlink_metadata(path)?.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> io::Result<Option<u32>> {
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::walker::{walk_directory, WalkOptions};
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample_tree(root: &Path) -> io::Result<()> {
        fs::create_dir_all(root.join("docs/empty"))?;
        fs::write(root.join("a.txt"), b"alpha")?;
        fs::write(root.join("docs/b.txt"), b"bravo")?;
        Ok(())
    }

    #[test]
    fn test_zip_name_uses_forward_slashes() {
        let relative: PathBuf = ["docs", "nested", "b.txt"].iter().collect();
        assert_eq!(zip_name(&relative), "docs/nested/b.txt");
    }

    #[test]
    fn test_gztar_roundtrip_tree() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        sample_tree(source.path())?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let target = out.path().join("backup.tar.gz");
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::GzTar)?;
        let written = staged.commit()?;
        assert_eq!(written, target);

        let unpacked = TempDir::new()?;
        let decoder = flate2::read::GzDecoder::new(File::open(&target)?);
        tar::Archive::new(decoder).unpack(unpacked.path())?;

        assert_eq!(fs::read(unpacked.path().join("a.txt"))?, b"alpha");
        assert_eq!(fs::read(unpacked.path().join("docs/b.txt"))?, b"bravo");
        assert!(unpacked.path().join("docs/empty").is_dir());

        Ok(())
    }

    #[test]
    fn test_zip_contains_tree() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        sample_tree(source.path())?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let target = out.path().join("backup.zip");
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::Zip)?;
        staged.commit()?;

        let mut archive = zip::ZipArchive::new(File::open(&target)?).map_err(io::Error::other)?;
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "docs/", "docs/b.txt", "docs/empty/"]);

        let mut content = String::new();
        archive
            .by_name("docs/b.txt")
            .map_err(io::Error::other)?
            .read_to_string(&mut content)?;
        assert_eq!(content, "bravo");

        Ok(())
    }

    #[cfg(unix)]
    fn tree_with_fifo(root: &Path) -> io::Result<()> {
        fs::write(root.join("a.txt"), b"alpha")?;
        let status = std::process::Command::new("mkfifo")
            .arg(root.join("pipe"))
            .status()?;
        assert!(status.success());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_zip_leaves_out_fifo() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        tree_with_fifo(source.path())?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let target = out.path().join("backup.zip");
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::Zip)?;
        staged.commit()?;

        let archive = zip::ZipArchive::new(File::open(&target)?).map_err(io::Error::other)?;
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["a.txt"]);

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_tar_stores_fifo_as_fifo_member() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        tree_with_fifo(source.path())?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let target = out.path().join("backup.tar.gz");
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::GzTar)?;
        staged.commit()?;

        let decoder = flate2::read::GzDecoder::new(File::open(&target)?);
        let mut archive = tar::Archive::new(decoder);
        let members: Vec<(PathBuf, tar::EntryType)> = archive
            .entries()?
            .map(|e| e.and_then(|e| Ok((e.path()?.into_owned(), e.header().entry_type()))))
            .collect::<io::Result<_>>()?;
        assert_eq!(
            members,
            vec![
                (PathBuf::from("a.txt"), tar::EntryType::Regular),
                (PathBuf::from("pipe"), tar::EntryType::Fifo),
            ]
        );

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_archive_mode_follows_umask() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new()?;
        let out = TempDir::new()?;
        fs::write(source.path().join("a.txt"), b"alpha")?;

        // A plain create is also requested as 0o666 and masked the same way
        let reference = out.path().join("reference");
        File::create(&reference)?;
        let expected = fs::metadata(&reference)?.permissions().mode() & 0o777;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let target = out.path().join("backup.tar");
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::Tar)?;
        staged.commit()?;

        assert_eq!(fs::metadata(&target)?.permissions().mode() & 0o777, expected);
        Ok(())
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() -> io::Result<()> {
        let out = TempDir::new()?;
        let target = out.path().join("backup.tar");

        let staged = StagedArchive::create(&target)?;
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        drop(staged);

        assert!(!temp_path.exists());
        assert!(!target.exists());
        assert_eq!(fs::read_dir(out.path())?.count(), 0);

        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_no_target() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        fs::write(source.path().join("a.txt"), b"alpha")?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        // Vanishes between the walk and the write
        fs::remove_file(source.path().join("a.txt"))?;

        let target = out.path().join("backup.tar");
        let mut staged = StagedArchive::create(&target)?;
        assert!(staged.write(&entries, ArchiveFormat::Tar).is_err());
        drop(staged);

        assert_eq!(fs::read_dir(out.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_commit_replaces_existing_target() -> io::Result<()> {
        let source = TempDir::new()?;
        let out = TempDir::new()?;
        fs::write(source.path().join("a.txt"), b"alpha")?;
        let target = out.path().join("backup.tar");
        fs::write(&target, b"stale")?;

        let entries = walk_directory(source.path(), &WalkOptions::default())?;
        let mut staged = StagedArchive::create(&target)?;
        staged.write(&entries, ArchiveFormat::Tar)?;
        staged.commit()?;

        let mut archive = tar::Archive::new(File::open(&target)?);
        let names: Vec<PathBuf> = archive
            .entries()?
            .map(|e| e.and_then(|e| e.path().map(|p| p.into_owned())))
            .collect::<io::Result<_>>()?;
        assert_eq!(names, vec![PathBuf::from("a.txt")]);
        assert_eq!(fs::read_dir(out.path())?.count(), 1);

        Ok(())
    }
}
