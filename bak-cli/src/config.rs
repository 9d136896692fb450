//! Configuration management for the backup CLI.
//!
//! Loads configuration from an optional TOML file. Command-line flags are
//! applied on top by the binary.

use crate::archive::naming::NamingScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the journal created next to the program by default.
pub const DEFAULT_JOURNAL_NAME: &str = "journal";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub journal: JournalConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Compression format (zip, tar, gztar, bztar, xztar)
    #[serde(default = "default_format")]
    pub format: String,

    /// How the archive file name is derived
    #[serde(default)]
    pub naming: NamingScheme,

    /// File-name substrings skipped during the directory walk
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal location; `.db`, `.sqlite` and `.sqlite3` select SQLite
    #[serde(default = "default_journal_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory holding the rotated diagnostic log files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Number of rotated files kept (one per day)
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

// Default values
fn default_format() -> String {
    "gztar".to_string()
}

fn default_journal_path() -> PathBuf {
    program_dir().join(DEFAULT_JOURNAL_NAME)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    program_dir()
}

fn default_max_log_files() -> usize {
    30
}

/// Directory containing the running executable, or `.` if it cannot be found.
pub fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            naming: NamingScheme::default(),
            exclude: Vec::new(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: default_journal_path(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            max_files: default_max_log_files(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.archive.format, "gztar");
        assert_eq!(config.archive.naming, NamingScheme::Destination);
        assert!(config.archive.exclude.is_empty());
        assert_eq!(
            config.journal.path.file_name().and_then(|n| n.to_str()),
            Some(DEFAULT_JOURNAL_NAME)
        );
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.max_files, 30);
    }

    #[test]
    fn test_partial_file_is_filled_with_defaults() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("bak.toml");
        std::fs::write(
            &path,
            r#"
[archive]
format = "zip"
naming = "source"

[log]
level = "debug"
"#,
        )?;

        let config = Config::from_file(&path)?;
        assert_eq!(config.archive.format, "zip");
        assert_eq!(config.archive.naming, NamingScheme::Source);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.max_files, 30);
        assert_eq!(config.journal.path, default_journal_path());

        Ok(())
    }

    #[test]
    fn test_invalid_file_is_an_error() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("bak.toml");
        std::fs::write(&path, "[archive]\nnaming = \"sideways\"\n")?;

        assert!(Config::from_file(&path).is_err());
        assert!(Config::from_file(&temp_dir.path().join("missing.toml")).is_err());

        Ok(())
    }
}
