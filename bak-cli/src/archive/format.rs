//! Supported archive container and compression formats.

use crate::utils::ArchiveError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    #[default]
    GzTar,
    BzTar,
    XzTar,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 5] = [
        ArchiveFormat::Zip,
        ArchiveFormat::Tar,
        ArchiveFormat::GzTar,
        ArchiveFormat::BzTar,
        ArchiveFormat::XzTar,
    ];

    /// Name accepted on the command line and in the config file.
    pub fn name(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::GzTar => "gztar",
            ArchiveFormat::BzTar => "bztar",
            ArchiveFormat::XzTar => "xztar",
        }
    }

    /// File extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::GzTar => "tar.gz",
            ArchiveFormat::BzTar => "tar.bz2",
            ArchiveFormat::XzTar => "tar.xz",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArchiveFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| ArchiveError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ArchiveErrorKind;

    #[test]
    fn test_parse_known_formats() {
        for format in ArchiveFormat::ALL {
            assert_eq!(format.name().parse::<ArchiveFormat>().ok(), Some(format));
        }
        assert_eq!(ArchiveFormat::default(), ArchiveFormat::GzTar);
    }

    #[test]
    fn test_parse_unknown_format() {
        for bad in ["rar", "", "ZIP", "tar.gz", " zip"] {
            let err = bad.parse::<ArchiveFormat>().unwrap_err();
            assert_eq!(err.kind(), ArchiveErrorKind::UnsupportedFormat);
        }
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ArchiveFormat::Zip.extension(), "zip");
        assert_eq!(ArchiveFormat::Tar.extension(), "tar");
        assert_eq!(ArchiveFormat::GzTar.extension(), "tar.gz");
        assert_eq!(ArchiveFormat::BzTar.extension(), "tar.bz2");
        assert_eq!(ArchiveFormat::XzTar.extension(), "tar.xz");
    }
}
