//! Archive format tags and integrity results.

use crate::ArchiveError;
use crate::Result;
use crate::digest;
use std::fmt;
use std::fs::File;
use std::io::Seek;
use std::path::Path;

/// Archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiverType {
    /// ZIP archive.
    Zip,
    /// Gzip-compressed TAR archive.
    Tar,
}

impl ArchiverType {
    /// Returns the format tag (`"zip"` or `"tar"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
        }
    }

    /// Returns the conventional file extension for the format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar.gz",
        }
    }

    /// Looks up a format by tag. Tags are case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use packwright_core::ArchiverType;
    ///
    /// assert_eq!(ArchiverType::from_tag("ZIP"), Some(ArchiverType::Zip));
    /// assert_eq!(ArchiverType::from_tag("7z"), None);
    /// ```
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "zip" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            _ => None,
        }
    }

    /// Infers the format from an output file name.
    ///
    /// `.zip` maps to ZIP; `.tar.gz` and `.tgz` map to TAR.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integrity metadata of a finished archive file.
///
/// Derived purely from file content; it has no link back to the session that
/// produced the file.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::ArchiverResult;
/// use std::path::Path;
///
/// let result = ArchiverResult::from_path(Path::new("dist/app.zip"))?;
/// println!("{} bytes, sha256 {}", result.size, result.sha256);
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiverResult {
    /// Hex-encoded SHA-256 digest.
    pub sha256: String,
    /// Hex-encoded MD5 digest, for deduplication rather than security.
    pub md5: String,
    /// Size in bytes.
    pub size: u64,
}

impl ArchiverResult {
    /// Computes digests and size of the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the file cannot be opened, read or
    /// stat'ed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(ArchiveError::io_with("open", path))?;

        let sha256 =
            digest::sha256_hex(&mut file).map_err(ArchiveError::io_with("hash", path))?;
        file.rewind().map_err(ArchiveError::io_with("rewind", path))?;
        let md5 = digest::md5_hex(&mut file).map_err(ArchiveError::io_with("hash", path))?;
        let size = digest::file_size(path).map_err(ArchiveError::io_with("stat", path))?;

        Ok(Self { sha256, md5, size })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_archiver_type_tags() {
        assert_eq!(ArchiverType::Zip.as_str(), "zip");
        assert_eq!(ArchiverType::Tar.to_string(), "tar");
        assert_eq!(ArchiverType::from_tag("tar"), Some(ArchiverType::Tar));
        assert_eq!(ArchiverType::from_tag("gzip"), None);
    }

    #[test]
    fn test_archiver_type_from_path() {
        assert_eq!(
            ArchiverType::from_path(&PathBuf::from("out/Bundle.ZIP")),
            Some(ArchiverType::Zip)
        );
        assert_eq!(
            ArchiverType::from_path(&PathBuf::from("release.tar.gz")),
            Some(ArchiverType::Tar)
        );
        assert_eq!(
            ArchiverType::from_path(&PathBuf::from("release.tgz")),
            Some(ArchiverType::Tar)
        );
        assert_eq!(ArchiverType::from_path(&PathBuf::from("release.tar")), None);
        assert_eq!(ArchiverType::from_path(&PathBuf::from("/")), None);
    }

    #[test]
    fn test_archiver_result_from_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob");
        fs::write(&path, "hello").unwrap();

        let result = ArchiverResult::from_path(&path).unwrap();
        assert_eq!(result.size, 5);
        assert_eq!(result.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            result.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_archiver_result_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.zip");
        let err = ArchiverResult::from_path(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Io { operation: "open", .. }));
    }
}
