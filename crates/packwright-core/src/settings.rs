//! Settings for an archiving session.

use crate::ArchiveError;
use crate::Result;
use crate::paths;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// Default permission bits for the created archive file.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default deflate level.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// Configuration applied when an archiving session is opened.
///
/// Every setting is optional and independent of the others; defaults do not
/// depend on the archive format.
///
/// # Examples
///
/// ```
/// use packwright_core::ArchiveSettings;
///
/// let settings = ArchiveSettings::default()
///     .with_exclude_list(vec!["/srv/app/cache".into()])
///     .with_file_mode(0o600)
///     .with_symlink(true);
///
/// assert_eq!(settings.file_mode, 0o600);
/// assert!(settings.symlink);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSettings {
    /// Paths to skip during archiving.
    ///
    /// Entries are resolved to absolute form when the session opens; a
    /// directory in this list is skipped together with everything under it.
    ///
    /// Default: empty.
    pub exclude_list: Vec<PathBuf>,

    /// Permission bits of the created archive file.
    ///
    /// Also used as the entry mode for in-memory content, which has no
    /// source file to take permissions from. Entries read from the
    /// filesystem keep their source permissions and ignore this value.
    ///
    /// Default: `0o644`.
    pub file_mode: u32,

    /// Store symbolic links as link records.
    ///
    /// When `false`, links are dereferenced and the target's content is
    /// stored under the link's name.
    ///
    /// Default: `false`.
    pub symlink: bool,

    /// Deflate level (1-9) for ZIP entries and the TAR gzip stream.
    ///
    /// Default: `Some(6)`.
    pub compression_level: Option<u8>,

    /// Pin entry timestamps and ownership so identical inputs produce
    /// identical archives.
    ///
    /// Default: `false`.
    pub deterministic: bool,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            exclude_list: Vec::new(),
            file_mode: DEFAULT_FILE_MODE,
            symlink: false,
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
            deterministic: false,
        }
    }
}

impl ArchiveSettings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exclusion list.
    #[must_use]
    pub fn with_exclude_list(mut self, list: Vec<PathBuf>) -> Self {
        self.exclude_list = list;
        self
    }

    /// Sets the archive file mode.
    #[must_use]
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Sets whether symbolic links are stored as links.
    #[must_use]
    pub fn with_symlink(mut self, symlink: bool) -> Self {
        self.symlink = symlink;
        self
    }

    /// Sets the compression level.
    ///
    /// # Panics
    ///
    /// Panics if the level is not in the range 1-9.
    /// Use `validate()` for non-panicking validation.
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        assert!((1..=9).contains(&level), "compression level must be 1-9");
        self.compression_level = Some(level);
        self
    }

    /// Sets whether entry metadata is pinned for reproducible output.
    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` I/O error if the compression level is set
    /// but not in range 1-9.
    pub fn validate(&self) -> io::Result<()> {
        if let Some(level) = self.compression_level
            && !(1..=9).contains(&level)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("compression level must be 1-9, got {level}"),
            ));
        }
        if self.file_mode & !0o7777 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file mode has bits outside 0o7777: {:#o}", self.file_mode),
            ));
        }
        Ok(())
    }

    /// Validates the settings and resolves the exclusion list for a session
    /// writing to `destination`.
    pub(crate) fn resolve(self, destination: &Path) -> Result<SessionSettings> {
        self.validate()
            .map_err(ArchiveError::io_with("validate settings for", destination))?;
        let mut excluded: HashSet<PathBuf> = paths::resolve_exclude_list(&self.exclude_list)?
            .into_iter()
            .collect();
        // Never archive the archive being written.
        if let Ok(destination) = paths::absolute_path(destination) {
            excluded.insert(destination);
        }

        Ok(SessionSettings {
            excluded,
            file_mode: self.file_mode,
            symlink: self.symlink,
            compression_level: self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            deterministic: self.deterministic,
        })
    }
}

/// Settings owned by an open session, with exclusions in absolute form.
#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    excluded: HashSet<PathBuf>,
    pub(crate) file_mode: u32,
    pub(crate) symlink: bool,
    pub(crate) compression_level: u8,
    pub(crate) deterministic: bool,
}

impl SessionSettings {
    /// Returns `true` if the absolute form of `path` is excluded.
    ///
    /// A path that cannot be made absolute is never excluded; the
    /// subsequent filesystem access reports the problem.
    pub(crate) fn is_excluded(&self, path: &Path) -> bool {
        paths::absolute_path(path).is_ok_and(|absolute| self.excluded.contains(&absolute))
    }

    pub(crate) fn flate2_level(&self) -> flate2::Compression {
        match self.compression_level {
            6 => flate2::Compression::default(),
            n => flate2::Compression::new(u32::from(n.min(9))),
        }
    }
}
