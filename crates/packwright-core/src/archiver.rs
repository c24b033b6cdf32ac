//! The archiving contract, its session state machine and the format factory.
//!
//! An [`Archiver`] is one archiving session: it is opened with a destination
//! and settings, receives any number of add-content calls, and is closed to
//! finalize the container. Both format backends share the traversal,
//! exclusion and symlink logic in `Session` and differ only in how entries
//! are written (see `EntryWriter`).

use crate::ArchiveError;
use crate::ArchiveSettings;
use crate::ArchiverResult;
use crate::ArchiverType;
use crate::Result;
use crate::SessionPhase;
use crate::formats::tar::TarArchiver;
use crate::formats::zip::ZipArchiver;
use crate::paths;
use crate::settings::SessionSettings;
use crate::walker;
use std::fs;
use std::fs::File;
use std::fs::Metadata;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// An archiving session over one output file.
///
/// Calls on one instance must be sequential. Independent instances writing
/// to different destinations share no state.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::ArchiveSettings;
/// use packwright_core::ArchiverType;
/// use packwright_core::new_archiver;
/// use std::path::Path;
///
/// let mut archiver = new_archiver(ArchiverType::Zip);
/// archiver.open(Path::new("site.zip"), ArchiveSettings::default())?;
/// archiver.archive_dir(Path::new("public"), "")?;
/// archiver.archive_content(b"v1.4.2\n", "VERSION")?;
/// archiver.close()?;
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
pub trait Archiver: Send {
    /// Creates `destination` and prepares the container writer.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidState`] if the session was already
    /// opened, [`ArchiveError::PathResolution`] if an exclusion entry cannot
    /// be resolved, or [`ArchiveError::Io`] if the file cannot be created.
    fn open(&mut self, destination: &Path, settings: ArchiveSettings) -> Result<()>;

    /// Adds the file at `source` under `entry_name`.
    ///
    /// An excluded `source` is skipped and reported as success. Symbolic
    /// links are stored or dereferenced according to
    /// [`ArchiveSettings::symlink`]. A directory is added as a tree.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidState`] outside an open session, or an
    /// I/O or link resolution error.
    fn archive_file(&mut self, source: &Path, entry_name: &str) -> Result<()>;

    /// Adds the tree under `source`, naming entries by their path relative to
    /// `source` prefixed with `entry_root`.
    ///
    /// Directories get their own entries so empty directories survive. An
    /// empty `entry_root` places the tree's contents at the archive root
    /// without an entry for `source` itself.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidState`] outside an open session, or an
    /// I/O or link resolution error for the first entry that fails.
    fn archive_dir(&mut self, source: &Path, entry_root: &str) -> Result<()>;

    /// Adds `content` as a regular file entry named `entry_name`.
    ///
    /// The entry mode is [`ArchiveSettings::file_mode`]; exclusions do not
    /// apply.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidState`] outside an open session, or an
    /// I/O error if the entry cannot be written.
    fn archive_content(&mut self, content: &[u8], entry_name: &str) -> Result<()>;

    /// Finalizes the container and releases the output file.
    ///
    /// The session is closed afterwards even if finalization fails.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidState`] if the session is not open, or
    /// [`ArchiveError::Io`] if finalization fails, which means the archive
    /// on disk may be truncated. A TAR session also fails to close once an
    /// entry's payload was cut short mid-write.
    fn close(&mut self) -> Result<()>;

    /// Returns the container format written by this archiver.
    fn format(&self) -> ArchiverType;

    /// Returns the current session phase.
    fn phase(&self) -> SessionPhase;
}

/// Creates an unopened archiver for `format`.
///
/// No I/O happens until [`Archiver::open`].
#[must_use]
pub fn new_archiver(format: ArchiverType) -> Box<dyn Archiver> {
    match format {
        ArchiverType::Zip => Box::new(ZipArchiver::new()),
        ArchiverType::Tar => Box::new(TarArchiver::new()),
    }
}

/// Creates an unopened archiver from a format tag such as `"zip"`.
///
/// # Panics
///
/// Panics if `tag` does not name a supported format. Tags are expected to be
/// validated by the caller; an unknown tag here is a contract violation.
#[must_use]
pub fn new_archiver_for_tag(tag: &str) -> Box<dyn Archiver> {
    let Some(format) = ArchiverType::from_tag(tag) else {
        panic!("must not happen: wrong archiver type {tag:?}");
    };
    new_archiver(format)
}

/// Opens an archiver, runs `build` against it and closes it.
///
/// If `build` or finalization fails the partial output is removed. On
/// success the digests and size of the finished file are returned.
///
/// # Errors
///
/// Returns the first error from opening, `build`, closing or hashing.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::ArchiveSettings;
/// use packwright_core::ArchiverType;
/// use packwright_core::create_archive;
/// use std::path::Path;
///
/// let result = create_archive(
///     Path::new("lambda.zip"),
///     ArchiverType::Zip,
///     ArchiveSettings::default().with_exclude_list(vec!["build/tests".into()]),
///     |archiver| archiver.archive_dir(Path::new("build"), ""),
/// )?;
/// println!("sha256 {}", result.sha256);
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
pub fn create_archive<F>(
    destination: &Path,
    format: ArchiverType,
    settings: ArchiveSettings,
    build: F,
) -> Result<ArchiverResult>
where
    F: FnOnce(&mut dyn Archiver) -> Result<()>,
{
    let mut archiver = new_archiver(format);
    archiver.open(destination, settings)?;

    let outcome = build(archiver.as_mut()).and_then(|()| archiver.close());
    drop(archiver);
    discard_on_error(destination, outcome)?;

    ArchiverResult::from_path(destination)
}

/// Format-specific entry writing.
///
/// Implementations own the whole writer chain down to the output file and
/// finalize it inner to outer in [`EntryWriter::finish`]. Dropping an
/// unfinished writer finalizes it on a best-effort basis.
pub(crate) trait EntryWriter: Sized {
    /// Wraps the freshly created output file.
    fn create(file: File, settings: &SessionSettings) -> Self;

    /// Streams the regular file at `source` into a new entry.
    fn append_file(&mut self, source: &Path, metadata: &Metadata, name: &str) -> io::Result<()>;

    /// Writes a directory entry. `name` has no trailing slash.
    fn append_directory(&mut self, name: &str, metadata: &Metadata) -> io::Result<()>;

    /// Writes a link record pointing at `target`.
    fn append_symlink(&mut self, name: &str, target: &Path, metadata: &Metadata)
    -> io::Result<()>;

    /// Writes `content` as a regular file entry.
    fn append_content(&mut self, content: &[u8], name: &str) -> io::Result<()>;

    /// Finalizes every layer and returns the output file.
    fn finish(self) -> io::Result<File>;
}

/// Session lifecycle shared by both backends.
#[derive(Debug)]
pub(crate) enum SessionState<W> {
    Unopened,
    Open(Session<W>),
    Closed,
}

impl<W> Default for SessionState<W> {
    fn default() -> Self {
        Self::Unopened
    }
}

impl<W: EntryWriter> SessionState<W> {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Unopened => SessionPhase::Unopened,
            Self::Open(_) => SessionPhase::Open,
            Self::Closed => SessionPhase::Closed,
        }
    }

    pub fn open(&mut self, destination: &Path, settings: ArchiveSettings) -> Result<()> {
        if !matches!(self, Self::Unopened) {
            return Err(ArchiveError::InvalidState {
                operation: "open",
                state: self.phase(),
            });
        }
        *self = Self::Open(Session::create(destination, settings)?);
        Ok(())
    }

    pub fn active(&mut self, operation: &'static str) -> Result<&mut Session<W>> {
        let state = self.phase();
        match self {
            Self::Open(session) => Ok(session),
            Self::Unopened | Self::Closed => Err(ArchiveError::InvalidState { operation, state }),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(self, Self::Closed) {
            Self::Open(session) => session.finish(),
            other => {
                let state = other.phase();
                *self = other;
                Err(ArchiveError::InvalidState {
                    operation: "close",
                    state,
                })
            }
        }
    }
}

/// An open session: the writer chain plus resolved settings.
#[derive(Debug)]
pub(crate) struct Session<W> {
    writer: W,
    settings: SessionSettings,
    destination: PathBuf,
}

impl<W: EntryWriter> Session<W> {
    fn create(destination: &Path, settings: ArchiveSettings) -> Result<Self> {
        let settings = settings.resolve(destination)?;
        let file = create_output(destination, settings.file_mode)?;

        tracing::debug!(
            path = %destination.display(),
            mode = format_args!("{:#o}", settings.file_mode),
            symlink = settings.symlink,
            "opened archive"
        );

        Ok(Self {
            writer: W::create(file, &settings),
            settings,
            destination: destination.to_path_buf(),
        })
    }

    pub fn add_file(&mut self, source: &Path, entry_name: &str) -> Result<()> {
        if self.settings.is_excluded(source) {
            tracing::debug!(path = %source.display(), "skipping excluded path");
            return Ok(());
        }

        let name = paths::normalize_entry_name(entry_name)
            .map_err(ArchiveError::io_with("name entry for", source))?;
        let metadata =
            fs::symlink_metadata(source).map_err(ArchiveError::io_with("stat", source))?;

        self.tree().add_path(source, &metadata, &name)
    }

    pub fn add_dir(&mut self, source: &Path, entry_root: &str) -> Result<()> {
        if self.settings.is_excluded(source) {
            tracing::debug!(path = %source.display(), "skipping excluded path");
            return Ok(());
        }

        let prefix = paths::normalize_entry_name(entry_root)
            .map_err(ArchiveError::io_with("name entry for", source))?;
        self.tree().add_tree(source, &prefix)
    }

    pub fn add_content(&mut self, content: &[u8], entry_name: &str) -> Result<()> {
        let name = paths::normalize_entry_name(entry_name)
            .and_then(|name| non_empty(name, entry_name))
            .map_err(ArchiveError::io_with("name entry in", &self.destination))?;

        self.writer
            .append_content(content, &name)
            .map_err(ArchiveError::io_with("write content to", &self.destination))?;
        tracing::trace!(entry = %name, bytes = content.len(), "added content entry");
        Ok(())
    }

    fn finish(self) -> Result<()> {
        let destination = self.destination;
        let file = self
            .writer
            .finish()
            .map_err(ArchiveError::io_with("finalize", &destination))?;
        file.sync_all()
            .map_err(ArchiveError::io_with("sync", &destination))?;

        tracing::debug!(path = %destination.display(), "closed archive");
        Ok(())
    }

    fn tree(&mut self) -> TreeWriter<'_, W> {
        TreeWriter {
            writer: &mut self.writer,
            settings: &self.settings,
            ancestors: Vec::new(),
        }
    }
}

/// Adds filesystem paths to a writer, tracking the directories currently
/// being walked so that dereferenced links cannot recurse forever.
struct TreeWriter<'a, W> {
    writer: &'a mut W,
    settings: &'a SessionSettings,
    ancestors: Vec<PathBuf>,
}

impl<W: EntryWriter> TreeWriter<'_, W> {
    fn add_path(&mut self, path: &Path, metadata: &Metadata, name: &str) -> Result<()> {
        if metadata.file_type().is_symlink() {
            return self.add_symlink(path, metadata, name);
        }
        if metadata.is_dir() {
            return self.add_tree(path, name);
        }

        let name = non_empty(name.to_owned(), name)
            .map_err(ArchiveError::io_with("name entry for", path))?;
        self.writer
            .append_file(path, metadata, &name)
            .map_err(ArchiveError::io_with("archive", path))?;
        tracing::trace!(entry = %name, path = %path.display(), "added file entry");
        Ok(())
    }

    fn add_symlink(&mut self, path: &Path, metadata: &Metadata, name: &str) -> Result<()> {
        if self.settings.symlink {
            let target = fs::read_link(path).map_err(|source| ArchiveError::LinkResolution {
                path: path.to_path_buf(),
                source,
            })?;
            let name = non_empty(name.to_owned(), name)
                .map_err(ArchiveError::io_with("name entry for", path))?;
            self.writer
                .append_symlink(&name, &target, metadata)
                .map_err(ArchiveError::io_with("archive", path))?;
            tracing::trace!(entry = %name, target = %target.display(), "added symlink entry");
            return Ok(());
        }

        let real = paths::dereference(path)?;
        if self.settings.is_excluded(&real) {
            tracing::debug!(link = %path.display(), target = %real.display(), "skipping excluded link target");
            return Ok(());
        }
        let link_error = |source| ArchiveError::LinkResolution {
            path: path.to_path_buf(),
            source,
        };
        let real_metadata = fs::metadata(&real).map_err(link_error)?;
        if real_metadata.is_dir() && links_into_itself(path, &real).map_err(link_error)? {
            return Err(ArchiveError::LinkResolution {
                path: path.to_path_buf(),
                source: io::Error::other("symlink cycle: link points at a directory containing it"),
            });
        }
        self.add_path(&real, &real_metadata, name)
    }

    fn add_tree(&mut self, root: &Path, prefix: &str) -> Result<()> {
        let canonical =
            fs::canonicalize(root).map_err(ArchiveError::io_with("canonicalize", root))?;
        if self.ancestors.contains(&canonical) {
            return Err(ArchiveError::LinkResolution {
                path: root.to_path_buf(),
                source: io::Error::other("symlink cycle: directory is already being archived"),
            });
        }
        self.ancestors.push(canonical);

        let settings = self.settings;
        for entry in walker::walk(root, settings) {
            let entry = entry?;
            let name = paths::join_entry_name(prefix, &entry.relative)
                .map_err(ArchiveError::io_with("name entry for", &entry.path))?;

            if entry.metadata.is_dir() {
                if entry.is_root() && name.is_empty() {
                    continue;
                }
                self.writer
                    .append_directory(&name, &entry.metadata)
                    .map_err(ArchiveError::io_with("archive", &entry.path))?;
                tracing::trace!(entry = %name, "added directory entry");
            } else {
                self.add_path(&entry.path, &entry.metadata, &name)?;
            }
        }

        self.ancestors.pop();
        Ok(())
    }
}

/// Returns `true` if the link at `link` lives inside the directory `target`.
fn links_into_itself(link: &Path, target: &Path) -> io::Result<bool> {
    let Some(parent) = link.parent() else {
        return Ok(false);
    };
    let parent = fs::canonicalize(parent)?;
    Ok(parent.starts_with(fs::canonicalize(target)?))
}

/// Creates the output file with exactly `mode` as its permission bits.
fn create_output(destination: &Path, mode: u32) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let file = options
        .open(destination)
        .map_err(ArchiveError::io_with("create", destination))?;

    // The creation mode is filtered by the umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let applied = file
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(ArchiveError::io_with("set permissions on", destination));
        discard_on_error(destination, applied)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(file)
}

/// Removes the partially written `destination` if `result` is an error.
fn discard_on_error<T>(destination: &Path, result: Result<T>) -> Result<T> {
    if result.is_err()
        && let Err(err) = fs::remove_file(destination)
    {
        tracing::debug!(
            path = %destination.display(),
            error = %err,
            "could not remove partial archive"
        );
    }
    result
}

fn non_empty(name: String, original: &str) -> io::Result<String> {
    if name.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("entry name is empty: {original:?}"),
        ));
    }
    Ok(name)
}

/// Permission bits to store for an entry taken from the filesystem.
#[cfg(unix)]
pub(crate) fn entry_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub(crate) fn entry_mode(metadata: &Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_factory_selects_backend() {
        assert_eq!(new_archiver(ArchiverType::Zip).format(), ArchiverType::Zip);
        assert_eq!(new_archiver(ArchiverType::Tar).format(), ArchiverType::Tar);
        assert_eq!(new_archiver_for_tag("tar").format(), ArchiverType::Tar);
    }

    #[test]
    fn test_factory_performs_no_io() {
        let archiver = new_archiver(ArchiverType::Zip);
        assert_eq!(archiver.phase(), SessionPhase::Unopened);
    }

    #[test]
    #[should_panic(expected = "must not happen: wrong archiver type")]
    fn test_factory_unknown_tag_panics() {
        let _archiver = new_archiver_for_tag("rar");
    }

    #[test]
    fn test_open_twice_is_invalid_state() {
        let temp = TempDir::new().unwrap();
        let mut archiver = new_archiver(ArchiverType::Zip);
        archiver
            .open(&temp.path().join("a.zip"), ArchiveSettings::default())
            .unwrap();

        let err = archiver
            .open(&temp.path().join("b.zip"), ArchiveSettings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::InvalidState {
                operation: "open",
                state: SessionPhase::Open
            }
        ));
        archiver.close().unwrap();
    }

    #[test]
    fn test_open_failure_leaves_session_unopened() {
        let temp = TempDir::new().unwrap();
        let mut archiver = new_archiver(ArchiverType::Tar);
        let err = archiver
            .open(
                &temp.path().join("missing-dir/out.tar.gz"),
                ArchiveSettings::default(),
            )
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Io { operation: "create", .. }));
        assert_eq!(archiver.phase(), SessionPhase::Unopened);
    }

    #[test]
    fn test_bad_exclude_entry_creates_no_file() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.zip");
        let mut archiver = new_archiver(ArchiverType::Zip);
        let err = archiver
            .open(
                &destination,
                ArchiveSettings::default().with_exclude_list(vec![PathBuf::new()]),
            )
            .unwrap_err();

        assert!(matches!(err, ArchiveError::PathResolution { .. }));
        assert!(!destination.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_file_mode_ignores_umask() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.tar.gz");
        let mut archiver = new_archiver(ArchiverType::Tar);
        archiver
            .open(&destination, ArchiveSettings::default().with_file_mode(0o640))
            .unwrap();
        archiver.close().unwrap();

        let mode = fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_create_archive_removes_partial_output_on_error() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.zip");

        let err = create_archive(
            &destination,
            ArchiverType::Zip,
            ArchiveSettings::default(),
            |archiver| {
                archiver.archive_content(b"first", "first.txt")?;
                archiver.archive_file(&temp.path().join("missing.txt"), "missing.txt")
            },
        )
        .unwrap_err();

        assert!(matches!(err, ArchiveError::Io { operation: "stat", .. }));
        assert!(!destination.exists());
    }

    #[test]
    fn test_discard_on_error_removes_destination() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.tar.gz");
        fs::write(&destination, "").unwrap();

        let failed: Result<()> = Err(ArchiveError::io(
            "set permissions on",
            &destination,
            io::Error::from(io::ErrorKind::PermissionDenied),
        ));
        let err = discard_on_error(&destination, failed).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Io {
                operation: "set permissions on",
                ..
            }
        ));
        assert!(!destination.exists());
    }

    #[test]
    fn test_discard_on_error_keeps_successful_output() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.zip");
        fs::write(&destination, "data").unwrap();

        discard_on_error(&destination, Ok(())).unwrap();
        assert!(destination.exists());
    }

    #[test]
    fn test_create_archive_returns_result() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.tar.gz");

        let result = create_archive(
            &destination,
            ArchiverType::Tar,
            ArchiveSettings::default(),
            |archiver| archiver.archive_content(b"hello", "hello.txt"),
        )
        .unwrap();

        assert_eq!(result.size, fs::metadata(&destination).unwrap().len());
        assert_eq!(result.sha256.len(), 64);
        assert_eq!(result.md5.len(), 32);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("a".into(), "a").unwrap(), "a");
        assert_eq!(
            non_empty(String::new(), "/").unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }
}
