//! Gzip-compressed TAR archive backend.
//!
//! The writer chain is `tar::Builder` over `GzEncoder` over the output file.
//! Closing finalizes strictly inner to outer: the TAR end-of-archive blocks
//! are written before the gzip trailer, and the gzip trailer before the file
//! is synced.
//!
//! A TAR header cannot be taken back once it is in the compressed stream. If
//! a payload fails after its header was written, the rest of the declared
//! size is zero-filled so the stream stays block aligned, and the writer is
//! marked broken: later entries are refused and closing reports an error.

use crate::ArchiveSettings;
use crate::ArchiverType;
use crate::Result;
use crate::SessionPhase;
use crate::archiver::Archiver;
use crate::archiver::EntryWriter;
use crate::archiver::SessionState;
use crate::archiver::entry_mode;
use crate::settings::SessionSettings;
use flate2::write::GzEncoder;
use std::fs::File;
use std::fs::Metadata;
use std::io;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;
use tar::Builder;
use tar::EntryType;
use tar::Header;

/// Archiver writing a gzip-compressed TAR container.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::Archiver;
/// use packwright_core::ArchiveSettings;
/// use packwright_core::TarArchiver;
/// use std::path::Path;
///
/// let mut archiver = TarArchiver::new();
/// archiver.open(
///     Path::new("release.tar.gz"),
///     ArchiveSettings::default().with_symlink(true),
/// )?;
/// archiver.archive_dir(Path::new("dist"), "release")?;
/// archiver.close()?;
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
#[derive(Default)]
pub struct TarArchiver {
    state: SessionState<TarEntryWriter>,
}

impl TarArchiver {
    /// Creates an unopened TAR archiver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Archiver for TarArchiver {
    fn open(&mut self, destination: &Path, settings: ArchiveSettings) -> Result<()> {
        self.state.open(destination, settings)
    }

    fn archive_file(&mut self, source: &Path, entry_name: &str) -> Result<()> {
        self.state.active("add a file to")?.add_file(source, entry_name)
    }

    fn archive_dir(&mut self, source: &Path, entry_root: &str) -> Result<()> {
        self.state
            .active("add a directory to")?
            .add_dir(source, entry_root)
    }

    fn archive_content(&mut self, content: &[u8], entry_name: &str) -> Result<()> {
        self.state
            .active("add content to")?
            .add_content(content, entry_name)
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()
    }

    fn format(&self) -> ArchiverType {
        ArchiverType::Tar
    }

    fn phase(&self) -> SessionPhase {
        self.state.phase()
    }
}

/// Writes entries into a TAR stream compressed on the fly.
pub(crate) struct TarEntryWriter {
    builder: Builder<GzEncoder<File>>,
    content_mode: u32,
    deterministic: bool,
    /// Entry whose payload was cut short.
    broken_entry: Option<String>,
}

impl TarEntryWriter {
    /// Sets mode, ownership and modification time from `metadata`.
    fn stamp(&self, header: &mut Header, metadata: &Metadata) {
        header.set_mode(entry_mode(metadata));
        if self.deterministic {
            header.set_uid(0);
            header.set_gid(0);
            header.set_mtime(0);
            return;
        }
        set_ownership_and_mtime(header, metadata);
    }

    fn ensure_intact(&self) -> io::Result<()> {
        match &self.broken_entry {
            Some(name) => Err(broken_stream(name)),
            None => Ok(()),
        }
    }

    /// Appends an entry of exactly `size` payload bytes read from `payload`.
    fn append_sized(
        &mut self,
        header: &mut Header,
        name: &str,
        payload: impl Read,
        size: u64,
    ) -> io::Result<()> {
        self.ensure_intact()?;
        header.set_size(size);

        let mut payload = PaddedPayload::new(payload, size);
        let appended = self.builder.append_data(header, name, &mut payload);
        match appended.err().or_else(|| payload.failure.take()) {
            None => Ok(()),
            Some(err) => {
                tracing::debug!(entry = %name, error = %err, "entry payload cut short");
                self.broken_entry = Some(name.to_owned());
                Err(err)
            }
        }
    }

    fn content_mtime(&self) -> u64 {
        if self.deterministic {
            return 0;
        }
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}

impl EntryWriter for TarEntryWriter {
    fn create(file: File, settings: &SessionSettings) -> Self {
        let encoder = GzEncoder::new(file, settings.flate2_level());
        let mut builder = Builder::new(encoder);
        builder.mode(tar::HeaderMode::Complete);

        Self {
            builder,
            content_mode: settings.file_mode,
            deterministic: settings.deterministic,
            broken_entry: None,
        }
    }

    fn append_file(&mut self, source: &Path, metadata: &Metadata, name: &str) -> io::Result<()> {
        let file = File::open(source)?;
        // Size from the opened handle so header and payload agree.
        let size = file.metadata()?.len();

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        self.stamp(&mut header, metadata);

        self.append_sized(&mut header, name, file, size)
    }

    fn append_directory(&mut self, name: &str, metadata: &Metadata) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        self.stamp(&mut header, metadata);

        self.append_sized(&mut header, &format!("{name}/"), io::empty(), 0)
    }

    fn append_symlink(&mut self, name: &str, target: &Path, metadata: &Metadata) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Symlink);
        header.set_size(0);
        self.stamp(&mut header, metadata);
        header.set_mode(0o777);

        self.ensure_intact()?;
        self.builder.append_link(&mut header, name, target)
    }

    fn append_content(&mut self, content: &[u8], name: &str) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(self.content_mode);
        header.set_mtime(self.content_mtime());

        self.append_sized(&mut header, name, content, content.len() as u64)
    }

    fn finish(self) -> io::Result<File> {
        let encoder = self.builder.into_inner()?;
        let file = encoder.finish()?;
        match self.broken_entry {
            Some(name) => Err(broken_stream(&name)),
            None => Ok(file),
        }
    }
}

fn broken_stream(name: &str) -> io::Error {
    io::Error::other(format!("archive holds a partially written entry {name:?}"))
}

/// Yields exactly `remaining` bytes: the source's bytes, then zeros once the
/// source fails or ends early. The first failure is kept in `failure`.
struct PaddedPayload<R> {
    source: R,
    remaining: u64,
    failure: Option<io::Error>,
}

impl<R: Read> PaddedPayload<R> {
    fn new(source: R, size: u64) -> Self {
        Self {
            source,
            remaining: size,
            failure: None,
        }
    }
}

impl<R: Read> Read for PaddedPayload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        if limit == 0 {
            return Ok(0);
        }
        let buf = &mut buf[..limit];

        if self.failure.is_none() {
            match self.source.read(buf) {
                Ok(0) => {
                    self.failure = Some(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("source ended {} bytes short", self.remaining),
                    ));
                }
                Ok(count) => {
                    self.remaining -= count as u64;
                    return Ok(count);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => return Err(err),
                Err(err) => self.failure = Some(err),
            }
        }

        buf.fill(0);
        self.remaining -= limit as u64;
        Ok(limit)
    }
}

#[cfg(unix)]
fn set_ownership_and_mtime(header: &mut Header, metadata: &Metadata) {
    use std::os::unix::fs::MetadataExt;
    header.set_uid(u64::from(metadata.uid()));
    header.set_gid(u64::from(metadata.gid()));
    // mtime can be negative for dates before epoch, clamp to 0
    #[allow(clippy::cast_sign_loss)]
    let mtime = metadata.mtime().max(0) as u64;
    header.set_mtime(mtime);
}

#[cfg(not(unix))]
fn set_ownership_and_mtime(header: &mut Header, metadata: &Metadata) {
    if let Ok(modified) = metadata.modified()
        && let Ok(duration) = modified.duration_since(SystemTime::UNIX_EPOCH)
    {
        header.set_mtime(duration.as_secs());
    }
}
