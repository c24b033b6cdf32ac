//! ZIP archive backend.
//!
//! Entries are deflated with the session's compression level and carry Unix
//! permission bits. Entry timestamps are the DOS epoch (1980-01-01), so two
//! sessions over identical inputs produce identical bytes.
//!
//! An entry whose payload cannot be written in full is rolled back, leaving
//! the container with only the entries added before it.

use crate::ArchiveSettings;
use crate::ArchiverType;
use crate::Result;
use crate::SessionPhase;
use crate::archiver::Archiver;
use crate::archiver::EntryWriter;
use crate::archiver::SessionState;
use crate::archiver::entry_mode;
use crate::settings::SessionSettings;
use std::fs::File;
use std::fs::Metadata;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Archiver writing a ZIP container.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::Archiver;
/// use packwright_core::ArchiveSettings;
/// use packwright_core::ZipArchiver;
/// use std::path::Path;
///
/// let mut archiver = ZipArchiver::new();
/// archiver.open(Path::new("function.zip"), ArchiveSettings::default())?;
/// archiver.archive_file(Path::new("target/bootstrap"), "bootstrap")?;
/// archiver.close()?;
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
#[derive(Default)]
pub struct ZipArchiver {
    state: SessionState<ZipEntryWriter>,
}

impl ZipArchiver {
    /// Creates an unopened ZIP archiver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Archiver for ZipArchiver {
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
        ArchiverType::Zip
    }

    fn phase(&self) -> SessionPhase {
        self.state.phase()
    }
}

/// Writes entries into a `ZipWriter` over the output file.
pub(crate) struct ZipEntryWriter {
    zip: ZipWriter<File>,
    options: SimpleFileOptions,
    content_mode: u32,
}

impl EntryWriter for ZipEntryWriter {
    fn create(file: File, settings: &SessionSettings) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(settings.compression_level)))
            .last_modified_time(DateTime::default());

        Self {
            zip: ZipWriter::new(file),
            options,
            content_mode: settings.file_mode,
        }
    }

    fn append_file(&mut self, source: &Path, metadata: &Metadata, name: &str) -> io::Result<()> {
        let file = File::open(source)?;
        let options = self
            .options
            .unix_permissions(entry_mode(metadata))
            .large_file(metadata.len() >= u64::from(u32::MAX));

        self.write_entry(name, options, file)
    }

    fn append_directory(&mut self, name: &str, metadata: &Metadata) -> io::Result<()> {
        let options = self.options.unix_permissions(entry_mode(metadata));
        self.zip
            .add_directory(format!("{name}/"), options)
            .map_err(zip_error("failed to add directory"))
    }

    fn append_symlink(
        &mut self,
        name: &str,
        target: &Path,
        _metadata: &Metadata,
    ) -> io::Result<()> {
        let target = target.to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("symlink target is not valid UTF-8: {}", target.display()),
            )
        })?;
        let options = self.options.unix_permissions(0o777);
        self.zip
            .add_symlink(name, target, options)
            .map_err(zip_error("failed to add symlink"))
    }

    fn append_content(&mut self, content: &[u8], name: &str) -> io::Result<()> {
        let options = self.options.unix_permissions(self.content_mode);
        self.write_entry(name, options, content)
    }

    fn finish(self) -> io::Result<File> {
        let mut file = self
            .zip
            .finish()
            .map_err(zip_error("failed to finish ZIP archive"))?;
        // A rolled-back entry may have been longer than what replaced it.
        let end = file.stream_position()?;
        file.set_len(end)?;
        Ok(file)
    }
}

impl ZipEntryWriter {
    /// Writes one file entry from `payload`, discarding it if the payload
    /// cannot be copied in full.
    fn write_entry(
        &mut self,
        name: &str,
        options: SimpleFileOptions,
        mut payload: impl Read,
    ) -> io::Result<()> {
        self.zip
            .start_file(name, options)
            .map_err(zip_error("failed to start file in ZIP"))?;

        if let Err(err) = io::copy(&mut payload, &mut self.zip) {
            self.zip
                .abort_file()
                .map_err(zip_error("failed to discard partial ZIP entry"))?;
            tracing::debug!(entry = %name, error = %err, "discarded partial entry");
            return Err(err);
        }
        Ok(())
    }
}

fn zip_error(context: &'static str) -> impl FnOnce(ZipError) -> io::Error {
    move |err| match err {
        ZipError::Io(err) => err,
        other => io::Error::other(format!("{context}: {other}")),
    }
}
