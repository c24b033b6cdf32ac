//! Test utilities for reading back created archives.
//!
//! These helpers decode a finished archive into plain values so tests can
//! assert on entry names, kinds, modes and content without repeating the
//! reader boilerplate of each format.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A decoded ZIP entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Entry name as stored, including the trailing `/` of directories.
    pub name: String,
    /// Decompressed content; the link target for symlink entries.
    pub content: Vec<u8>,
    /// Unix mode including file type bits, or 0 if none was stored.
    pub mode: u32,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl ZipEntry {
    /// Returns `true` if the stored mode marks a symbolic link.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.mode & 0o170_000 == 0o120_000
    }
}

/// Reads every entry of the ZIP archive at `path`, in archive order.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::test_utils::read_zip;
/// use std::path::Path;
///
/// for entry in read_zip(Path::new("out.zip")) {
///     println!("{} ({} bytes)", entry.name, entry.content.len());
/// }
/// ```
#[must_use]
pub fn read_zip(path: &Path) -> Vec<ZipEntry> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            ZipEntry {
                name: file.name().to_string(),
                mode: file.unix_mode().unwrap_or(0),
                is_dir: file.is_dir(),
                content,
            }
        })
        .collect()
}

/// A decoded TAR entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    /// Entry path with any trailing `/` removed.
    pub name: String,
    /// Header entry type.
    pub kind: tar::EntryType,
    /// Permission bits from the header.
    pub mode: u32,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Link target for symlink entries.
    pub link_target: Option<String>,
    /// Entry payload.
    pub content: Vec<u8>,
}

/// Reads every entry of the gzip-compressed TAR archive at `path`, in
/// archive order.
#[must_use]
pub fn read_tar(path: &Path) -> Vec<TarEntry> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string();
            let header = entry.header();
            let kind = header.entry_type();
            let mode = header.mode().unwrap();
            let mtime = header.mtime().unwrap();
            let link_target = entry
                .link_name()
                .unwrap()
                .map(|target| target.to_string_lossy().into_owned());
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            TarEntry {
                name,
                kind,
                mode,
                mtime,
                link_target,
                content,
            }
        })
        .collect()
}

/// Returns the names of `entries`, for compact assertions.
#[must_use]
pub fn tar_names(entries: &[TarEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.name.clone()).collect()
}

/// Returns the names of `entries`, for compact assertions.
#[must_use]
pub fn zip_names(entries: &[ZipEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.name.clone()).collect()
}

/// A reader that yields `data` and then fails with an I/O error, like a
/// source file whose device errors partway through.
#[derive(Debug)]
pub struct FailingReader {
    data: Vec<u8>,
    position: usize,
}

impl FailingReader {
    /// Creates a reader failing after `data` has been read.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let rest = &self.data[self.position..];
        if rest.is_empty() {
            return Err(std::io::Error::other("simulated read failure"));
        }
        let count = rest.len().min(buf.len());
        buf[..count].copy_from_slice(&rest[..count]);
        self.position += count;
        Ok(count)
    }
}
