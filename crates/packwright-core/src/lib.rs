//! Archiving engine producing ZIP and gzip-compressed TAR archives.
//!
//! `packwright-core` packs files, directory trees and in-memory content into
//! an archive through one session contract, the [`Archiver`] trait, shared by
//! both container formats. Sessions apply an exclusion list, store or
//! dereference symbolic links, and set the permission bits of the created
//! file. A finished archive can be summarized as an [`ArchiverResult`]
//! holding its SHA-256 and MD5 digests and its size.
//!
//! # Examples
//!
//! ```no_run
//! use packwright_core::ArchiveSettings;
//! use packwright_core::ArchiverResult;
//! use packwright_core::ArchiverType;
//! use packwright_core::new_archiver;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ArchiveSettings::default()
//!     .with_exclude_list(vec!["app/node_modules".into()])
//!     .with_symlink(true);
//!
//! let mut archiver = new_archiver(ArchiverType::Tar);
//! archiver.open(Path::new("app.tar.gz"), settings)?;
//! archiver.archive_dir(Path::new("app"), "app")?;
//! archiver.archive_content(b"built by ci\n", "app/BUILD_INFO")?;
//! archiver.close()?;
//!
//! let result = ArchiverResult::from_path(Path::new("app.tar.gz"))?;
//! println!("{} bytes, sha256 {}", result.size, result.sha256);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archiver;
pub mod digest;
pub mod error;
pub mod formats;
pub mod paths;
pub mod settings;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

mod walker;

// Re-export main API types
pub use archiver::Archiver;
pub use archiver::create_archive;
pub use archiver::new_archiver;
pub use archiver::new_archiver_for_tag;
pub use error::ArchiveError;
pub use error::Result;
pub use error::SessionPhase;
pub use settings::ArchiveSettings;
pub use types::ArchiverResult;
pub use types::ArchiverType;

// Re-export backends for direct construction
pub use formats::TarArchiver;
pub use formats::ZipArchiver;
