//! Container format backends.
//!
//! Each backend implements [`Archiver`](crate::Archiver) over its own writer
//! chain; the factory in [`archiver`](crate::archiver) is the only place that
//! knows both exist.

pub mod tar;
pub mod zip;

pub use self::tar::TarArchiver;
pub use self::zip::ZipArchiver;
