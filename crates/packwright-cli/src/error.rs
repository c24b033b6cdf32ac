//! Error conversion utilities for CLI.
//!
//! Converts packwright-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use packwright_core::ArchiveError;
use std::io;
use std::path::Path;

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: ArchiveError, output: &Path) -> anyhow::Error {
    match err {
        ArchiveError::LinkResolution { path, source } => {
            anyhow!(
                "Cannot resolve symbolic link '{}' while creating '{}': {}\n\
                 HINT: Fix or remove the link, exclude it with --exclude, or store links as-is with --keep-symlinks.",
                path.display(),
                output.display(),
                source
            )
        }
        ArchiveError::PathResolution { path, source } => {
            anyhow!(
                "Cannot resolve exclusion path '{}': {}\n\
                 HINT: Exclusion paths must be non-empty file system paths.",
                path.display(),
                source
            )
        }
        ArchiveError::Io {
            operation,
            path,
            source,
        } if source.kind() == io::ErrorKind::NotFound => {
            anyhow!(
                "Cannot {} '{}' while creating '{}': not found\n\
                 HINT: Check that every SOURCE exists and that the output directory is present.",
                operation,
                path.display(),
                output.display()
            )
        }
        ArchiveError::Io {
            operation,
            path,
            source,
        } if source.kind() == io::ErrorKind::PermissionDenied => {
            anyhow!(
                "Permission denied: cannot {} '{}'\n\
                 HINT: Check read access to the sources and write access to the output directory.",
                operation,
                path.display()
            )
        }
        ArchiveError::Io {
            operation,
            path,
            source,
        } if source.kind() == io::ErrorKind::InvalidInput => {
            anyhow!(
                "Invalid input: cannot {} '{}': {}\n\
                 HINT: Entry names must not contain '..' and file modes must fit in 7777.",
                operation,
                path.display(),
                source
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error creating archive '{}'", output.display())),
    }
}

/// Adds archive context to a core result
pub fn add_archive_context<T>(
    result: Result<T, ArchiveError>,
    output: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_archive_error(e, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use packwright_core::SessionPhase;
    use std::path::PathBuf;

    #[test]
    fn test_convert_link_resolution_error() {
        let err = ArchiveError::LinkResolution {
            path: PathBuf::from("src/current"),
            source: io::Error::other("too many levels of symbolic links"),
        };
        let converted = convert_archive_error(err, Path::new("out.zip"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("src/current"));
        assert!(msg.contains("out.zip"));
        assert!(msg.contains("--keep-symlinks"));
    }

    #[test]
    fn test_convert_not_found_error() {
        let err = ArchiveError::io(
            "stat",
            "missing.txt",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let converted = convert_archive_error(err, Path::new("out.tar.gz"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("Cannot stat 'missing.txt'"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_other_error_keeps_source() {
        let err = ArchiveError::InvalidState {
            operation: "close",
            state: SessionPhase::Closed,
        };
        let converted = convert_archive_error(err, Path::new("out.zip"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("Error creating archive 'out.zip'"));
        assert!(msg.contains("invalid archiver state"));
    }
}
