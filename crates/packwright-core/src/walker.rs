//! Directory tree walking with exclusion pruning.

use crate::ArchiveError;
use crate::Result;
use crate::settings::SessionSettings;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use walkdir::WalkDir;

/// An entry discovered under a walk root.
#[derive(Debug, Clone)]
pub(crate) struct WalkEntry {
    /// Full filesystem path.
    pub path: PathBuf,
    /// Path relative to the walk root; empty for the root itself.
    pub relative: PathBuf,
    /// Metadata of the entry itself (links are not followed).
    pub metadata: Metadata,
}

impl WalkEntry {
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

/// Walks `root` without following links, in file-name order.
///
/// Excluded paths are pruned: the walk does not descend into an excluded
/// directory.
pub(crate) fn walk<'a>(
    root: &'a Path,
    settings: &'a SessionSettings,
) -> impl Iterator<Item = Result<WalkEntry>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            let excluded = settings.is_excluded(entry.path());
            if excluded {
                tracing::debug!(path = %entry.path().display(), "skipping excluded path");
            }
            !excluded
        })
        .map(move |entry| {
            let entry = entry.map_err(|err| walk_error(root, err))?;
            let path = entry.path().to_path_buf();
            let metadata = entry
                .metadata()
                .map_err(|err| walk_error(root, err))?;
            let relative = path
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .map_err(|_| {
                    ArchiveError::io(
                        "walk",
                        &path,
                        io::Error::other(format!("path is not under {}", root.display())),
                    )
                })?;

            Ok(WalkEntry {
                path,
                relative,
                metadata,
            })
        })
}

fn walk_error(root: &Path, err: walkdir::Error) -> ArchiveError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("directory walk failed"));
    ArchiveError::io("walk", path, source)
}
