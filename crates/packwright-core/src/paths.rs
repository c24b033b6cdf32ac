//! Path resolution for symlinks, exclusion lists and archive entry names.
//!
//! Exclusion matching compares absolute, lexically cleaned paths. Both the
//! caller's exclusion list and every path met during traversal go through
//! [`absolute_path`] so that `./data/../data/tmp` and `/work/data/tmp` compare
//! equal.

use crate::ArchiveError;
use crate::Result;
use std::fs;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Maximum number of links followed when dereferencing a chain.
pub const MAX_LINK_HOPS: usize = 40;

/// Resolves a symbolic link one hop to an absolute target path.
///
/// The link itself is never followed: its metadata is read with
/// `symlink_metadata`, and if it is a link its target is read and made
/// absolute against the link's own directory. A path that is not a link is
/// returned unchanged.
///
/// # Errors
///
/// Returns [`ArchiveError::LinkResolution`] if the metadata lookup fails, the
/// link target cannot be read, or the target cannot be made absolute.
///
/// # Examples
///
/// ```no_run
/// use packwright_core::paths::resolve_symlink;
/// use std::path::Path;
///
/// let target = resolve_symlink(Path::new("/srv/app/current"))?;
/// println!("current -> {}", target.display());
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
pub fn resolve_symlink(path: &Path) -> Result<PathBuf> {
    let link_error = |source| ArchiveError::LinkResolution {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::symlink_metadata(path).map_err(link_error)?;
    if !metadata.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }

    let target = fs::read_link(path).map_err(link_error)?;
    let target = if target.is_absolute() {
        target
    } else {
        path.parent().unwrap_or(Path::new("")).join(target)
    };

    absolute_path(&target).map_err(link_error)
}

/// Follows a chain of symbolic links until a non-link path is reached.
///
/// Each hop goes through [`resolve_symlink`].
///
/// # Errors
///
/// Returns [`ArchiveError::LinkResolution`] if a hop cannot be resolved, the
/// final target does not exist, or the chain is longer than
/// [`MAX_LINK_HOPS`].
pub fn dereference(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();

    for _ in 0..=MAX_LINK_HOPS {
        let metadata =
            fs::symlink_metadata(&current).map_err(|source| ArchiveError::LinkResolution {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.file_type().is_symlink() {
            return Ok(current);
        }
        current = resolve_symlink(&current)?;
    }

    Err(ArchiveError::LinkResolution {
        path: path.to_path_buf(),
        source: io::Error::other("too many levels of symbolic links"),
    })
}

/// Converts every exclusion entry to an absolute, cleaned path.
///
/// Order is preserved. Resolution stops at the first entry that cannot be
/// made absolute.
///
/// # Errors
///
/// Returns [`ArchiveError::PathResolution`] naming the offending entry.
///
/// # Examples
///
/// ```
/// use packwright_core::paths::resolve_exclude_list;
///
/// let resolved = resolve_exclude_list(&["/srv/app/./cache", "/srv/app/logs/.."])?;
/// assert_eq!(resolved[0].to_str(), Some("/srv/app/cache"));
/// assert_eq!(resolved[1].to_str(), Some("/srv/app"));
/// # Ok::<(), packwright_core::ArchiveError>(())
/// ```
pub fn resolve_exclude_list<P: AsRef<Path>>(list: &[P]) -> Result<Vec<PathBuf>> {
    list.iter()
        .map(|entry| {
            let entry = entry.as_ref();
            absolute_path(entry).map_err(|source| ArchiveError::PathResolution {
                path: entry.to_path_buf(),
                source,
            })
        })
        .collect()
}

/// Makes `path` absolute against the current directory and cleans it
/// lexically.
///
/// # Errors
///
/// Returns an error if `path` is empty or the current directory cannot be
/// determined.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path).map(|absolute| clean(&absolute))
}

/// Removes `.` components and folds `..` into the preceding component.
///
/// A `..` directly under the root stays at the root. Leading `..` in a
/// relative path is kept.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }

    cleaned
}

/// Normalizes a caller-supplied archive entry name.
///
/// Backslashes become `/`, empty and `.` segments are dropped and any leading
/// `/` is removed, so the result is always relative. An empty result means
/// the archive root.
///
/// # Errors
///
/// Returns an `InvalidInput` error if a segment is `..`.
///
/// # Examples
///
/// ```
/// use packwright_core::paths::normalize_entry_name;
///
/// assert_eq!(normalize_entry_name("/app/./bin//tool").unwrap(), "app/bin/tool");
/// assert_eq!(normalize_entry_name("").unwrap(), "");
/// assert!(normalize_entry_name("app/../../etc").is_err());
/// ```
pub fn normalize_entry_name(name: &str) -> io::Result<String> {
    let mut segments = Vec::new();

    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("entry name must not contain '..': {name}"),
                ));
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

/// Joins an archive prefix and a path relative to the archiving root.
///
/// # Errors
///
/// Returns an `InvalidData` error if `relative` is not valid UTF-8, or an
/// `InvalidInput` error if it escapes the root.
pub fn join_entry_name(prefix: &str, relative: &Path) -> io::Result<String> {
    let relative = relative.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", relative.display()),
        )
    })?;

    match (prefix.is_empty(), relative.is_empty()) {
        (_, true) => normalize_entry_name(prefix),
        (true, false) => normalize_entry_name(relative),
        (false, false) => normalize_entry_name(&format!("{prefix}/{relative}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_folds_parent_and_current() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("../a/./b")), PathBuf::from("../a/b"));
        assert_eq!(clean(Path::new("a/b/../../..")), PathBuf::from(".."));
    }

    #[test]
    fn test_absolute_path_relative_input() {
        let cwd = std::env::current_dir().unwrap();
        let resolved = absolute_path(Path::new("some/./dir")).unwrap();
        assert_eq!(resolved, clean(&cwd.join("some/dir")));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_absolute_path_rejects_empty() {
        assert!(absolute_path(Path::new("")).is_err());
    }

    #[test]
    fn test_resolve_exclude_list_preserves_order() {
        let resolved = resolve_exclude_list(&["/b", "/a/../c", "/a"]).unwrap();
        assert_eq!(
            resolved,
            vec![
                PathBuf::from("/b"),
                PathBuf::from("/c"),
                PathBuf::from("/a")
            ]
        );
    }

    #[test]
    fn test_resolve_exclude_list_fails_fast() {
        let err = resolve_exclude_list(&["/ok", "", "/never"]).unwrap_err();
        assert!(matches!(err, ArchiveError::PathResolution { ref path, .. } if path.as_os_str().is_empty()));
    }

    #[test]
    fn test_resolve_symlink_plain_file_unchanged() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert_eq!(resolve_symlink(&file).unwrap(), file);
    }

    #[test]
    fn test_resolve_symlink_missing_path() {
        let temp = TempDir::new().unwrap();
        let err = resolve_symlink(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, ArchiveError::LinkResolution { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlink_relative_target_uses_link_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("real.txt"), "data").unwrap();
        std::os::unix::fs::symlink("real.txt", dir.join("link")).unwrap();

        let resolved = resolve_symlink(&dir.join("link")).unwrap();
        assert_eq!(resolved, clean(&dir.join("real.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlink_is_single_hop() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("end.txt"), "data").unwrap();
        std::os::unix::fs::symlink(root.join("end.txt"), root.join("middle")).unwrap();
        std::os::unix::fs::symlink(root.join("middle"), root.join("start")).unwrap();

        assert_eq!(resolve_symlink(&root.join("start")).unwrap(), root.join("middle"));
        assert_eq!(dereference(&root.join("start")).unwrap(), root.join("end.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_symlink_cycle_does_not_loop() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::os::unix::fs::symlink(root.join("b"), root.join("a")).unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("b")).unwrap();

        assert_eq!(resolve_symlink(&root.join("a")).unwrap(), root.join("b"));
        let err = dereference(&root.join("a")).unwrap_err();
        assert!(matches!(err, ArchiveError::LinkResolution { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_dereference_dangling_link() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("missing"), &link).unwrap();

        let err = dereference(&link).unwrap_err();
        assert!(matches!(err, ArchiveError::LinkResolution { ref path, .. } if path == &link));
    }

    #[test]
    fn test_normalize_entry_name() {
        assert_eq!(normalize_entry_name("a.txt").unwrap(), "a.txt");
        assert_eq!(normalize_entry_name("./dir/a.txt").unwrap(), "dir/a.txt");
        assert_eq!(normalize_entry_name("dir\\sub\\a.txt").unwrap(), "dir/sub/a.txt");
        assert_eq!(normalize_entry_name("///").unwrap(), "");
        assert_eq!(
            normalize_entry_name("../a").unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_join_entry_name() {
        assert_eq!(join_entry_name("", Path::new("a/b.txt")).unwrap(), "a/b.txt");
        assert_eq!(join_entry_name("root", Path::new("")).unwrap(), "root");
        assert_eq!(join_entry_name("root/", Path::new("a")).unwrap(), "root/a");
        assert_eq!(join_entry_name("", Path::new("")).unwrap(), "");
    }
}
