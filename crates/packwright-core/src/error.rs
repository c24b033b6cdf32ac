//! Error types for archiving operations.

use std::fmt;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Lifecycle phase of an archiving session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed but never opened.
    Unopened,
    /// Destination allocated, accepting entries.
    Open,
    /// Finalized; no further calls are accepted.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unopened => f.write_str("unopened"),
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Errors that can occur while producing an archive.
///
/// Exclusion matches are never errors; an excluded path is skipped and the
/// call reports success.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Create, open, stat, read or write failed.
    #[error("I/O error: {operation} {}: {source}", path.display())]
    Io {
        /// Operation that was being performed.
        operation: &'static str,
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying system error.
        #[source]
        source: io::Error,
    },

    /// A symbolic link's metadata or target could not be read or made
    /// absolute.
    #[error("cannot resolve symlink {}: {source}", path.display())]
    LinkResolution {
        /// The link being resolved.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// An exclusion entry could not be converted to an absolute path.
    #[error("cannot resolve exclude path {}: {source}", path.display())]
    PathResolution {
        /// The exclusion entry as supplied by the caller.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// Operation not permitted in the current session phase.
    #[error("invalid archiver state: cannot {operation} a session that is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// Phase the session was in.
        state: SessionPhase,
    },
}

impl ArchiveError {
    /// Builds an `Io` error for `path`.
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns a closure that wraps an `io::Error` for `path`, for use with
    /// `map_err`.
    pub fn io_with<'a>(operation: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::io(operation, path, source)
    }

    /// Returns `true` if this error is a session state violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use packwright_core::ArchiveError;
    /// use packwright_core::SessionPhase;
    ///
    /// let err = ArchiveError::InvalidState {
    ///     operation: "close",
    ///     state: SessionPhase::Closed,
    /// };
    /// assert!(err.is_invalid_state());
    /// ```
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns the filesystem path involved in the failure, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. }
            | Self::LinkResolution { path, .. }
            | Self::PathResolution { path, .. } => Some(path),
            Self::InvalidState { .. } => None,
        }
    }
}
