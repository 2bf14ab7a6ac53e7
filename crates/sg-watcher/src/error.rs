//! Error types for the sg-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while scanning a collection or listening for changes.

use camino::Utf8PathBuf;

/// Errors that can occur during scanning and watching.
///
/// # Error Recovery Strategy
///
/// - **Walk errors** ([`WatchError::Walk`]): the scan of this watcher is
///   abandoned; other watchers keep polling
/// - **Notify errors** ([`WatchError::Notify`]): live listening could not
///   start; polling still works
/// - **Path not found** ([`WatchError::PathNotFound`]): the walker needs an
///   existing root
/// - **Stat errors** ([`WatchError::Stat`]): recoverable, the file is skipped
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): recoverable, skipped
/// - **Cancelled** ([`WatchError::Cancelled`]): recoverable, the scan was
///   stopped on purpose and nothing was committed
///
/// # Examples
///
/// ```
/// use sg_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) {
///     if err.is_recoverable() {
///         eprintln!("skipping: {err}");
///     } else {
///         eprintln!("watcher failed: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// Failed to walk a directory tree.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// Failed to read metadata for a single file.
    #[error("failed to stat {path}: {source}")]
    Stat {
        /// The file that couldn't be inspected.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    ///
    /// This crate uses UTF-8 paths throughout. Non-UTF-8 paths found during
    /// a scan or in a file event are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The scan was cancelled before it finished.
    #[error("scan cancelled")]
    Cancelled,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::Stat`] error.
    #[inline]
    pub fn stat(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Stat { .. } | Self::NonUtf8Path(_) | Self::Cancelled
        )
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::Stat { path, .. } => Some(path),
            Self::Notify(_)
            | Self::Walk(_)
            | Self::NonUtf8Path(_)
            | Self::Cancelled
            | Self::Io(_) => None,
        }
    }
}
