//! Directory traversal for watcher scans and the initial sitemap scan.
//!
//! [`FileWalker`] wraps the `ignore` crate's walker with every standard
//! filter turned off: dotfiles, `.gitignore`d files and partials are all
//! reported, because deciding what becomes a page belongs to the path
//! resolver, not to the walk.
//!
//! # Examples
//!
//! ```ignore
//! use sg_watcher::FileWalker;
//! use camino::Utf8Path;
//!
//! let walker = FileWalker::new(Utf8Path::new("./source"))?;
//! for path in walker.collect_paths()? {
//!     println!("Found: {path}");
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tracing::warn;

use crate::error::WatchError;

/// A file walker that lists every file below a root directory.
///
/// # Cancellation
///
/// A walker can share a cancellation flag with its owner. The flag is
/// checked between entries; once raised, [`collect_paths`](Self::collect_paths)
/// stops and returns [`WatchError::Cancelled`] so the caller can discard
/// the partial listing.
#[derive(Debug)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Whether to follow symbolic links.
    follow_links: bool,
    /// Raised by the owner to abandon an in-flight walk.
    cancel: Option<Arc<AtomicBool>>,
}

impl FileWalker {
    /// Creates a new file walker for the given root directory.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the root doesn't exist, and
    /// [`WatchError::Io`] if it isn't a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, WatchError> {
        if !root.exists() {
            return Err(WatchError::path_not_found(root));
        }
        if !root.is_dir() {
            return Err(WatchError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("root path is not a directory: {root}"),
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            follow_links: false,
            cancel: None,
        })
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Shares a cancellation flag with the walker.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Collects the absolute paths of all files in the tree, sorted by name
    /// within each directory.
    ///
    /// Entries that can't be read and non-UTF-8 paths are logged and
    /// skipped; they never abort the walk.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Cancelled`] if the cancellation flag was raised.
    pub fn collect_paths(&self) -> Result<Vec<Utf8PathBuf>, WatchError> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            if self.is_cancelled() {
                return Err(WatchError::Cancelled);
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %self.root, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            // Skip directories and non-files
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            match Utf8Path::from_path(entry.path()) {
                Some(path) => paths.push(path.to_owned()),
                None => {
                    warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                }
            }
        }

        Ok(paths)
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            // Report everything; exclusion rules live in filters and the resolver
            .standard_filters(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
