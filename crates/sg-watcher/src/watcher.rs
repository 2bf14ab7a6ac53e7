//! The watcher contract and the options for the default watcher.
//!
//! Every collection of files in a project is tracked by a [`Watcher`]. The
//! registry in `sg-sources` only ever talks to this trait, so polling
//! watchers, notify-backed watchers, and purely in-memory sources are
//! interchangeable.
//!
//! # Contract
//!
//! - [`files`](Watcher::files), [`find`](Watcher::find) and
//!   [`exists`](Watcher::exists) answer from the watcher's current snapshot
//!   and never touch the disk.
//! - [`poll_once`](Watcher::poll_once) refreshes the snapshot and returns
//!   the difference. The snapshot is replaced atomically: readers see the
//!   old snapshot or the new one, never a mix.
//! - [`listen`](Watcher::listen) starts push-based detection. Each detected
//!   change set is applied to the snapshot *before* the sink is called, so
//!   the sink can query the watcher and see the new state.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use globset::Glob;
use sg_core::{strip_leading_slash, SourceFile, SourceType, WatchConfig, DEFAULT_PRIORITY};
use tracing::debug;

use crate::error::WatchError;
use crate::events::{ChangeSet, ChangeSink};
use crate::filter::{CompositeFilter, FileFilter, IgnorePatternFilter};

/// One typed collection of files.
///
/// Implementations must be thread-safe: the registry queries watchers from
/// the foreground thread while push-based watchers update themselves from
/// their notification thread.
pub trait Watcher: Send + Sync {
    /// The collection this watcher reports.
    fn source_type(&self) -> &SourceType;

    /// Ordering weight; higher priorities shadow lower ones.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// The directory backing this watcher, if it has one.
    fn root(&self) -> Option<&Utf8Path> {
        None
    }

    /// A snapshot of every tracked file, sorted by relative path.
    fn files(&self) -> Vec<SourceFile>;

    /// Looks up a file by relative path, or by glob pattern when `glob` is
    /// set (first match in path order).
    fn find(&self, path: &str, glob: bool) -> Option<SourceFile>;

    /// Returns `true` if a file with this relative path is tracked.
    fn exists(&self, path: &str) -> bool;

    /// Rescans and returns what changed since the previous snapshot.
    fn poll_once(&self) -> Result<ChangeSet, WatchError>;

    /// Starts push-based change detection.
    ///
    /// Watchers without live notification accept the sink and do nothing.
    fn listen(&self, sink: ChangeSink) -> Result<(), WatchError> {
        drop(sink);
        Ok(())
    }

    /// Stops push-based detection and abandons any in-flight scan.
    fn stop_listener(&self) {}

    /// Returns `true` while push-based detection is active.
    fn is_listening(&self) -> bool {
        false
    }
}

/// Options for the default [`SourceWatcher`](crate::SourceWatcher).
///
/// # Examples
///
/// ```
/// use sg_core::SourceType;
/// use sg_watcher::WatcherOptions;
///
/// let options = WatcherOptions::new(SourceType::Data, "/site/data")
///     .with_priority(75)
///     .with_destination_dir("shared");
///
/// assert_eq!(options.priority, 75);
/// ```
#[derive(Clone)]
pub struct WatcherOptions {
    /// The collection to report files under.
    pub source_type: SourceType,

    /// Directory to scan.
    pub path: Utf8PathBuf,

    /// Ordering weight; defaults to [`DEFAULT_PRIORITY`].
    pub priority: i32,

    /// Prefix prepended to every relative path.
    pub destination_dir: Option<Utf8PathBuf>,

    /// Debounce and recursion settings for live notification.
    pub watch: WatchConfig,

    /// Paths rejected by the filter are never tracked.
    pub filter: Arc<dyn FileFilter>,
}

impl WatcherOptions {
    /// Creates options with the default priority, watch settings, and
    /// noise filter.
    #[must_use]
    pub fn new(source_type: SourceType, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_type,
            path: path.into(),
            priority: DEFAULT_PRIORITY,
            destination_dir: None,
            watch: WatchConfig::default(),
            filter: Arc::new(IgnorePatternFilter::default()),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets a prefix for relative paths.
    #[must_use]
    pub fn with_destination_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.destination_dir = Some(dir.into());
        self
    }

    /// Replaces the watch settings; the noise filter follows the new
    /// `ignore_patterns`.
    #[must_use]
    pub fn with_watch_config(mut self, watch: WatchConfig) -> Self {
        self.filter = Arc::new(IgnorePatternFilter::from_owned(
            watch.ignore_patterns.clone(),
        ));
        self.watch = watch;
        self
    }

    /// Adds a filter on top of the current one; a path is tracked only if
    /// both accept it.
    #[must_use]
    pub fn with_filter<F: FileFilter>(mut self, filter: F) -> Self {
        self.filter = Arc::new(CompositeFilter::new().and(self.filter).and(filter));
        self
    }
}

impl std::fmt::Debug for WatcherOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherOptions")
            .field("source_type", &self.source_type)
            .field("path", &self.path)
            .field("priority", &self.priority)
            .field("destination_dir", &self.destination_dir)
            .finish_non_exhaustive()
    }
}

/// Shared lookup used by watcher implementations.
///
/// `files` must be sorted by relative path so glob lookups are
/// deterministic.
pub(crate) fn find_in<'a>(
    files: impl IntoIterator<Item = &'a SourceFile>,
    path: &str,
    glob: bool,
) -> Option<SourceFile> {
    let path = strip_leading_slash(path);

    if !glob {
        return files
            .into_iter()
            .find(|f| f.relative_path().as_str() == path)
            .cloned();
    }

    let matcher = match Glob::new(path) {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            debug!(pattern = path, error = %e, "Invalid glob in find");
            return None;
        }
    };

    files
        .into_iter()
        .find(|f| matcher.is_match(f.relative_path().as_std_path()))
        .cloned()
}
