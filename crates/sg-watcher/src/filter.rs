//! File filtering for watchers.
//!
//! Filters run on every path a watcher discovers, during full scans and for
//! individual notify events, before the path enters the watcher's snapshot.
//! They see the path relative to the watcher root.
//!
//! Filtering here is about noise (VCS metadata, editor swap files). Whether
//! a file becomes a page is decided later by the sitemap's path resolver,
//! so dotfiles and partials are *not* filtered out at this level.
//!
//! # Examples
//!
//! ```
//! use sg_watcher::{FileFilter, IgnorePatternFilter};
//! use camino::Utf8Path;
//!
//! let filter = IgnorePatternFilter::default();
//!
//! assert!(filter.should_process(Utf8Path::new("index.html.erb")));
//! assert!(filter.should_process(Utf8Path::new("_partial.erb")));
//! assert!(!filter.should_process(Utf8Path::new(".git/HEAD")));
//! assert!(!filter.should_process(Utf8Path::new("about.html~")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

/// Editor artifacts excluded by [`IgnorePatternFilter`] regardless of its
/// configured patterns.
const BACKUP_SUFFIXES: &[&str] = &["~", ".swp", ".swo", ".tmp"];

/// A filter for determining which paths a watcher tracks.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because they are shared between
/// the polling caller and the notify thread.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at `path` (relative to the watcher root)
    /// should be tracked.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Excludes paths with a component equal to one of the configured names,
/// plus editor backup and swap files.
///
/// # Examples
///
/// ```
/// use sg_watcher::{FileFilter, IgnorePatternFilter};
/// use camino::Utf8Path;
///
/// let filter = IgnorePatternFilter::new(&["node_modules"]);
/// assert!(!filter.should_process(Utf8Path::new("js/node_modules/x.js")));
/// assert!(filter.should_process(Utf8Path::new("js/app.js")));
/// ```
#[derive(Debug, Clone)]
pub struct IgnorePatternFilter {
    names: SmallVec<[String; 8]>,
}

impl IgnorePatternFilter {
    /// Creates a filter excluding the given component names.
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Creates a filter from owned names, as found in a config file.
    #[must_use]
    pub fn from_owned(names: Vec<String>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// Adds another component name to exclude.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    fn is_backup(path: &Utf8Path) -> bool {
        path.file_name()
            .is_some_and(|name| BACKUP_SUFFIXES.iter().any(|s| name.ends_with(s)))
    }
}

impl Default for IgnorePatternFilter {
    fn default() -> Self {
        Self::from_owned(sg_core::WatchConfig::default().ignore_patterns)
    }
}

impl FileFilter for IgnorePatternFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        if Self::is_backup(path) {
            return false;
        }

        !path
            .components()
            .any(|c| self.names.iter().any(|n| n == c.as_str()))
    }
}

/// Combines filters with AND logic. An empty composite accepts everything.
///
/// [`WatcherOptions::with_filter`](crate::WatcherOptions::with_filter)
/// stacks caller filters on the noise filter this way.
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores() {
        let filter = IgnorePatternFilter::default();
        assert!(!filter.should_process(Utf8Path::new(".DS_Store")));
        assert!(!filter.should_process(Utf8Path::new("images/.DS_Store")));
        assert!(!filter.should_process(Utf8Path::new(".sass-cache/x.scssc")));
        assert!(filter.should_process(Utf8Path::new("stylesheets/site.css.scss")));
    }

    #[test]
    fn test_keeps_dotfiles_and_partials() {
        let filter = IgnorePatternFilter::default();
        assert!(filter.should_process(Utf8Path::new(".htaccess")));
        assert!(filter.should_process(Utf8Path::new("_footer.html.erb")));
    }

    #[test]
    fn test_backup_files() {
        let filter = IgnorePatternFilter::new(&[]);
        assert!(!filter.should_process(Utf8Path::new("index.html~")));
        assert!(!filter.should_process(Utf8Path::new(".index.html.swp")));
        assert!(filter.should_process(Utf8Path::new("index.html")));
    }

    #[test]
    fn test_with_name() {
        let filter = IgnorePatternFilter::new(&[]).with_name("vendor");
        assert!(!filter.should_process(Utf8Path::new("vendor/lib.js")));
        // Component match only, not substring
        assert!(filter.should_process(Utf8Path::new("vendors/lib.js")));
    }

    #[test]
    fn test_composite_filter() {
        struct OnlyHtml;
        impl FileFilter for OnlyHtml {
            fn should_process(&self, path: &Utf8Path) -> bool {
                path.as_str().contains(".html")
            }
        }

        let empty = CompositeFilter::new();
        assert!(empty.should_process(Utf8Path::new("x")));

        let filter = CompositeFilter::new()
            .and(IgnorePatternFilter::default())
            .and(OnlyHtml);
        assert!(filter.should_process(Utf8Path::new("index.html.erb")));
        assert!(!filter.should_process(Utf8Path::new(".git/index.html")));
        assert!(!filter.should_process(Utf8Path::new("style.css")));
    }

    #[test]
    fn test_shared_filters() {
        let boxed: Box<dyn FileFilter> = Box::new(IgnorePatternFilter::default());
        assert!(!boxed.should_process(Utf8Path::new(".git/config")));

        let shared = std::sync::Arc::new(IgnorePatternFilter::new(&[]));
        assert!(shared.should_process(Utf8Path::new(".git/config")));
    }
}
