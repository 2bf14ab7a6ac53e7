//! Change sets reported by watchers.
//!
//! # Event Flow
//!
//! ```text
//! poll_once() / notify batch
//!        │
//!        ▼
//!   snapshot diff (added + modified → updated, missing → removed)
//!        │
//!        ▼
//!   ChangeSet handed to the registry's router
//! ```

use std::sync::Arc;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use sg_core::SourceFile;

/// Callback a push-based watcher invokes with each change set it detects.
///
/// The sink is called on the watcher's notification thread.
pub type ChangeSink = Arc<dyn Fn(ChangeSet) + Send + Sync>;

/// Files added or modified, and files removed, in one detection cycle.
///
/// # Examples
///
/// ```
/// use sg_core::{SourceFile, SourceType};
/// use sg_watcher::ChangeSet;
///
/// let mut changes = ChangeSet::new();
/// changes.updated.push(SourceFile::new("a.html", "/s/a.html", SourceType::Source));
/// changes.removed.push(SourceFile::new("b.html", "/s/b.html", SourceType::Source));
///
/// assert_eq!(changes.len(), 2);
/// assert!(!changes.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files that are new or whose contents changed.
    pub updated: Vec<SourceFile>,

    /// Files that no longer exist.
    pub removed: Vec<SourceFile>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a change set from its two halves.
    #[inline]
    #[must_use]
    pub const fn from_parts(updated: Vec<SourceFile>, removed: Vec<SourceFile>) -> Self {
        Self { updated, removed }
    }

    /// Total number of files in the set.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.updated.len() + self.removed.len()
    }

    /// Returns `true` if nothing changed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }

    /// Appends another change set.
    pub fn extend(&mut self, other: Self) {
        self.updated.extend(other.updated);
        self.removed.extend(other.removed);
    }

    /// Returns the distinct relative paths touched by this set, sorted.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<&Utf8Path> {
        let mut paths: Vec<&Utf8Path> = self
            .updated
            .iter()
            .chain(&self.removed)
            .map(SourceFile::relative_path)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }
}

/// Summary counts for a change set, used in log lines and CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetStats {
    /// Number of updated files.
    pub updated: usize,

    /// Number of removed files.
    pub removed: usize,

    /// Number of distinct paths.
    pub unique_files: usize,
}

impl ChangeSetStats {
    /// Computes statistics for a change set.
    #[must_use]
    pub fn from_changes(changes: &ChangeSet) -> Self {
        Self {
            updated: changes.updated.len(),
            removed: changes.removed.len(),
            unique_files: changes.unique_paths().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::SourceType;

    fn file(path: &str) -> SourceFile {
        SourceFile::new(path, format!("/site/source/{path}"), SourceType::Source)
    }

    #[test]
    fn test_empty_change_set() {
        let changes = ChangeSet::new();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
    }

    #[test]
    fn test_extend() {
        let mut a = ChangeSet::from_parts(vec![file("a.html")], vec![]);
        a.extend(ChangeSet::from_parts(vec![], vec![file("b.html")]));
        assert_eq!(a.updated.len(), 1);
        assert_eq!(a.removed.len(), 1);
    }

    #[test]
    fn test_unique_paths() {
        let changes = ChangeSet::from_parts(
            vec![file("b.html"), file("a.html")],
            vec![file("a.html")],
        );
        let paths: Vec<_> = changes.unique_paths().iter().map(|p| p.as_str()).collect();
        assert_eq!(paths, vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_stats() {
        let changes = ChangeSet::from_parts(
            vec![file("a.html"), file("b.html")],
            vec![file("a.html")],
        );
        let stats = ChangeSetStats::from_changes(&changes);
        assert_eq!(stats.updated, 2);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.unique_files, 2);
        insta::assert_json_snapshot!(stats, @r#"
        {
          "updated": 2,
          "removed": 1,
          "unique_files": 2
        }
        "#);
    }
}
