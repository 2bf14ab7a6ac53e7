//! The record describing one tracked file.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::source_type::SourceType;

/// A file tracked by a watcher.
///
/// `SourceFile` is a value record: when a file changes on disk the watcher
/// builds a new record and replaces the old one, it never mutates a record
/// in place. Fields are therefore read-only.
///
/// A file may belong to more than one collection (for example a watcher
/// that reports the same directory as both `source` and `reload`), so
/// [`types`](Self::types) is a small set rather than a single tag.
///
/// # Memory Efficiency
///
/// Types are stored in a [`SmallVec`] with room for two tags inline; most
/// files belong to exactly one collection.
///
/// # Examples
///
/// ```
/// use sg_core::{SourceFile, SourceType};
///
/// let file = SourceFile::new("index.html.erb", "/site/source/index.html.erb", SourceType::Source);
/// assert_eq!(file.relative_path().as_str(), "index.html.erb");
/// assert!(file.has_type(&SourceType::Source));
/// assert!(!file.has_type(&SourceType::Data));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    relative_path: Utf8PathBuf,
    full_path: Utf8PathBuf,
    directory: bool,
    types: SmallVec<[SourceType; 2]>,
}

impl SourceFile {
    /// Creates a record for a regular file belonging to one collection.
    #[must_use]
    pub fn new(
        relative_path: impl Into<Utf8PathBuf>,
        full_path: impl Into<Utf8PathBuf>,
        source_type: SourceType,
    ) -> Self {
        let mut types = SmallVec::new();
        types.push(source_type);
        Self {
            relative_path: relative_path.into(),
            full_path: full_path.into(),
            directory: false,
            types,
        }
    }

    /// Returns a copy of this record marked as a directory.
    #[must_use]
    pub fn into_directory(mut self) -> Self {
        self.directory = true;
        self
    }

    /// Returns a copy of this record that also belongs to `source_type`.
    ///
    /// Adding a type the file already has is a no-op.
    #[must_use]
    pub fn with_type(mut self, source_type: SourceType) -> Self {
        if !self.types.contains(&source_type) {
            self.types.push(source_type);
        }
        self
    }

    /// Path relative to the collection root, `/`-separated.
    #[inline]
    #[must_use]
    pub fn relative_path(&self) -> &Utf8Path {
        &self.relative_path
    }

    /// Absolute path on disk.
    #[inline]
    #[must_use]
    pub fn full_path(&self) -> &Utf8Path {
        &self.full_path
    }

    /// Whether the record describes a directory.
    #[inline]
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.directory
    }

    /// The collections this file belongs to, in the order they were added.
    #[inline]
    #[must_use]
    pub fn types(&self) -> &[SourceType] {
        &self.types
    }

    /// Returns `true` if the file belongs to `source_type`.
    #[inline]
    #[must_use]
    pub fn has_type(&self, source_type: &SourceType) -> bool {
        self.types.contains(source_type)
    }
}
