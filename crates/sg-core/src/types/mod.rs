//! Domain types shared by watchers, the source registry, and the sitemap.
//!
//! # Module Organization
//!
//! - [`source_type`] - Collection tags (`source`, `data`, `locales`, ...)
//! - [`source_file`] - The immutable record describing one file on disk
//! - [`path_entry`] - Sitemap classification of a logical path
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use sg_core::{PathEntry, SourceFile, SourceType};
//! ```

use camino::{Utf8Path, Utf8PathBuf};

mod path_entry;
mod source_file;
mod source_type;

pub use path_entry::{PathEntry, PathTarget};
pub use source_file::SourceFile;
pub use source_type::SourceType;

/// Removes a single leading `/` from a site path.
///
/// Sitemap keys are stored without the leading slash, and every query and
/// mutation normalizes its input through this function.
///
/// # Examples
///
/// ```
/// use sg_core::strip_leading_slash;
///
/// assert_eq!(strip_leading_slash("/about.html"), "about.html");
/// assert_eq!(strip_leading_slash("about.html"), "about.html");
/// assert_eq!(strip_leading_slash("//x"), "/x");
/// ```
#[inline]
#[must_use]
pub fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Makes `path` absolute against the current directory without touching the
/// filesystem.
///
/// `.` components are dropped; `..` and symlinks are kept. Paths that are
/// already absolute, or that can't be made absolute as UTF-8, come back
/// unchanged.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use sg_core::absolute_path;
///
/// assert_eq!(absolute_path(Utf8Path::new("/site/source")), "/site/source");
/// assert!(absolute_path(Utf8Path::new("./site")).is_absolute());
/// ```
#[must_use]
pub fn absolute_path(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    std::path::absolute(path)
        .ok()
        .and_then(|abs| Utf8PathBuf::from_path_buf(abs).ok())
        .unwrap_or_else(|| path.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_joins_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let abs = absolute_path(Utf8Path::new("./site/source"));
        assert!(abs.is_absolute());
        assert_eq!(abs.as_std_path(), cwd.join("site/source"));
    }

    #[test]
    fn test_absolute_path_keeps_absolute() {
        assert_eq!(absolute_path(Utf8Path::new("/a/b")), Utf8PathBuf::from("/a/b"));
    }
}
