//! Mapping on-disk files to logical site paths.
//!
//! # Rules
//!
//! A file is *excluded* (resolves to `None`) when:
//!
//! 1. it is the source root itself, or a directory;
//! 2. it does not live under the source root;
//! 3. any component of its root-relative path starts with `.`, or starts
//!    with `_` but not `__` (partials);
//! 4. after extension stripping, the path is the layout name or starts with
//!    the layouts directory.
//!
//! Otherwise every trailing extension known to the
//! [`RenderableExtensions`] lookup is stripped, one per pass, until the
//! last extension is not a template extension.
//!
//! ```text
//!   /site/source/blog/post.html.md.erb
//!        │ relative to root
//!        ▼
//!   blog/post.html.md.erb ─► blog/post.html.md ─► blog/post.html   (stop: html)
//! ```

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use sg_core::absolute_path;
use tracing::trace;

use crate::extensions::RenderableExtensions;

/// Default name of the layouts directory.
pub const DEFAULT_LAYOUTS_DIR: &str = "layouts";

/// Default name of the site-wide layout template.
pub const DEFAULT_LAYOUT_NAME: &str = "layout";

/// Resolves absolute file paths to logical site paths.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use sg_sitemap::{PathResolver, TemplateExtensions};
///
/// let resolver = PathResolver::new("/site/source", Arc::new(TemplateExtensions::default()));
///
/// assert_eq!(
///     resolver.logical_path(Utf8Path::new("/site/source/about.html.erb")),
///     Some("about.html".to_owned()),
/// );
/// assert_eq!(resolver.logical_path(Utf8Path::new("/site/source/_nav.html.erb")), None);
/// assert_eq!(resolver.logical_path(Utf8Path::new("/elsewhere/about.html")), None);
/// ```
#[derive(Clone)]
pub struct PathResolver {
    source_root: Utf8PathBuf,
    layouts_dir: String,
    layout_name: String,
    extensions: Arc<dyn RenderableExtensions>,
}

impl PathResolver {
    /// Creates a resolver for `source_root` with the default layout names.
    ///
    /// A relative root is made absolute against the current directory.
    #[must_use]
    pub fn new(source_root: impl Into<Utf8PathBuf>, extensions: Arc<dyn RenderableExtensions>) -> Self {
        Self {
            source_root: absolute_path(&source_root.into()),
            layouts_dir: DEFAULT_LAYOUTS_DIR.to_owned(),
            layout_name: DEFAULT_LAYOUT_NAME.to_owned(),
            extensions,
        }
    }

    /// Overrides the reserved layout names.
    #[must_use]
    pub fn with_layouts(mut self, layouts_dir: impl Into<String>, layout_name: impl Into<String>) -> Self {
        self.layouts_dir = layouts_dir.into();
        self.layout_name = layout_name.into();
        self
    }

    /// The source root.
    #[must_use]
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    /// Resolves a file on disk.
    ///
    /// Relative paths are taken relative to the source root. Directories
    /// are excluded, which is the only rule that consults the filesystem.
    #[must_use]
    pub fn resolve(&self, path: &Utf8Path) -> Option<String> {
        let absolute = self.absolutize(path);
        if absolute.is_dir() {
            trace!(path = %absolute, "Excluded directory");
            return None;
        }
        self.logical_path(&absolute)
    }

    /// Resolves a path without touching the filesystem.
    ///
    /// Used for files that may already be gone, such as deletions.
    #[must_use]
    pub fn logical_path(&self, path: &Utf8Path) -> Option<String> {
        let absolute = self.absolutize(path);
        let relative = absolute.strip_prefix(&self.source_root).ok()?;
        if relative.as_str().is_empty() {
            return None;
        }

        if relative.components().any(|c| is_hidden_or_partial(c.as_str())) {
            trace!(path = %relative, "Excluded dotfile or partial");
            return None;
        }

        let logical = self.strip_extensions(relative.as_str());

        if logical == self.layout_name || logical.starts_with(self.layouts_dir.as_str()) {
            trace!(path = %logical, "Excluded layout");
            return None;
        }

        Some(logical)
    }

    /// Strips trailing template extensions, one per pass.
    #[must_use]
    pub fn strip_extensions(&self, path: &str) -> String {
        let mut logical = path.to_owned();
        while let Some(ext) = Utf8Path::new(&logical).extension() {
            if !self.extensions.has_extension(ext) {
                break;
            }
            let new_len = logical.len() - ext.len() - 1;
            logical.truncate(new_len);
        }
        logical
    }

    fn absolutize(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.source_root.join(path)
        }
    }
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("source_root", &self.source_root)
            .field("layouts_dir", &self.layouts_dir)
            .field("layout_name", &self.layout_name)
            .finish_non_exhaustive()
    }
}

/// Dotfiles, and `_partials` unless escaped as `__name`.
fn is_hidden_or_partial(component: &str) -> bool {
    component.starts_with('.') || (component.starts_with('_') && !component.starts_with("__"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::TemplateExtensions;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> PathResolver {
        PathResolver::new("/site/source", Arc::new(TemplateExtensions::default()))
    }

    fn logical(path: &str) -> Option<String> {
        resolver().logical_path(Utf8Path::new(path))
    }

    #[test]
    fn test_strips_template_chain() {
        assert_eq!(logical("/site/source/index.html.erb").as_deref(), Some("index.html"));
        assert_eq!(
            logical("/site/source/blog/post.html.md.erb").as_deref(),
            Some("blog/post.html")
        );
        assert_eq!(logical("/site/source/style.css").as_deref(), Some("style.css"));
        assert_eq!(logical("/site/source/feed.xml.builder").as_deref(), Some("feed.xml"));
    }

    #[test]
    fn test_only_trailing_extension_is_stripped() {
        // An extension-like name earlier in the path stays put
        assert_eq!(
            logical("/site/source/erb/x.erb.html.erb").as_deref(),
            Some("erb/x.erb.html")
        );
        assert_eq!(logical("/site/source/notes.md").as_deref(), Some("notes"));
    }

    #[test]
    fn test_dotfiles_and_partials() {
        assert_eq!(logical("/site/source/.hidden.html"), None);
        assert_eq!(logical("/site/source/.well-known/x.txt"), None);
        assert_eq!(logical("/site/source/_partial.html.erb"), None);
        assert_eq!(logical("/site/source/shared/_nav.erb"), None);
        assert_eq!(logical("/site/source/_drafts/post.html"), None);
        assert_eq!(
            logical("/site/source/__escaped.html.erb").as_deref(),
            Some("__escaped.html")
        );
    }

    #[test]
    fn test_root_dot_segments_do_not_exclude() {
        let resolver = PathResolver::new("/home/me/.sites/_x/source", Arc::new(TemplateExtensions::default()));
        assert_eq!(
            resolver
                .logical_path(Utf8Path::new("/home/me/.sites/_x/source/index.html"))
                .as_deref(),
            Some("index.html")
        );
    }

    #[test]
    fn test_layouts_excluded() {
        assert_eq!(logical("/site/source/layouts/main.html.erb"), None);
        assert_eq!(logical("/site/source/layout.erb"), None);
        // Prefix match on the whole path, as for the layouts directory
        assert_eq!(logical("/site/source/layouts-old.html"), None);
        assert_eq!(logical("/site/source/layout.html.erb").as_deref(), Some("layout.html"));
        assert_eq!(logical("/site/source/blog/layouts/x.html").as_deref(), Some("blog/layouts/x.html"));
    }

    #[test]
    fn test_custom_layout_names() {
        let resolver = resolver().with_layouts("_templates_dir", "base");
        assert_eq!(resolver.logical_path(Utf8Path::new("/site/source/base.erb")), None);
        assert_eq!(
            resolver
                .logical_path(Utf8Path::new("/site/source/layouts/x.html"))
                .as_deref(),
            Some("layouts/x.html")
        );
    }

    #[test]
    fn test_outside_root_and_root_itself() {
        assert_eq!(logical("/other/index.html"), None);
        assert_eq!(logical("/site/source-old/index.html"), None);
        assert_eq!(logical("/site/source"), None);
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        assert_eq!(logical("about.html.haml").as_deref(), Some("about.html"));
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let resolver = PathResolver::new("site/source", Arc::new(TemplateExtensions::default()));
        assert!(resolver.source_root().is_absolute());
        assert!(resolver.source_root().ends_with("site/source"));

        // Full paths under the absolute root resolve without a doubled prefix
        let full = resolver.source_root().join("index.html.erb");
        assert_eq!(resolver.logical_path(&full).as_deref(), Some("index.html"));
        assert_eq!(
            resolver.logical_path(Utf8Path::new("index.html.erb")).as_deref(),
            Some("index.html")
        );
    }

    #[test]
    fn test_resolve_is_deterministic_and_idempotent() {
        let resolver = resolver();
        let path = Utf8Path::new("/site/source/a/b.html.slim");
        let first = resolver.logical_path(path);
        assert_eq!(first, resolver.logical_path(path));
        // Resolving the logical path again changes nothing
        let again = resolver.logical_path(&resolver.source_root().join(first.as_deref().unwrap()));
        assert_eq!(again, first);
    }

    #[test]
    fn test_resolve_excludes_directories() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::create_dir_all(root.join("blog.erb")).unwrap();
        fs::write(root.join("index.html.erb"), "").unwrap();

        let resolver = PathResolver::new(root, Arc::new(TemplateExtensions::default()));
        assert_eq!(resolver.resolve(&root.join("blog.erb")), None);
        assert_eq!(resolver.resolve(root), None);
        assert_eq!(
            resolver.resolve(&root.join("index.html.erb")).as_deref(),
            Some("index.html")
        );
    }
}
