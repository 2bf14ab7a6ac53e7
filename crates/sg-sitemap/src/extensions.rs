//! Renderable-extension lookup.
//!
//! The resolver strips every trailing extension a template engine would
//! consume (`page.html.erb` → `page.html`). Which extensions those are is
//! decided by the rendering layer; this module only defines the lookup and
//! a default registry.

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// Extensions known to the common template engines.
pub const DEFAULT_TEMPLATE_EXTENSIONS: &[&str] = &[
    "builder", "coffee", "creole", "erb", "erubis", "haml", "less", "liquid", "mab", "markdown",
    "md", "mediawiki", "mkd", "mkdn", "mw", "nokogiri", "radius", "rdoc", "rhtml", "sass", "scss",
    "slim", "str", "textile", "wiki", "yajl",
];

/// Answers whether an extension is consumed by a template engine.
///
/// Extensions are passed without the leading dot.
pub trait RenderableExtensions: Send + Sync {
    /// Returns `true` if files ending in `.{ext}` are rendered by a template
    /// engine.
    fn has_extension(&self, ext: &str) -> bool;
}

impl<F> RenderableExtensions for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn has_extension(&self, ext: &str) -> bool {
        self(ext)
    }
}

/// A mutable registry of template extensions.
///
/// # Examples
///
/// ```
/// use sg_sitemap::{RenderableExtensions, TemplateExtensions};
///
/// let extensions = TemplateExtensions::default();
/// assert!(extensions.has_extension("erb"));
/// assert!(!extensions.has_extension("html"));
///
/// extensions.register(".tera");
/// assert!(extensions.has_extension("tera"));
/// ```
#[derive(Debug)]
pub struct TemplateExtensions {
    known: RwLock<FxHashSet<String>>,
}

impl TemplateExtensions {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            known: RwLock::new(FxHashSet::default()),
        }
    }

    /// Adds an extension; a leading dot is ignored.
    pub fn register(&self, ext: &str) {
        self.known.write().insert(normalize(ext).to_owned());
    }

    /// Removes an extension. Returns `false` if it wasn't registered.
    pub fn unregister(&self, ext: &str) -> bool {
        self.known.write().remove(normalize(ext))
    }

    /// Registered extensions, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut all: Vec<String> = self.known.read().iter().cloned().collect();
        all.sort_unstable();
        all
    }
}

impl Default for TemplateExtensions {
    fn default() -> Self {
        let registry = Self::empty();
        for ext in DEFAULT_TEMPLATE_EXTENSIONS {
            registry.register(ext);
        }
        registry
    }
}

impl RenderableExtensions for TemplateExtensions {
    fn has_extension(&self, ext: &str) -> bool {
        self.known.read().contains(normalize(ext))
    }
}

fn normalize(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let extensions = TemplateExtensions::default();
        for ext in ["erb", "haml", "slim", "md", "markdown", "scss", "str"] {
            assert!(extensions.has_extension(ext), "{ext} should be renderable");
        }
        for ext in ["html", "css", "js", "xml", ""] {
            assert!(!extensions.has_extension(ext), "{ext} should not be renderable");
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let extensions = TemplateExtensions::empty();
        assert!(!extensions.has_extension("erb"));
        extensions.register("erb");
        assert!(extensions.has_extension(".erb"));
        assert!(extensions.unregister(".erb"));
        assert!(!extensions.unregister("erb"));
        assert!(extensions.extensions().is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        let extensions = TemplateExtensions::default();
        assert!(!extensions.has_extension("ERB"));
    }

    #[test]
    fn test_closure_lookup() {
        let only_erb = |ext: &str| ext == "erb";
        assert!(only_erb.has_extension("erb"));
        assert!(!only_erb.has_extension("haml"));
    }
}
