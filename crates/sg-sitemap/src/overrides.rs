//! Route overrides: `ignore`, `reroute`, and `page` declarations.
//!
//! `ignore` and `reroute` become [`OverrideCommand`]s that run against the
//! index right away once it is set up, or are queued and replayed at the
//! end of setup.
//!
//! `page` records metadata for a path, a glob, or a regular expression.
//! Patterns are not resolved against the index when declared: they are
//! evaluated in [`RouteOverrides::manipulate_resource_list`], once the
//! complete resource list exists.

use std::sync::Arc;

use camino::Utf8PathBuf;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sg_core::{strip_leading_slash, PathMatcher, SiteConfig};
use tracing::debug;

use crate::error::SitemapError;
use crate::index::{OverrideCommand, SitemapIndex};
use crate::resource::{PageMetadata, Resource};

/// The `layout` option of a page declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutChoice {
    /// Use the named layout.
    Named(String),
    /// `false` renders without a layout.
    Toggle(bool),
}

impl LayoutChoice {
    fn to_value(&self) -> Value {
        match self {
            Self::Named(name) => Value::String(name.clone()),
            Self::Toggle(enabled) => Value::Bool(*enabled),
        }
    }
}

/// Options of a page declaration.
///
/// Unknown keys are kept and passed on as page metadata.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use sg_sitemap::PageOptions;
///
/// let options = PageOptions::new()
///     .with_layout("article")
///     .with_local("title", json!("Hello"))
///     .with_option("directory_indexes", json!(false));
/// assert!(options.proxy.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    /// Layout to render with; the configured default when absent.
    pub layout: Option<LayoutChoice>,
    /// Template locals.
    pub locals: Map<String, Value>,
    /// Render another path's source instead. Single paths only.
    pub proxy: Option<String>,
    /// Exclude the path from the build. Single paths only.
    pub ignore: bool,
    /// Any other options, passed through as metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the named layout.
    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(LayoutChoice::Named(layout.into()));
        self
    }

    /// Renders without a layout.
    #[must_use]
    pub fn without_layout(mut self) -> Self {
        self.layout = Some(LayoutChoice::Toggle(false));
        self
    }

    /// Adds a template local.
    #[must_use]
    pub fn with_local(mut self, key: impl Into<String>, value: Value) -> Self {
        self.locals.insert(key.into(), value);
        self
    }

    /// Adds a pass-through option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Proxies the path to `target`.
    #[must_use]
    pub fn with_proxy(mut self, target: impl Into<String>) -> Self {
        self.proxy = Some(target.into());
        self
    }

    /// Ignores the path.
    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }
}

/// A recorded page declaration.
#[derive(Debug, Clone)]
pub struct PageConfig {
    /// Paths the declaration applies to.
    pub matcher: PathMatcher,
    /// Metadata merged into matching resources.
    pub metadata: PageMetadata,
}

/// Records and applies route overrides for one sitemap.
#[derive(Debug)]
pub struct RouteOverrides {
    index: Arc<SitemapIndex>,
    source_root: Utf8PathBuf,
    index_file: String,
    default_layout: Option<String>,
    pages: RwLock<Vec<PageConfig>>,
}

impl RouteOverrides {
    /// Creates the override layer for `index`, taking the source root,
    /// index file, and default layout from `config`.
    #[must_use]
    pub fn new(index: Arc<SitemapIndex>, config: &SiteConfig) -> Self {
        Self {
            index,
            source_root: config.source_path(),
            index_file: config.index_file.clone(),
            default_layout: config.default_layout.clone(),
            pages: RwLock::new(Vec::new()),
        }
    }

    /// Keeps `path` out of the build.
    pub fn ignore(&self, path: &str) {
        self.index.run_or_queue(OverrideCommand::Ignore {
            path: path.to_owned(),
        });
    }

    /// Makes `url` render the resource at `target`.
    ///
    /// The target does not have to exist yet; see
    /// [`SitemapIndex::dangling_proxies`].
    pub fn reroute(&self, url: &str, target: &str) {
        self.index.run_or_queue(OverrideCommand::Reroute {
            path: url.to_owned(),
            target: target.to_owned(),
        });
    }

    /// Declares options for a path or glob.
    ///
    /// A single path is normalized to `/path`; a trailing `/` or a
    /// directory under the source root gets the index file appended. With
    /// `proxy` set the path is rerouted and nothing else is recorded; with
    /// `ignore` set it is ignored and its metadata still recorded.
    ///
    /// # Errors
    ///
    /// - [`SitemapError::Matcher`] for a malformed glob
    /// - [`SitemapError::InvalidPage`] when `proxy` or `ignore` is combined
    ///   with a glob
    pub fn page(&self, path: &str, mut options: PageOptions) -> Result<(), SitemapError> {
        if PathMatcher::is_pattern(path) {
            reject_single_path_options(path, &options)?;
            let matcher = PathMatcher::glob(path)?;
            self.record(matcher, &mut options);
            return Ok(());
        }

        let path = self.normalize_page_path(path);

        if let Some(target) = options.proxy.take() {
            self.reroute(&path, &target);
            return Ok(());
        }
        if options.ignore {
            self.ignore(&path);
        }

        self.record(PathMatcher::exact(&path), &mut options);
        Ok(())
    }

    /// Declares options for every path matching a regular expression.
    ///
    /// # Errors
    ///
    /// - [`SitemapError::Matcher`] for a malformed expression
    /// - [`SitemapError::InvalidPage`] when `proxy` or `ignore` is set
    pub fn page_regex(&self, pattern: &str, mut options: PageOptions) -> Result<(), SitemapError> {
        reject_single_path_options(pattern, &options)?;
        let matcher = PathMatcher::regex(pattern)?;
        self.record(matcher, &mut options);
        Ok(())
    }

    /// Recorded page declarations, in declaration order.
    #[must_use]
    pub fn pages(&self) -> Vec<PageConfig> {
        self.pages.read().clone()
    }

    /// Merges the metadata of every matching declaration into each
    /// resource, in declaration order.
    pub fn manipulate_resource_list(&self, resources: &mut [Resource]) {
        let pages = self.pages.read();
        for resource in resources.iter_mut() {
            for page in pages.iter() {
                if page.matcher.is_match(&resource.path) {
                    resource.add_metadata(&page.metadata);
                }
            }
        }
    }

    fn normalize_page_path(&self, path: &str) -> String {
        let stripped = strip_leading_slash(path);
        let is_dir = !stripped.is_empty() && self.source_root.join(stripped).is_dir();

        if stripped.is_empty() || stripped.ends_with('/') {
            format!("/{stripped}{}", self.index_file)
        } else if is_dir {
            format!("/{stripped}/{}", self.index_file)
        } else {
            format!("/{stripped}")
        }
    }

    fn record(&self, matcher: PathMatcher, options: &mut PageOptions) {
        let mut meta_options = std::mem::take(&mut options.extra);
        let layout = match options.layout.take() {
            Some(choice) => Some(choice.to_value()),
            None => self.default_layout.clone().map(Value::String),
        };
        if let Some(layout) = layout {
            meta_options.insert("layout".to_owned(), layout);
        }

        let metadata = PageMetadata {
            options: meta_options,
            locals: std::mem::take(&mut options.locals),
        };
        debug!(matcher = %matcher, "Page declared");
        self.pages.write().push(PageConfig { matcher, metadata });
    }
}

fn reject_single_path_options(pattern: &str, options: &PageOptions) -> Result<(), SitemapError> {
    if options.proxy.is_some() {
        return Err(SitemapError::invalid_page(pattern, "proxy needs a single path"));
    }
    if options.ignore {
        return Err(SitemapError::invalid_page(pattern, "ignore needs a single path"));
    }
    Ok(())
}
