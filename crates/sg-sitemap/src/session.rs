//! A configured site: sources, the sitemap index, and route overrides
//! wired together.

use std::sync::Arc;

use sg_core::{SiteConfig, SourceType};
use sg_sources::{PollReport, Sources, WatcherHandle};
use sg_watcher::WatcherOptions;
use tracing::{info, warn};

use crate::error::SitemapError;
use crate::extensions::{RenderableExtensions, TemplateExtensions};
use crate::index::{SetupReport, SitemapIndex};
use crate::overrides::RouteOverrides;
use crate::resolver::PathResolver;
use crate::resource::Resource;

/// Everything needed to track one site.
///
/// Creating a session registers watchers for the source, data, and locales
/// directories and subscribes the index to source changes. Nothing is
/// scanned until [`setup`](Self::setup).
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use sg_core::SiteConfig;
/// use sg_sitemap::{PageOptions, SiteSession};
///
/// let session = SiteSession::with_default_extensions(SiteConfig::new(Utf8Path::new("my-site")))?;
/// session.overrides().ignore("/drafts.html");
/// session.overrides().page("/blog/*", PageOptions::new().with_layout("post"))?;
///
/// session.setup()?;
/// for resource in session.resources() {
///     println!("{}", resource.path);
/// }
/// # Ok::<(), sg_sitemap::SitemapError>(())
/// ```
#[derive(Debug)]
pub struct SiteSession {
    config: SiteConfig,
    sources: Sources,
    watchers: Vec<WatcherHandle>,
    index: Arc<SitemapIndex>,
    overrides: RouteOverrides,
}

impl SiteSession {
    /// Creates a session for `config`.
    ///
    /// The root is canonicalized first, so a relative root behaves exactly
    /// like its absolute form.
    ///
    /// # Errors
    ///
    /// - [`SitemapError::Config`] if the configuration is invalid
    /// - [`SitemapError::Sources`] if a watcher can't be registered
    pub fn new(mut config: SiteConfig, extensions: Arc<dyn RenderableExtensions>) -> Result<Self, SitemapError> {
        config.canonicalize_root()?;

        let sources = Sources::new();
        let mut watchers = Vec::with_capacity(3);
        for (source_type, path) in [
            (SourceType::Source, config.source_path()),
            (SourceType::Data, config.data_path()),
            (SourceType::Locales, config.locales_path()),
        ] {
            let options = WatcherOptions::new(source_type, path)
                .with_priority(config.default_priority)
                .with_watch_config(config.watch.clone());
            watchers.push(sources.watch(options)?);
        }

        let resolver = PathResolver::new(config.source_path(), extensions)
            .with_layouts(config.layouts_dir.as_str(), config.layout_name.as_str());
        let index = Arc::new(SitemapIndex::new(resolver));
        index.attach(&sources);

        let overrides = RouteOverrides::new(Arc::clone(&index), &config);

        info!(root = %config.root, watchers = watchers.len(), "Site session created");
        Ok(Self {
            config,
            sources,
            watchers,
            index,
            overrides,
        })
    }

    /// Creates a session using [`TemplateExtensions::default`].
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_default_extensions(config: SiteConfig) -> Result<Self, SitemapError> {
        Self::new(config, Arc::new(TemplateExtensions::default()))
    }

    /// Polls every watcher once, then builds the sitemap and replays
    /// overrides declared so far.
    ///
    /// Watcher failures are logged and don't prevent setup.
    ///
    /// # Errors
    ///
    /// Propagates [`SitemapIndex::setup`] errors.
    pub fn setup(&self) -> Result<SetupReport, SitemapError> {
        let poll = self.sources.poll_all();
        log_failures(&poll);
        self.index.setup()
    }

    /// Starts live change notification.
    pub fn start(&self) {
        self.sources.start();
    }

    /// Stops live change notification and cancels an in-flight setup scan.
    pub fn stop(&self) {
        self.sources.stop();
        self.index.stop();
    }

    /// Every path that will be built, with page metadata applied.
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources = self.index.resources();
        self.overrides.manipulate_resource_list(&mut resources);
        resources
    }

    /// The configuration the session was created from.
    #[must_use]
    pub const fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// The source registry.
    #[must_use]
    pub const fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Handles of the watchers registered at creation.
    #[must_use]
    pub fn watchers(&self) -> &[WatcherHandle] {
        &self.watchers
    }

    /// The sitemap index.
    #[must_use]
    pub const fn index(&self) -> &Arc<SitemapIndex> {
        &self.index
    }

    /// The route override layer.
    #[must_use]
    pub const fn overrides(&self) -> &RouteOverrides {
        &self.overrides
    }
}

impl Drop for SiteSession {
    fn drop(&mut self) {
        self.sources.stop();
    }
}

fn log_failures(report: &PollReport) {
    for failure in &report.failures {
        warn!(error = %failure, "Watcher failed during setup");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use serde_json::json;
    use sg_core::PathEntry;
    use std::fs;
    use tempfile::TempDir;

    use crate::overrides::PageOptions;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        let source = root.join("source");
        fs::create_dir_all(source.join("layouts")).unwrap();
        fs::create_dir_all(root.join("data")).unwrap();
        fs::write(source.join("index.html.erb"), "").unwrap();
        fs::write(source.join("about.html.md"), "").unwrap();
        fs::write(source.join("_footer.html.erb"), "").unwrap();
        fs::write(source.join("layouts/base.erb"), "").unwrap();
        fs::write(root.join("data/team.yml"), "").unwrap();
        (dir, SiteConfig::new(&root))
    }

    #[test]
    fn test_new_registers_three_watchers() {
        let (_dir, config) = site();
        let session = SiteSession::with_default_extensions(config).unwrap();
        let types: Vec<String> = session
            .watchers()
            .iter()
            .map(|h| h.source_type().to_string())
            .collect();
        assert_eq!(types, vec!["source", "data", "locales"]);
        assert!(!session.index().is_setup());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().join("missing");
        let err = SiteSession::with_default_extensions(SiteConfig::new(&root)).unwrap_err();
        assert!(matches!(err, SitemapError::Config(_)));
    }

    #[test]
    fn test_setup_builds_sitemap_and_replays_overrides() {
        let (_dir, config) = site();
        let session = SiteSession::with_default_extensions(config).unwrap();
        session.overrides().ignore("/about.html");
        session.overrides().reroute("/team.html", "/index.html");
        session
            .overrides()
            .page("/index.html", PageOptions::new().with_local("home", json!(true)))
            .unwrap();

        let report = session.setup().unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.replayed, 2);

        let resources = session.resources();
        let paths: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "team.html"]);
        assert_eq!(resources[0].metadata.locals["home"], json!(true));
        assert_eq!(resources[1].proxied_to.as_deref(), Some("index.html"));
    }

    #[test]
    fn test_source_changes_reach_index() {
        let (dir, config) = site();
        let session = SiteSession::with_default_extensions(config).unwrap();
        session.setup().unwrap();

        let source = Utf8Path::from_path(dir.path()).unwrap().join("source");
        fs::write(source.join("contact.html.haml"), "").unwrap();
        fs::remove_file(source.join("about.html.md")).unwrap();
        session.sources().rescan();

        assert_eq!(session.index().entry("contact.html"), Some(PathEntry::Normal));
        assert!(!session.index().path_exists("about.html"));
    }

    #[test]
    fn test_data_changes_do_not_reach_index() {
        let (dir, config) = site();
        let session = SiteSession::with_default_extensions(config).unwrap();
        session.setup().unwrap();

        let data = Utf8Path::from_path(dir.path()).unwrap().join("data");
        fs::write(data.join("posts.html"), "").unwrap();
        session.sources().rescan();

        assert!(!session.index().path_exists("posts.html"));
        assert!(session.sources().exists(&SourceType::Data, "posts.html"));
    }

    #[test]
    fn test_custom_layout_names_flow_to_resolver() {
        let (dir, mut config) = site();
        config.layouts_dir = "templates".to_owned();
        let source = Utf8Path::from_path(dir.path()).unwrap().join("source");
        fs::create_dir_all(source.join("templates")).unwrap();
        fs::write(source.join("templates/post.erb"), "").unwrap();

        let session = SiteSession::with_default_extensions(config).unwrap();
        session.setup().unwrap();
        assert!(!session.index().path_exists("templates/post"));
        assert!(session.index().path_exists("layouts/base"));
    }

    #[test]
    fn test_relative_root_keeps_index_current() {
        let dir = tempfile::Builder::new()
            .prefix("sg-session-root")
            .tempdir_in(".")
            .unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("index.html.erb"), "").unwrap();
        let name = dir.path().file_name().unwrap().to_str().unwrap();

        let config = SiteConfig::new(&Utf8Path::new(".").join(name));
        let session = SiteSession::with_default_extensions(config).unwrap();
        assert!(session.config().root.is_absolute());
        session.setup().unwrap();
        assert_eq!(session.index().all_paths(), vec!["index.html".to_owned()]);

        fs::write(source.join("about.html.md"), "").unwrap();
        fs::remove_file(source.join("index.html.erb")).unwrap();
        session.sources().rescan();
        assert_eq!(session.index().all_paths(), vec!["about.html".to_owned()]);

        let file = session
            .sources()
            .find(&SourceType::Source, "about.html.md", false)
            .unwrap();
        assert!(file.full_path().is_absolute());
        assert!(file.full_path().starts_with(&session.config().root));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (_dir, config) = site();
        let session = SiteSession::with_default_extensions(config).unwrap();
        session.stop();
        session.start();
        session.stop();
        session.stop();
        assert!(!session.sources().is_running());
    }
}
