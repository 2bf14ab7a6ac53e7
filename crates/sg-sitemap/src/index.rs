//! The sitemap index.
//!
//! [`SitemapIndex`] maps every logical path to exactly one [`PathEntry`].
//! It is populated once by [`setup`](SitemapIndex::setup) from a full scan
//! of the source root and then kept current by change batches routed from
//! [`Sources`].
//!
//! # Derived sets
//!
//! The ignored, generic, and proxied path lists are computed in a single
//! pass over the map and cached. Every mutation clears all three caches;
//! they are rebuilt on the next read.
//!
//! # Locking
//!
//! Two locks, always taken in this order:
//!
//! 1. `lifecycle`: setup state and the queue of deferred overrides
//! 2. `state`: the map and its caches
//!
//! A routed batch is applied under one write lock, so readers see either
//! none of it or all of it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::Serialize;
use sg_core::{strip_leading_slash, PathEntry, PathTarget, SourceFile, SourceType};
use sg_sources::Sources;
use sg_watcher::FileWalker;
use tracing::{debug, info, warn};

use crate::error::SitemapError;
use crate::resolver::PathResolver;
use crate::resource::Resource;

/// A deferred sitemap mutation declared by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideCommand {
    /// Ignore a path.
    Ignore {
        /// The path to ignore.
        path: String,
    },
    /// Proxy a path to another path.
    Reroute {
        /// The path being declared.
        path: String,
        /// The path whose resource it renders.
        target: String,
    },
}

impl OverrideCommand {
    fn apply(self, index: &SitemapIndex) {
        match self {
            Self::Ignore { path } => index.ignore_path(&path),
            Self::Reroute { path, target } => index.set_path(&path, PathTarget::Proxy(target)),
        }
    }
}

/// What [`SitemapIndex::setup`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    /// Files found by the scan.
    pub scanned: usize,
    /// New entries added.
    pub added: usize,
    /// Files excluded by the resolver.
    pub excluded: usize,
    /// Deferred overrides replayed.
    pub replayed: usize,
}

/// Net effect of one routed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Entries added.
    pub added: usize,
    /// Entries removed.
    pub removed: usize,
}

#[derive(Debug, Default)]
struct DerivedCaches {
    ignored: Option<Vec<String>>,
    generic: Option<Vec<String>>,
    proxied: Option<Vec<String>>,
}

impl DerivedCaches {
    fn is_valid(&self) -> bool {
        self.ignored.is_some() && self.generic.is_some() && self.proxied.is_some()
    }

    fn rebuild(&mut self, map: &FxHashMap<String, PathEntry>) {
        let mut ignored = Vec::new();
        let mut generic = Vec::new();
        let mut proxied = Vec::new();
        for (path, entry) in map {
            match entry {
                PathEntry::Normal => {}
                PathEntry::Generic => generic.push(path.clone()),
                PathEntry::Ignored => ignored.push(path.clone()),
                PathEntry::Proxy(_) => proxied.push(path.clone()),
            }
        }
        ignored.sort_unstable();
        generic.sort_unstable();
        proxied.sort_unstable();
        self.ignored = Some(ignored);
        self.generic = Some(generic);
        self.proxied = Some(proxied);
    }
}

#[derive(Debug, Default)]
struct IndexState {
    map: FxHashMap<String, PathEntry>,
    caches: DerivedCaches,
}

impl IndexState {
    fn set(&mut self, path: String, entry: PathEntry) {
        self.map.insert(path, entry);
        self.caches = DerivedCaches::default();
    }

    /// Adds a scan-discovered path unless it is already known.
    fn add_discovered(&mut self, path: String) -> bool {
        if self.map.contains_key(&path) {
            return false;
        }
        self.set(path, PathEntry::Normal);
        true
    }

    fn remove(&mut self, path: &str) -> Option<PathEntry> {
        let removed = self.map.remove(path);
        if removed.is_some() {
            self.caches = DerivedCaches::default();
        }
        removed
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    initialized: bool,
    queue: VecDeque<OverrideCommand>,
}

/// The authoritative map from logical path to [`PathEntry`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sg_sitemap::{PathResolver, SitemapIndex, TemplateExtensions};
///
/// let resolver = PathResolver::new("/site/source", Arc::new(TemplateExtensions::default()));
/// let index = SitemapIndex::new(resolver);
///
/// index.set_path("/team", "/about.html");
/// assert!(index.is_proxy("team"));
/// assert_eq!(index.target_of("/team").as_deref(), Some("about.html"));
///
/// index.ignore_path("/drafts.html");
/// assert!(index.is_ignored("drafts.html"));
/// assert_eq!(index.ignored_paths(), vec!["drafts.html".to_owned()]);
/// ```
#[derive(Debug)]
pub struct SitemapIndex {
    resolver: PathResolver,
    lifecycle: Mutex<Lifecycle>,
    state: RwLock<IndexState>,
    cancel: Mutex<Option<Arc<AtomicBool>>>,
}

impl SitemapIndex {
    /// Creates an empty index that is not yet set up.
    #[must_use]
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            lifecycle: Mutex::new(Lifecycle::default()),
            state: RwLock::new(IndexState::default()),
            cancel: Mutex::new(None),
        }
    }

    /// The resolver used for discovered files.
    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Scans the source root, adds a [`PathEntry::Normal`] for every newly
    /// resolved path, replays deferred overrides in order, and marks the
    /// index as set up.
    ///
    /// A missing source root is logged and scanned as empty.
    ///
    /// # Errors
    ///
    /// - [`SitemapError::AlreadySetup`] on a second call
    /// - [`SitemapError::Cancelled`] if [`stop`](Self::stop) interrupted
    ///   the scan; nothing was committed and setup may be retried
    /// - [`SitemapError::Scan`] if the source root can't be walked
    pub fn setup(&self) -> Result<SetupReport, SitemapError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.initialized {
            return Err(SitemapError::AlreadySetup);
        }

        let root = self.resolver.source_root();
        let mut report = SetupReport::default();

        let cancel = Arc::new(AtomicBool::new(false));
        *self.cancel.lock() = Some(Arc::clone(&cancel));
        let scanned = self.scan_root(&cancel);
        *self.cancel.lock() = None;
        let (walked, resolved) = scanned?;

        report.scanned = walked;
        report.excluded = report.scanned - resolved.len();

        {
            let mut state = self.state.write();
            for path in resolved {
                if state.add_discovered(path) {
                    report.added += 1;
                }
            }
        }

        while let Some(command) = lifecycle.queue.pop_front() {
            command.apply(self);
            report.replayed += 1;
        }
        lifecycle.initialized = true;

        info!(
            root = %root,
            scanned = report.scanned,
            added = report.added,
            excluded = report.excluded,
            replayed = report.replayed,
            "Sitemap ready"
        );
        Ok(report)
    }

    /// Walks and resolves the source root without touching the map.
    ///
    /// Returns the number of files walked and the resolved paths. The
    /// cancel flag is checked once more after resolution so a stop raised
    /// at any point of the scan commits nothing.
    fn scan_root(&self, cancel: &Arc<AtomicBool>) -> Result<(usize, Vec<String>), SitemapError> {
        let root = self.resolver.source_root();
        if !root.is_dir() {
            warn!(root = %root, "Source directory missing, sitemap starts empty");
            return Ok((0, Vec::new()));
        }

        let files = FileWalker::new(root)?
            .with_cancel_flag(Arc::clone(cancel))
            .collect_paths()?;
        let resolved: Vec<String> = files
            .iter()
            .filter_map(|file| self.resolver.resolve(file))
            .collect();

        if cancel.load(Ordering::Acquire) {
            debug!(root = %root, "Sitemap scan cancelled, nothing committed");
            return Err(SitemapError::Cancelled);
        }
        Ok((files.len(), resolved))
    }

    /// Abandons an in-flight setup scan.
    pub fn stop(&self) {
        if let Some(cancel) = self.cancel.lock().as_ref() {
            cancel.store(true, Ordering::Release);
            debug!("Sitemap scan cancellation requested");
        }
    }

    /// Returns `true` once [`setup`](Self::setup) has completed.
    #[must_use]
    pub fn is_setup(&self) -> bool {
        self.lifecycle.lock().initialized
    }

    /// Runs `command` now if the index is set up, otherwise queues it for
    /// replay at the end of setup.
    pub fn run_or_queue(&self, command: OverrideCommand) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.initialized {
            command.apply(self);
        } else {
            debug!(?command, "Queued until setup");
            lifecycle.queue.push_back(command);
        }
    }

    /// Number of overrides waiting for setup.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.lifecycle.lock().queue.len()
    }

    /// Subscribes the index to routed `source` changes.
    ///
    /// The subscription holds a weak reference; dropping the index ends it.
    pub fn attach(self: &Arc<Self>, sources: &Sources) {
        let index = Arc::downgrade(self);
        sources.on_change(SourceType::Source, move |updated, removed| {
            if let Some(index) = index.upgrade() {
                index.apply_changes(updated, removed);
            }
        });
    }

    // -------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------

    /// Sets the entry for `path`, replacing whatever was there.
    pub fn set_path(&self, path: &str, target: impl Into<PathTarget>) {
        let path = strip_leading_slash(path).to_owned();
        let entry = target.into().into_entry();
        debug!(path = %path, entry = %entry, "Set path");
        self.state.write().set(path, entry);
    }

    /// Marks `path` as ignored.
    pub fn ignore_path(&self, path: &str) {
        self.set_path(path, PathTarget::Ignore);
    }

    /// Removes the entry for `path`, returning it.
    pub fn remove_path(&self, path: &str) -> Option<PathEntry> {
        self.state.write().remove(strip_leading_slash(path))
    }

    /// Adds the logical path of a new file. Known paths are left alone.
    ///
    /// Returns `true` if an entry was added.
    pub fn touch_file(&self, file: &Utf8Path) -> bool {
        let Some(path) = self.resolver.resolve(file) else {
            return false;
        };
        self.state.write().add_discovered(path)
    }

    /// Removes the entry for the logical path of a deleted file, whatever
    /// kind of entry it is.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_file(&self, file: &Utf8Path) -> bool {
        let Some(path) = self.resolver.logical_path(file) else {
            return false;
        };
        self.state.write().remove(&path).is_some()
    }

    /// Applies one routed batch under a single write lock.
    pub fn apply_changes(&self, updated: &[SourceFile], removed: &[SourceFile]) -> ApplySummary {
        // Resolve before locking; resolution may stat the file
        let added: Vec<String> = updated
            .iter()
            .filter(|f| !f.is_directory())
            .filter_map(|f| self.resolver.resolve(f.full_path()))
            .collect();
        let gone: Vec<String> = removed
            .iter()
            .filter_map(|f| self.resolver.logical_path(f.full_path()))
            .collect();

        let mut summary = ApplySummary::default();
        {
            let mut state = self.state.write();
            for path in gone {
                if state.remove(&path).is_some() {
                    summary.removed += 1;
                }
            }
            for path in added {
                if state.add_discovered(path) {
                    summary.added += 1;
                }
            }
        }

        if summary != ApplySummary::default() {
            debug!(added = summary.added, removed = summary.removed, "Sitemap updated");
        }
        summary
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Returns `true` if the index has an entry for `path`.
    #[must_use]
    pub fn path_exists(&self, path: &str) -> bool {
        self.state.read().map.contains_key(strip_leading_slash(path))
    }

    /// Returns `true` if `path` is a proxy.
    #[must_use]
    pub fn is_proxy(&self, path: &str) -> bool {
        self.target_of(path).is_some()
    }

    /// The proxy target of `path`, if it is a proxy.
    #[must_use]
    pub fn target_of(&self, path: &str) -> Option<String> {
        self.state
            .read()
            .map
            .get(strip_leading_slash(path))
            .and_then(PathEntry::proxy_target)
            .map(str::to_owned)
    }

    /// The entry for `path`.
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<PathEntry> {
        self.state.read().map.get(strip_leading_slash(path)).cloned()
    }

    /// Returns `true` if `path` is ignored.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = strip_leading_slash(path);
        self.derived(|caches| caches.ignored.as_deref().map(|paths| contains_sorted(paths, path)))
    }

    /// Returns `true` if `path` is explicitly allowed.
    #[must_use]
    pub fn is_generic(&self, path: &str) -> bool {
        let path = strip_leading_slash(path);
        self.derived(|caches| caches.generic.as_deref().map(|paths| contains_sorted(paths, path)))
    }

    /// Returns `true` if `path` is proxied.
    #[must_use]
    pub fn is_proxied(&self, path: &str) -> bool {
        let path = strip_leading_slash(path);
        self.derived(|caches| caches.proxied.as_deref().map(|paths| contains_sorted(paths, path)))
    }

    /// Ignored paths, sorted.
    #[must_use]
    pub fn ignored_paths(&self) -> Vec<String> {
        self.derived(|caches| caches.ignored.clone())
    }

    /// Explicitly allowed paths, sorted.
    #[must_use]
    pub fn generic_paths(&self) -> Vec<String> {
        self.derived(|caches| caches.generic.clone())
    }

    /// Proxied paths, sorted.
    #[must_use]
    pub fn proxied_paths(&self) -> Vec<String> {
        self.derived(|caches| caches.proxied.clone())
    }

    /// Proxies whose target has no entry, as `(path, target)` pairs.
    #[must_use]
    pub fn dangling_proxies(&self) -> Vec<(String, String)> {
        let state = self.state.read();
        let mut dangling: Vec<(String, String)> = state
            .map
            .iter()
            .filter_map(|(path, entry)| {
                let target = entry.proxy_target()?;
                (!state.map.contains_key(target)).then(|| (path.clone(), target.to_owned()))
            })
            .collect();
        dangling.sort_unstable();
        dangling
    }

    /// Every known path, sorted.
    #[must_use]
    pub fn all_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.read().map.keys().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Every entry, sorted by path.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, PathEntry)> {
        let mut entries: Vec<(String, PathEntry)> = self
            .state
            .read()
            .map
            .iter()
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().map.len()
    }

    /// Returns `true` if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().map.is_empty()
    }

    /// Every path that will be built: all entries except ignored ones, in
    /// path order. Proxies carry their target.
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        self.entries()
            .into_iter()
            .filter_map(|(path, entry)| match entry {
                PathEntry::Ignored => None,
                PathEntry::Proxy(target) => Some(Resource::proxy(path, target)),
                PathEntry::Normal | PathEntry::Generic => Some(Resource::new(path)),
            })
            .collect()
    }

    /// Reads from the derived caches under the read lock, rebuilding them
    /// first if a mutation cleared them.
    fn derived<T: Default>(&self, pick: impl Fn(&DerivedCaches) -> Option<T>) -> T {
        if let Some(value) = pick(&self.state.read().caches) {
            return value;
        }

        let mut state = self.state.write();
        if !state.caches.is_valid() {
            let IndexState { map, caches } = &mut *state;
            caches.rebuild(map);
        }
        pick(&state.caches).unwrap_or_default()
    }
}

fn contains_sorted(paths: &[String], path: &str) -> bool {
    paths.binary_search_by(|p| p.as_str().cmp(path)).is_ok()
}
