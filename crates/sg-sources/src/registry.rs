//! The watcher registry.
//!
//! [`Sources`] owns every watcher of a project, keeps them in priority
//! order, and merges their files into one view. It is also the callback bus:
//! each watcher's changes go through the router in [`crate::router`] before
//! reaching subscribers.
//!
//! # Ordering
//!
//! Watchers are ordered by `(priority, registration index)`, descending.
//! The first watcher in that order that has a path owns it: its copy
//! shadows every other watcher's copy in [`Sources::files`] and
//! [`Sources::find`], and only its reports for that path are delivered.
//! Among equal priorities the most recently registered watcher wins.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use camino::Utf8Path;
use parking_lot::{ReentrantMutex, RwLock};
use rustc_hash::FxHashSet;
use sg_core::{PathMatcher, SourceFile, SourceType};
use sg_watcher::{ChangeSet, ChangeSink, SourceWatcher, Watcher, WatcherOptions};
use tracing::{debug, info, warn};

use crate::callbacks::{CallbackDescriptor, ChangeHandler, GlobalIgnore, IgnoreRule, Interest};
use crate::error::SourcesError;
use crate::router;

/// Identifies a registered watcher. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(usize);

impl WatcherId {
    /// Creates an id from a registration index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The registration index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered watcher and its id.
#[derive(Clone)]
pub struct WatcherHandle {
    id: WatcherId,
    watcher: Arc<dyn Watcher>,
}

impl WatcherHandle {
    /// The registration id.
    #[must_use]
    pub const fn id(&self) -> WatcherId {
        self.id
    }

    /// The watcher itself.
    #[must_use]
    pub fn watcher(&self) -> &Arc<dyn Watcher> {
        &self.watcher
    }

    /// The collection the watcher reports.
    #[must_use]
    pub fn source_type(&self) -> &SourceType {
        self.watcher.source_type()
    }

    /// The watcher's priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.watcher.priority()
    }
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("id", &self.id)
            .field("source_type", self.source_type())
            .field("priority", &self.priority())
            .field("root", &self.watcher.root())
            .finish()
    }
}

/// What to register with [`Sources::watch`].
pub enum WatchRequest {
    /// Build a [`SourceWatcher`] from options.
    Options(WatcherOptions),
    /// Register a ready-made watcher.
    Custom(Arc<dyn Watcher>),
}

impl From<WatcherOptions> for WatchRequest {
    fn from(options: WatcherOptions) -> Self {
        Self::Options(options)
    }
}

impl From<Arc<dyn Watcher>> for WatchRequest {
    fn from(watcher: Arc<dyn Watcher>) -> Self {
        Self::Custom(watcher)
    }
}

/// Outcome of [`Sources::poll_all`].
#[derive(Debug, Default)]
pub struct PollReport {
    /// `true` when nothing had changed since the previous poll and no
    /// watcher was scanned.
    pub skipped: bool,
    /// Number of watchers scanned.
    pub polled: usize,
    /// Number of files delivered to callbacks.
    pub delivered: usize,
    /// Watchers whose scan failed. The others were still polled.
    pub failures: Vec<SourcesError>,
}

impl PollReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Returns `true` if every watcher scanned without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registered watchers and their priority-sorted view.
#[derive(Default)]
pub(crate) struct Registry {
    handles: Vec<WatcherHandle>,
    sorted: Vec<WatcherHandle>,
}

impl Registry {
    fn resort(&mut self) {
        let mut sorted = self.handles.clone();
        sorted.sort_by(|a, b| {
            (b.priority(), b.id).cmp(&(a.priority(), a.id))
        });
        self.sorted = sorted;
    }

    pub(crate) fn sorted(&self) -> &[WatcherHandle] {
        &self.sorted
    }

    pub(crate) fn get(&self, id: WatcherId) -> Option<&WatcherHandle> {
        self.handles.iter().find(|h| h.id == id)
    }

    /// Rank in the sorted view; lower ranks own paths first.
    pub(crate) fn rank(&self, id: WatcherId) -> Option<usize> {
        self.sorted.iter().position(|h| h.id == id)
    }

    /// The highest-ranked watcher of an allowed type that has `path`.
    pub(crate) fn owner(&self, types: &[SourceType], path: &str) -> Option<&WatcherHandle> {
        self.sorted
            .iter()
            .filter(|h| types.contains(h.source_type()))
            .find(|h| h.watcher.exists(path))
    }
}

pub(crate) struct SourcesInner {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) callbacks: RwLock<Vec<CallbackDescriptor>>,
    pub(crate) ignores: RwLock<Vec<GlobalIgnore>>,
    /// Serializes routed batches; re-entrant so callbacks may call back in.
    pub(crate) dispatch: ReentrantMutex<()>,
    update_count: AtomicU64,
    last_update_count: AtomicU64,
    running: AtomicBool,
    next_id: AtomicUsize,
}

impl SourcesInner {
    pub(crate) fn bump(&self) -> u64 {
        self.update_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn globally_ignored(&self, file: &SourceFile) -> bool {
        self.ignores.read().iter().any(|rule| rule.ignores(file))
    }
}

/// The registry of watchers for one project.
///
/// Cloning is cheap and every clone shares the same state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sg_core::SourceType;
/// use sg_sources::{Interest, Sources, WatchRequest};
/// use sg_watcher::{MemoryWatcher, Watcher};
///
/// let sources = Sources::new();
/// let memory = Arc::new(MemoryWatcher::new(SourceType::Source));
/// memory.insert("index.html.erb", "/virtual/index.html.erb");
///
/// sources.watch(WatchRequest::Custom(memory))?;
/// sources.on_change(Interest::Type(SourceType::Source), |updated, _removed| {
///     assert_eq!(updated.len(), 1);
/// });
///
/// let report = sources.poll_all();
/// assert_eq!(report.delivered, 1);
/// assert!(sources.exists(&SourceType::Source, "/index.html.erb"));
/// # Ok::<(), sg_sources::SourcesError>(())
/// ```
#[derive(Clone)]
pub struct Sources {
    pub(crate) inner: Arc<SourcesInner>,
}

impl Sources {
    /// Creates an empty, stopped registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SourcesInner {
                registry: RwLock::new(Registry::default()),
                callbacks: RwLock::new(Vec::new()),
                ignores: RwLock::new(Vec::new()),
                dispatch: ReentrantMutex::new(()),
                update_count: AtomicU64::new(0),
                last_update_count: AtomicU64::new(u64::MAX),
                running: AtomicBool::new(false),
                next_id: AtomicUsize::new(0),
            }),
        }
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    /// Registers a watcher.
    ///
    /// If the registry is running, the new watcher is polled once (its
    /// changes routed) and starts listening right away.
    ///
    /// # Errors
    ///
    /// Returns [`SourcesError::InvalidOptions`] for an empty watch path or
    /// an absolute destination prefix.
    pub fn watch(&self, request: impl Into<WatchRequest>) -> Result<WatcherHandle, SourcesError> {
        let watcher: Arc<dyn Watcher> = match request.into() {
            WatchRequest::Options(options) => {
                validate_options(&options)?;
                Arc::new(SourceWatcher::new(options))
            }
            WatchRequest::Custom(watcher) => watcher,
        };

        let id = WatcherId(self.inner.next_id.fetch_add(1, Ordering::AcqRel));
        let handle = WatcherHandle { id, watcher };
        {
            let mut registry = self.inner.registry.write();
            registry.handles.push(handle.clone());
            registry.resort();
        }
        self.inner.bump();

        info!(
            watcher = %id,
            source_type = %handle.source_type(),
            priority = handle.priority(),
            "Registered watcher"
        );

        if self.is_running() {
            if let Err(e) = self.poll_watcher(&handle) {
                warn!(watcher = %id, error = %e, "Initial poll failed");
            }
            self.listen_watcher(&handle);
        }

        Ok(handle)
    }

    /// Unregisters a watcher and stops its listener.
    ///
    /// # Errors
    ///
    /// Returns [`SourcesError::UnknownWatcher`] if `id` isn't registered.
    pub fn unwatch(&self, id: WatcherId) -> Result<WatcherHandle, SourcesError> {
        let handle = {
            let mut registry = self.inner.registry.write();
            let index = registry
                .handles
                .iter()
                .position(|h| h.id == id)
                .ok_or(SourcesError::UnknownWatcher(id))?;
            let handle = registry.handles.remove(index);
            registry.resort();
            handle
        };
        handle.watcher.stop_listener();
        self.inner.bump();
        info!(watcher = %id, "Unregistered watcher");
        Ok(handle)
    }

    /// All watchers, highest priority first.
    #[must_use]
    pub fn watchers(&self) -> Vec<WatcherHandle> {
        self.inner.registry.read().sorted().to_vec()
    }

    /// Watchers of one collection, highest priority first.
    #[must_use]
    pub fn by_type(&self, source_type: &SourceType) -> Vec<WatcherHandle> {
        self.inner
            .registry
            .read()
            .sorted()
            .iter()
            .filter(|h| h.source_type() == source_type)
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Every tracked file, optionally limited to one collection.
    ///
    /// Each relative path appears once: the highest-priority watcher's copy
    /// wins. Globally ignored files are left out.
    #[must_use]
    pub fn files(&self, source_type: Option<&SourceType>) -> Vec<SourceFile> {
        let handles = self.watchers();
        let mut seen = FxHashSet::default();
        let mut files = Vec::new();

        for handle in handles
            .iter()
            .filter(|h| source_type.is_none_or(|t| h.source_type() == t))
        {
            for file in handle.watcher.files() {
                if seen.insert(file.relative_path().to_owned())
                    && !self.inner.globally_ignored(&file)
                {
                    files.push(file);
                }
            }
        }
        files
    }

    /// First match for `path` among watchers of `source_type`, in priority
    /// order. Stops at the first watcher that has it.
    #[must_use]
    pub fn find(&self, source_type: &SourceType, path: &str, glob: bool) -> Option<SourceFile> {
        self.watchers()
            .iter()
            .filter(|h| h.source_type() == source_type)
            .find_map(|h| h.watcher.find(path, glob))
            .filter(|file| !self.inner.globally_ignored(file))
    }

    /// Returns `true` if a watcher of `source_type` has `path`.
    #[must_use]
    pub fn exists(&self, source_type: &SourceType, path: &str) -> bool {
        self.find(source_type, path, false).is_some()
    }

    /// The watcher that owns `path` among watchers of the given types.
    #[must_use]
    pub fn watcher_for_path(&self, types: &[SourceType], path: &str) -> Option<WatcherId> {
        self.inner
            .registry
            .read()
            .owner(types, path)
            .map(WatcherHandle::id)
    }

    /// Returns `true` if `path` is not a known page source, or is globally
    /// ignored.
    #[must_use]
    pub fn ignored(&self, path: &str) -> bool {
        !self.exists(&SourceType::Source, path)
    }

    /// Returns `true` if any global ignore rule matches `file`.
    #[must_use]
    pub fn globally_ignored(&self, file: &SourceFile) -> bool {
        self.inner.globally_ignored(file)
    }

    /// The mutation counter. Only ever increases.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.inner.update_count.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------
    // Polling and lifecycle
    // -------------------------------------------------------------------

    /// Polls every watcher, highest priority first, and routes the changes.
    ///
    /// Does nothing if nothing has changed since the previous call. A
    /// failing watcher is logged and reported; the others are still polled.
    pub fn poll_all(&self) -> PollReport {
        let count = self.update_count();
        if self.inner.last_update_count.swap(count, Ordering::AcqRel) == count {
            debug!(update_count = count, "No changes since last poll, skipping");
            return PollReport::skipped();
        }
        self.rescan()
    }

    /// Alias of [`poll_all`](Self::poll_all).
    pub fn find_new_files(&self) -> PollReport {
        self.poll_all()
    }

    /// Polls every watcher regardless of the mutation counter.
    pub fn rescan(&self) -> PollReport {
        let mut report = PollReport::default();

        for handle in self.watchers() {
            report.polled += 1;
            match self.poll_watcher(&handle) {
                Ok(delivered) => report.delivered += delivered,
                Err(e) => {
                    warn!(watcher = %handle.id, error = %e, "Watcher scan failed");
                    report.failures.push(e);
                }
            }
        }

        debug!(
            polled = report.polled,
            delivered = report.delivered,
            failures = report.failures.len(),
            "Poll cycle complete"
        );
        report
    }

    /// Starts live listening on every watcher.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return;
        }
        for handle in self.watchers() {
            self.listen_watcher(&handle);
        }
        info!("Sources started");
    }

    /// Stops live listening on every watcher.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        for handle in self.watchers() {
            handle.watcher.stop_listener();
        }
        info!("Sources stopped");
    }

    /// Returns `true` between [`start`](Self::start) and
    /// [`stop`](Self::stop).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    fn poll_watcher(&self, handle: &WatcherHandle) -> Result<usize, SourcesError> {
        let changes = handle
            .watcher
            .poll_once()
            .map_err(|e| SourcesError::watcher(handle.id, e))?;
        Ok(router::handle_batch(&self.inner, handle.id, changes))
    }

    fn listen_watcher(&self, handle: &WatcherHandle) {
        let weak: Weak<SourcesInner> = Arc::downgrade(&self.inner);
        let id = handle.id;
        let sink: ChangeSink = Arc::new(move |changes: ChangeSet| {
            if let Some(inner) = weak.upgrade() {
                router::handle_batch(&inner, id, changes);
            }
        });

        if let Err(e) = handle.watcher.listen(sink) {
            warn!(watcher = %id, error = %e, "Live listening unavailable, polling only");
        }
    }

    // -------------------------------------------------------------------
    // Callbacks and ignores
    // -------------------------------------------------------------------

    /// Subscribes to routed changes. Callbacks fire in registration order.
    pub fn on_change<F>(&self, interest: impl Into<Interest>, handler: F)
    where
        F: Fn(&[SourceFile], &[SourceFile]) + Send + Sync + 'static,
    {
        let handler: ChangeHandler = Arc::new(handler);
        self.inner.callbacks.write().push(CallbackDescriptor {
            interest: interest.into(),
            handler,
        });
    }

    /// Subscribes to removals only.
    pub fn on_delete<F>(&self, interest: impl Into<Interest>, handler: F)
    where
        F: Fn(&[SourceFile]) + Send + Sync + 'static,
    {
        self.on_change(interest, move |_updated, removed| {
            if !removed.is_empty() {
                handler(removed);
            }
        });
    }

    /// Calls `handler` with the relative path of every updated page source,
    /// optionally limited to paths `matcher` accepts.
    pub fn changed<F>(&self, matcher: Option<PathMatcher>, handler: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.on_change(SourceType::Source, move |updated, _removed| {
            each_matching(updated, matcher.as_ref(), &handler);
        });
    }

    /// Calls `handler` with the relative path of every removed page source,
    /// optionally limited to paths `matcher` accepts.
    pub fn deleted<F>(&self, matcher: Option<PathMatcher>, handler: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.on_change(SourceType::Source, move |_updated, removed| {
            each_matching(removed, matcher.as_ref(), &handler);
        });
    }

    /// Adds or replaces the global ignore called `name`.
    ///
    /// Ignored files disappear from [`files`](Self::files) and
    /// [`find`](Self::find) and their updates are no longer delivered.
    pub fn ignore(&self, name: impl Into<String>, interest: impl Into<Interest>, rule: impl Into<IgnoreRule>) {
        let ignore = GlobalIgnore {
            name: name.into(),
            interest: interest.into(),
            rule: rule.into(),
        };
        debug!(name = %ignore.name, interest = %ignore.interest, "Global ignore added");
        {
            let mut ignores = self.inner.ignores.write();
            ignores.retain(|existing| existing.name != ignore.name);
            ignores.push(ignore);
        }
        self.inner.bump();

        if self.is_running() {
            self.poll_all();
        }
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sources")
            .field("watchers", &self.inner.registry.read().sorted().len())
            .field("callbacks", &self.inner.callbacks.read().len())
            .field("running", &self.is_running())
            .field("update_count", &self.update_count())
            .finish()
    }
}

fn each_matching<F>(files: &[SourceFile], matcher: Option<&PathMatcher>, handler: &F)
where
    F: Fn(&Utf8Path),
{
    files
        .iter()
        .map(SourceFile::relative_path)
        .filter(|path| matcher.is_none_or(|m| m.is_match(path.as_str())))
        .for_each(handler);
}

fn validate_options(options: &WatcherOptions) -> Result<(), SourcesError> {
    if options.path.as_str().is_empty() {
        return Err(SourcesError::invalid_options("watch path is empty"));
    }
    if options
        .destination_dir
        .as_ref()
        .is_some_and(|dir| dir.is_absolute())
    {
        return Err(SourcesError::invalid_options(
            "destination dir must be relative",
        ));
    }
    Ok(())
}
