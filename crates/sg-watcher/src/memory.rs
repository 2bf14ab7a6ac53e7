//! A watcher whose files are supplied programmatically.
//!
//! Useful for extensions that generate sources, and for exercising the
//! registry without touching the disk.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use sg_core::{strip_leading_slash, SourceFile, SourceType, DEFAULT_PRIORITY};

use crate::error::WatchError;
use crate::events::{ChangeSet, ChangeSink};
use crate::watcher::{find_in, Watcher};

/// An in-memory [`Watcher`].
///
/// Mutations are queued until the next [`poll_once`](Watcher::poll_once),
/// or delivered to the sink right away while listening.
///
/// # Examples
///
/// ```
/// use sg_core::SourceType;
/// use sg_watcher::{MemoryWatcher, Watcher};
///
/// let watcher = MemoryWatcher::new(SourceType::Source).with_priority(100);
/// watcher.insert("index.html.erb", "/virtual/index.html.erb");
///
/// let changes = watcher.poll_once()?;
/// assert_eq!(changes.updated.len(), 1);
/// assert!(watcher.exists("index.html.erb"));
/// # Ok::<(), sg_watcher::WatchError>(())
/// ```
pub struct MemoryWatcher {
    source_type: SourceType,
    priority: i32,
    root: Option<Utf8PathBuf>,
    files: RwLock<FxHashMap<Utf8PathBuf, SourceFile>>,
    pending: Mutex<ChangeSet>,
    sink: Mutex<Option<ChangeSink>>,
}

impl MemoryWatcher {
    /// Creates an empty watcher with the default priority.
    #[must_use]
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            priority: DEFAULT_PRIORITY,
            root: None,
            files: RwLock::new(FxHashMap::default()),
            pending: Mutex::new(ChangeSet::new()),
            sink: Mutex::new(None),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the directory this watcher claims to back.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&self, relative_path: &str, full_path: impl Into<Utf8PathBuf>) {
        let rel = Utf8PathBuf::from(strip_leading_slash(relative_path));
        let file = SourceFile::new(rel.clone(), full_path, self.source_type.clone());
        self.files.write().insert(rel, file.clone());
        self.deliver(ChangeSet::from_parts(vec![file], Vec::new()));
    }

    /// Removes a file. Returns `false` if it wasn't tracked.
    pub fn remove(&self, relative_path: &str) -> bool {
        let rel = Utf8Path::new(strip_leading_slash(relative_path));
        let Some(file) = self.files.write().remove(rel) else {
            return false;
        };
        self.deliver(ChangeSet::from_parts(Vec::new(), vec![file]));
        true
    }

    fn deliver(&self, changes: ChangeSet) {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink(changes),
            None => self.pending.lock().extend(changes),
        }
    }
}

impl Watcher for MemoryWatcher {
    fn source_type(&self) -> &SourceType {
        &self.source_type
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn root(&self) -> Option<&Utf8Path> {
        self.root.as_deref()
    }

    fn files(&self) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = self.files.read().values().cloned().collect();
        files.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
        files
    }

    fn find(&self, path: &str, glob: bool) -> Option<SourceFile> {
        find_in(&self.files(), path, glob)
    }

    fn exists(&self, path: &str) -> bool {
        self.files
            .read()
            .contains_key(Utf8Path::new(strip_leading_slash(path)))
    }

    fn poll_once(&self) -> Result<ChangeSet, WatchError> {
        Ok(std::mem::take(&mut *self.pending.lock()))
    }

    fn listen(&self, sink: ChangeSink) -> Result<(), WatchError> {
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop_listener(&self) {
        self.sink.lock().take();
    }

    fn is_listening(&self) -> bool {
        self.sink.lock().is_some()
    }
}

impl std::fmt::Debug for MemoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryWatcher")
            .field("source_type", &self.source_type)
            .field("priority", &self.priority)
            .field("files", &self.files.read().len())
            .finish_non_exhaustive()
    }
}
