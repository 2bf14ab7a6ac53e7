//! The default directory-backed watcher.
//!
//! [`SourceWatcher`] keeps a snapshot of every file below its root, keyed by
//! relative path and stamped with modification time and length. Change
//! detection works two ways:
//!
//! ```text
//!   poll_once()                       listen(sink)
//!       │                                  │
//!       ▼                                  ▼
//!   full walk (FileWalker)           notify-debouncer-mini batch
//!       │                                  │
//!       ▼                                  ▼
//!   diff against snapshot            re-stat reported paths
//!       │                                  │
//!       └──────────► ChangeSet ◄───────────┘
//! ```
//!
//! Both paths serialize on a scan lock, so a notify batch never interleaves
//! with a full poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use sg_core::{absolute_path, SourceFile, SourceType};
use tracing::{debug, info, trace, warn};

use crate::error::WatchError;
use crate::events::{ChangeSet, ChangeSetStats, ChangeSink};
use crate::walker::FileWalker;
use crate::watcher::{find_in, Watcher, WatcherOptions};

/// What a file looked like when it was last seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn read(path: &Utf8Path) -> Result<Self, WatchError> {
        let meta = path.metadata().map_err(|e| WatchError::stat(path, e))?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    file: SourceFile,
    stamp: FileStamp,
}

type Snapshot = FxHashMap<Utf8PathBuf, Tracked>;

/// State shared with the notify callback.
struct Inner {
    options: WatcherOptions,
    snapshot: RwLock<Snapshot>,
    /// Held for the whole of a poll or a notify batch.
    scan_lock: Mutex<()>,
    /// Cancellation flag of the poll in progress, if any.
    current_scan: Mutex<Option<Arc<AtomicBool>>>,
    /// Root as reported by the OS, which may differ from the configured one
    /// through symlinks.
    canonical_root: RwLock<Option<Utf8PathBuf>>,
}

/// Watches one directory and reports its files under one [`SourceType`].
///
/// A missing root is not an error: the watcher simply tracks nothing until
/// the directory appears. A relative root is made absolute against the
/// current directory when the watcher is created.
///
/// # Examples
///
/// ```no_run
/// use sg_core::SourceType;
/// use sg_watcher::{SourceWatcher, Watcher, WatcherOptions};
///
/// let watcher = SourceWatcher::new(WatcherOptions::new(SourceType::Source, "site/source"));
/// let changes = watcher.poll_once()?;
/// for file in &changes.updated {
///     println!("{}", file.relative_path());
/// }
/// # Ok::<(), sg_watcher::WatchError>(())
/// ```
pub struct SourceWatcher {
    inner: Arc<Inner>,
    listener: Mutex<Option<Debouncer<notify::RecommendedWatcher>>>,
}

impl SourceWatcher {
    /// Creates a watcher. Nothing is scanned until the first poll.
    #[must_use]
    pub fn new(mut options: WatcherOptions) -> Self {
        options.path = absolute_path(&options.path);
        let canonical_root = options.path.canonicalize_utf8().ok();
        Self {
            inner: Arc::new(Inner {
                options,
                snapshot: RwLock::new(FxHashMap::default()),
                scan_lock: Mutex::new(()),
                current_scan: Mutex::new(None),
                canonical_root: RwLock::new(canonical_root),
            }),
            listener: Mutex::new(None),
        }
    }

    /// The options this watcher was built with.
    #[must_use]
    pub fn options(&self) -> &WatcherOptions {
        &self.inner.options
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.snapshot.read().len()
    }

    /// Returns `true` if no files are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.snapshot.read().is_empty()
    }
}

impl Inner {
    /// Maps an absolute path to `(root-relative, reported)` paths.
    fn relative_paths(&self, full: &Utf8Path) -> Option<(Utf8PathBuf, Utf8PathBuf)> {
        let rel = match full.strip_prefix(&self.options.path) {
            Ok(rel) => rel.to_owned(),
            Err(_) => {
                let canonical = self.canonical_root.read();
                full.strip_prefix(canonical.as_deref()?).ok()?.to_owned()
            }
        };
        let reported = self.reported(&rel);
        Some((rel, reported))
    }

    fn reported(&self, rel: &Utf8Path) -> Utf8PathBuf {
        match &self.options.destination_dir {
            Some(prefix) => prefix.join(rel),
            None => rel.to_owned(),
        }
    }

    /// Stats a file under the root. The full path is always rebuilt from
    /// the configured root, whatever form the OS reported it in.
    fn tracked(&self, rel: &Utf8Path, reported: Utf8PathBuf) -> Option<Tracked> {
        if !self.options.filter.should_process(rel) {
            trace!(path = %rel, "Filtered out");
            return None;
        }
        let full = self.options.path.join(rel);
        match FileStamp::read(&full) {
            Ok(stamp) => Some(Tracked {
                file: SourceFile::new(reported, full, self.options.source_type.clone()),
                stamp,
            }),
            Err(e) => {
                warn!(path = %full, error = %e, "Skipping file that could not be stat'ed");
                None
            }
        }
    }

    fn walker(&self, dir: &Utf8Path) -> Result<FileWalker, WatchError> {
        Ok(FileWalker::new(dir)?.with_follow_links(self.options.watch.follow_links))
    }

    /// Walks the root and builds a fresh snapshot without committing it.
    fn scan(&self, cancel: &Arc<AtomicBool>) -> Result<Snapshot, WatchError> {
        let root = &self.options.path;
        let mut fresh = Snapshot::default();

        if !root.is_dir() {
            debug!(root = %root, "Watcher root missing, tracking nothing");
            return Ok(fresh);
        }

        let paths = self
            .walker(root)?
            .with_cancel_flag(Arc::clone(cancel))
            .collect_paths()?;

        for full in paths {
            let Some((rel, reported)) = self.relative_paths(&full) else {
                continue;
            };
            if let Some(tracked) = self.tracked(&rel, reported.clone()) {
                fresh.insert(reported, tracked);
            }
        }

        if cancel.load(Ordering::Acquire) {
            return Err(WatchError::Cancelled);
        }

        Ok(fresh)
    }

    /// Replaces the snapshot and reports the difference.
    fn commit(&self, fresh: Snapshot) -> ChangeSet {
        let mut snapshot = self.snapshot.write();
        let mut changes = ChangeSet::new();

        for (path, tracked) in &fresh {
            match snapshot.get(path) {
                Some(old) if old.stamp == tracked.stamp => {}
                _ => changes.updated.push(tracked.file.clone()),
            }
        }
        for (path, old) in snapshot.iter() {
            if !fresh.contains_key(path) {
                changes.removed.push(old.file.clone());
            }
        }

        *snapshot = fresh;
        drop(snapshot);

        sort_changes(&mut changes);
        changes
    }

    /// Applies one debounced batch of notify paths to the snapshot.
    fn apply_event_paths(&self, paths: Vec<Utf8PathBuf>) -> ChangeSet {
        let _scan = self.scan_lock.lock();
        let mut snapshot = self.snapshot.write();
        let mut changes = ChangeSet::new();

        for path in paths {
            let Some((rel, reported)) = self.relative_paths(&path) else {
                trace!(path = %path, "Event outside watcher root");
                continue;
            };

            if path.is_dir() {
                match self.walker(&path).and_then(|w| w.collect_paths()) {
                    Ok(files) => {
                        for full in files {
                            self.refresh(&mut snapshot, &full, &mut changes);
                        }
                    }
                    Err(e) => warn!(path = %path, error = %e, "Failed to rescan directory"),
                }
            } else if path.is_file() {
                self.refresh(&mut snapshot, &path, &mut changes);
            } else {
                // Gone: the file itself, or everything below a deleted directory
                let gone: Vec<Utf8PathBuf> = snapshot
                    .keys()
                    .filter(|key| key.starts_with(&reported))
                    .cloned()
                    .collect();
                for key in gone {
                    if let Some(old) = snapshot.remove(&key) {
                        changes.removed.push(old.file);
                    }
                }
                trace!(path = %rel, "Path removed");
            }
        }
        drop(snapshot);

        sort_changes(&mut changes);
        changes
    }

    fn refresh(&self, snapshot: &mut Snapshot, full: &Utf8Path, changes: &mut ChangeSet) {
        let Some((rel, reported)) = self.relative_paths(full) else {
            return;
        };
        match self.tracked(&rel, reported.clone()) {
            Some(tracked) => {
                let unchanged = snapshot
                    .get(&reported)
                    .is_some_and(|old| old.stamp == tracked.stamp);
                if !unchanged {
                    changes.updated.push(tracked.file.clone());
                    snapshot.insert(reported, tracked);
                }
            }
            None => {
                if let Some(old) = snapshot.remove(&reported) {
                    changes.removed.push(old.file);
                }
            }
        }
    }
}

fn sort_changes(changes: &mut ChangeSet) {
    changes
        .updated
        .sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
    changes
        .removed
        .sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
}

/// Converts a debounced notify batch and applies it.
fn on_debounced(inner: &Weak<Inner>, sink: &ChangeSink, res: DebounceEventResult) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let events = match res {
        Ok(events) => events,
        Err(error) => {
            warn!(root = %inner.options.path, error = %error, "Debouncer error");
            return;
        }
    };

    let paths: Vec<Utf8PathBuf> = events
        .into_iter()
        .filter_map(|event| match Utf8PathBuf::try_from(event.path) {
            Ok(path) => Some(path),
            Err(e) => {
                let invalid = e.into_path_buf();
                warn!(path = %invalid.display(), "Skipping non-UTF-8 path in file event");
                None
            }
        })
        .collect();

    let changes = inner.apply_event_paths(paths);
    if !changes.is_empty() {
        let stats = ChangeSetStats::from_changes(&changes);
        debug!(
            root = %inner.options.path,
            updated = stats.updated,
            removed = stats.removed,
            files = stats.unique_files,
            "Detected changes"
        );
        sink(changes);
    }
}

impl Watcher for SourceWatcher {
    fn source_type(&self) -> &SourceType {
        &self.inner.options.source_type
    }

    fn priority(&self) -> i32 {
        self.inner.options.priority
    }

    fn root(&self) -> Option<&Utf8Path> {
        Some(&self.inner.options.path)
    }

    fn files(&self) -> Vec<SourceFile> {
        let mut files: Vec<SourceFile> = self
            .inner
            .snapshot
            .read()
            .values()
            .map(|t| t.file.clone())
            .collect();
        files.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
        files
    }

    fn find(&self, path: &str, glob: bool) -> Option<SourceFile> {
        if glob {
            return find_in(&self.files(), path, true);
        }
        let key = Utf8Path::new(sg_core::strip_leading_slash(path));
        self.inner.snapshot.read().get(key).map(|t| t.file.clone())
    }

    fn exists(&self, path: &str) -> bool {
        let key = Utf8Path::new(sg_core::strip_leading_slash(path));
        self.inner.snapshot.read().contains_key(key)
    }

    fn poll_once(&self) -> Result<ChangeSet, WatchError> {
        let inner = &self.inner;
        let _scan = inner.scan_lock.lock();

        let cancel = Arc::new(AtomicBool::new(false));
        *inner.current_scan.lock() = Some(Arc::clone(&cancel));
        let scanned = inner.scan(&cancel);
        *inner.current_scan.lock() = None;

        let fresh = match scanned {
            Ok(fresh) => fresh,
            Err(WatchError::Cancelled) => {
                debug!(root = %inner.options.path, "Poll cancelled, snapshot kept");
                return Ok(ChangeSet::new());
            }
            Err(e) => return Err(e),
        };

        let changes = inner.commit(fresh);
        let stats = ChangeSetStats::from_changes(&changes);
        debug!(
            source_type = %inner.options.source_type,
            updated = stats.updated,
            removed = stats.removed,
            files = stats.unique_files,
            "Poll complete"
        );
        Ok(changes)
    }

    fn listen(&self, sink: ChangeSink) -> Result<(), WatchError> {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return Ok(());
        }

        let root = self.inner.options.path.clone();
        if !root.is_dir() {
            return Err(WatchError::path_not_found(root));
        }
        *self.inner.canonical_root.write() = root.canonicalize_utf8().ok();

        let watch = &self.inner.options.watch;
        let timeout = Duration::from_millis(watch.debounce_ms);
        let weak = Arc::downgrade(&self.inner);

        let mut debouncer = new_debouncer(timeout, move |res: DebounceEventResult| {
            on_debounced(&weak, &sink, res);
        })?;

        let mode = if watch.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(root.as_std_path(), mode)?;

        info!(path = %root, recursive = watch.recursive, "File watcher started");
        *listener = Some(debouncer);
        Ok(())
    }

    fn stop_listener(&self) {
        if let Some(cancel) = self.inner.current_scan.lock().as_ref() {
            cancel.store(true, Ordering::Release);
        }
        if self.listener.lock().take().is_some() {
            info!(path = %self.inner.options.path, "File watcher stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.listener.lock().is_some()
    }
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher")
            .field("options", &self.inner.options)
            .field("files", &self.len())
            .field("listening", &self.is_listening())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(dir.path())
            .expect("temp dir should be UTF-8")
            .to_owned()
    }

    fn watcher_for(root: &Utf8Path) -> SourceWatcher {
        SourceWatcher::new(WatcherOptions::new(SourceType::Source, root))
    }

    fn rel_paths(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path().as_str()).collect()
    }

    #[test]
    fn test_poll_reports_added_modified_removed() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::write(root.join("index.html.erb"), "a").unwrap();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/post.md"), "a").unwrap();

        let watcher = watcher_for(&root);
        let first = watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&first.updated), vec!["blog/post.md", "index.html.erb"]);
        assert!(first.removed.is_empty());

        fs::write(root.join("index.html.erb"), "changed contents").unwrap();
        fs::remove_file(root.join("blog/post.md")).unwrap();

        let second = watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&second.updated), vec!["index.html.erb"]);
        assert_eq!(rel_paths(&second.removed), vec!["blog/post.md"]);
    }

    #[test]
    fn test_unchanged_poll_is_empty() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::write(root.join("a.html"), "a").unwrap();

        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();
        assert!(watcher.poll_once().unwrap().is_empty());
        assert_eq!(watcher.len(), 1);
    }

    #[test]
    fn test_missing_root_tracks_nothing() {
        let watcher = watcher_for(Utf8Path::new("/nonexistent/sg-source-watcher"));
        assert!(watcher.poll_once().unwrap().is_empty());
        assert!(watcher.is_empty());
    }

    #[test]
    fn test_root_deleted_removes_everything() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir).join("source");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.html"), "").unwrap();

        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();
        fs::remove_dir_all(&root).unwrap();

        let changes = watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&changes.removed), vec!["a.html"]);
        assert!(watcher.is_empty());
    }

    #[test]
    fn test_destination_dir_and_type() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::write(root.join("people.yml"), "").unwrap();

        let watcher = SourceWatcher::new(
            WatcherOptions::new(SourceType::Data, &root).with_destination_dir("shared"),
        );
        watcher.poll_once().unwrap();

        let file = watcher.find("shared/people.yml", false).unwrap();
        assert!(file.has_type(&SourceType::Data));
        assert_eq!(file.full_path(), root.join("people.yml"));
        assert!(watcher.exists("/shared/people.yml"));
        assert!(!watcher.exists("people.yml"));
    }

    #[test]
    fn test_noise_is_filtered() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();
        fs::write(root.join("_partial.erb"), "").unwrap();
        fs::write(root.join("page.html~"), "").unwrap();

        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&watcher.files()), vec!["_partial.erb"]);
    }

    #[test]
    fn test_find_glob() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/b.md"), "").unwrap();
        fs::write(root.join("blog/a.md"), "").unwrap();

        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();
        let found = watcher.find("blog/*.md", true).unwrap();
        assert_eq!(found.relative_path().as_str(), "blog/a.md");
    }

    #[test]
    fn test_event_batch_directory_delete() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::create_dir_all(root.join("blog/2024")).unwrap();
        fs::write(root.join("blog/2024/a.md"), "").unwrap();
        fs::write(root.join("blog/b.md"), "").unwrap();
        fs::write(root.join("blogroll.html"), "").unwrap();

        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();

        fs::remove_dir_all(root.join("blog")).unwrap();
        let changes = watcher.inner.apply_event_paths(vec![root.join("blog")]);
        assert_eq!(rel_paths(&changes.removed), vec!["blog/2024/a.md", "blog/b.md"]);
        assert_eq!(rel_paths(&watcher.files()), vec!["blogroll.html"]);
    }

    #[test]
    fn test_event_batch_new_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();

        fs::write(root.join("a.html"), "").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/x.md"), "").unwrap();

        let changes = watcher
            .inner
            .apply_event_paths(vec![root.join("a.html"), root.join("docs"), root.join("docs/x.md")]);
        assert_eq!(rel_paths(&changes.updated), vec!["a.html", "docs/x.md"]);
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn test_relative_root_reports_absolute_paths() {
        let dir = tempfile::Builder::new()
            .prefix("sg-relative-root")
            .tempdir_in(".")
            .unwrap();
        let name = dir.path().file_name().unwrap().to_str().unwrap();
        fs::write(dir.path().join("index.html.erb"), "a").unwrap();

        let watcher = watcher_for(&Utf8Path::new(".").join(name));
        let root = watcher.root().unwrap().to_owned();
        assert!(root.is_absolute());

        let first = watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&first.updated), vec!["index.html.erb"]);
        assert_eq!(first.updated[0].full_path(), root.join("index.html.erb"));

        // notify reports canonical absolute paths, never the configured form
        let canonical = Utf8PathBuf::from_path_buf(dir.path().canonicalize().unwrap()).unwrap();
        fs::write(canonical.join("about.html.md"), "b").unwrap();
        fs::remove_file(canonical.join("index.html.erb")).unwrap();

        let changes = watcher.inner.apply_event_paths(vec![
            canonical.join("about.html.md"),
            canonical.join("index.html.erb"),
        ]);
        assert_eq!(rel_paths(&changes.updated), vec!["about.html.md"]);
        assert_eq!(rel_paths(&changes.removed), vec!["index.html.erb"]);
        assert_eq!(changes.updated[0].full_path(), root.join("about.html.md"));
        assert_eq!(rel_paths(&watcher.files()), vec!["about.html.md"]);
    }

    #[test]
    fn test_unstatable_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        let watcher = watcher_for(&root);

        assert!(watcher.inner.tracked(Utf8Path::new("gone.html"), "gone.html".into()).is_none());
        fs::write(root.join("here.html"), "").unwrap();
        let tracked = watcher.inner.tracked(Utf8Path::new("here.html"), "here.html".into());
        assert_eq!(tracked.unwrap().file.full_path(), root.join("here.html"));
    }

    #[cfg(unix)]
    #[test]
    fn test_follow_links_reaches_walker() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir).join("source");
        let shared = utf8_root(&dir).join("shared");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("nav.html"), "").unwrap();
        std::os::unix::fs::symlink(&shared, root.join("linked")).unwrap();

        let plain = watcher_for(&root);
        plain.poll_once().unwrap();
        assert!(!plain.exists("linked/nav.html"));

        let watch = sg_core::WatchConfig {
            follow_links: true,
            ..sg_core::WatchConfig::default()
        };
        let following = SourceWatcher::new(
            WatcherOptions::new(SourceType::Source, &root).with_watch_config(watch),
        );
        following.poll_once().unwrap();
        assert!(following.exists("linked/nav.html"));
    }

    /// Stops its watcher the first time it is asked about a path, the way a
    /// shutdown racing a scan would.
    struct StopDuringScan {
        watcher: Arc<std::sync::OnceLock<Weak<SourceWatcher>>>,
        armed: Arc<AtomicBool>,
    }

    impl crate::filter::FileFilter for StopDuringScan {
        fn should_process(&self, _path: &Utf8Path) -> bool {
            if self.armed.swap(false, Ordering::AcqRel) {
                if let Some(watcher) = self.watcher.get().and_then(Weak::upgrade) {
                    watcher.stop_listener();
                }
            }
            true
        }
    }

    #[test]
    fn test_stopped_poll_is_empty_and_keeps_snapshot() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        fs::write(root.join("a.html"), "a").unwrap();

        let handle = Arc::new(std::sync::OnceLock::new());
        let armed = Arc::new(AtomicBool::new(false));
        let options = WatcherOptions::new(SourceType::Source, &root).with_filter(StopDuringScan {
            watcher: Arc::clone(&handle),
            armed: Arc::clone(&armed),
        });
        let watcher = Arc::new(SourceWatcher::new(options));
        handle.set(Arc::downgrade(&watcher)).unwrap();

        watcher.poll_once().unwrap();
        fs::write(root.join("a.html"), "changed").unwrap();
        fs::write(root.join("b.html"), "b").unwrap();

        armed.store(true, Ordering::Release);
        let cancelled = watcher.poll_once().unwrap();
        assert!(!armed.load(Ordering::Acquire));
        assert!(cancelled.is_empty());
        assert_eq!(rel_paths(&watcher.files()), vec!["a.html"]);
        assert!(watcher.inner.current_scan.lock().is_none());

        // The next poll sees everything the stopped one skipped
        let next = watcher.poll_once().unwrap();
        assert_eq!(rel_paths(&next.updated), vec!["a.html", "b.html"]);
        assert!(next.removed.is_empty());
    }

    #[test]
    fn test_listen_missing_root_fails() {
        let watcher = watcher_for(Utf8Path::new("/nonexistent/sg-listen-root"));
        let sink: ChangeSink = Arc::new(|_| {});
        assert!(matches!(watcher.listen(sink), Err(WatchError::PathNotFound(_))));
        assert!(!watcher.is_listening());
    }

    #[test]
    fn test_stop_listener_without_listen() {
        let watcher = watcher_for(Utf8Path::new("/nonexistent/sg-stop"));
        watcher.stop_listener();
        assert!(!watcher.is_listening());
    }

    #[tokio::test]
    async fn test_listen_delivers_changes() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        let watcher = watcher_for(&root);
        watcher.poll_once().unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink: ChangeSink = Arc::new(move |changes| {
            let _ = tx.send(changes);
        });
        watcher.listen(sink).unwrap();
        assert!(watcher.is_listening());

        // Give the backend a moment to register
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(root.join("new.html"), "hello").unwrap();

        let changes = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for change")
            .expect("sink dropped");
        assert_eq!(rel_paths(&changes.updated), vec!["new.html"]);
        assert!(watcher.exists("new.html"));

        watcher.stop_listener();
        assert!(!watcher.is_listening());
    }
}
