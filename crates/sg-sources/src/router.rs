//! Ownership-aware change routing.
//!
//! Every change set a watcher produces passes through [`handle_batch`]
//! before subscribers see it:
//!
//! 1. An update is kept only if the reporting watcher owns the path.
//! 2. A removal is kept only if no watcher owns the path any more.
//! 3. If the reporting watcher *was* the owner and a lower-ranked watcher
//!    still has the path, the removal becomes an update carrying the
//!    surviving copy, so the path never looks absent.
//! 4. An empty result is dropped without bumping the mutation counter.
//!
//! Batches are serialized by the registry's dispatch lock. The ownership
//! filter runs under the registry read lock; callbacks run after it is
//! released, on a snapshot of the callback list.

use rustc_hash::FxHashSet;
use sg_core::SourceFile;
use sg_watcher::ChangeSet;
use tracing::{debug, trace};

use crate::registry::{SourcesInner, WatcherId};

/// Filters one watcher's change set by ownership and dispatches it.
///
/// Returns the number of files delivered.
pub(crate) fn handle_batch(inner: &SourcesInner, source: WatcherId, changes: ChangeSet) -> usize {
    if changes.is_empty() {
        return 0;
    }

    let _dispatch = inner.dispatch.lock();

    let (updated, removed) = {
        let registry = inner.registry.read();
        let Some(source_rank) = registry.rank(source) else {
            trace!(watcher = %source, "Dropping batch from unregistered watcher");
            return 0;
        };

        let mut updated: Vec<SourceFile> = changes
            .updated
            .into_iter()
            .filter(|file| {
                registry
                    .owner(file.types(), file.relative_path().as_str())
                    .is_some_and(|owner| owner.id() == source)
            })
            .collect();

        let mut removed = Vec::new();
        for file in changes.removed {
            let path = file.relative_path().as_str();
            match registry.owner(file.types(), path) {
                None => removed.push(file),
                Some(owner) => {
                    let outranked = registry
                        .rank(owner.id())
                        .is_some_and(|rank| rank > source_rank);
                    if !outranked {
                        trace!(watcher = %source, path, "Shadowed removal suppressed");
                        continue;
                    }
                    if let Some(surviving) = owner.watcher().find(path, false) {
                        debug!(
                            path,
                            from = %source,
                            to = %owner.id(),
                            "Ownership transferred on removal"
                        );
                        updated.push(surviving);
                    }
                }
            }
        }

        updated.retain(|file| !inner.globally_ignored(file));
        dedup_by_path(&mut updated);
        (updated, removed)
    };

    if updated.is_empty() && removed.is_empty() {
        return 0;
    }

    inner.bump();
    let callbacks = inner.callbacks.read().clone();

    debug!(
        watcher = %source,
        updated = updated.len(),
        removed = removed.len(),
        callbacks = callbacks.len(),
        "Routing changes"
    );

    for callback in &callbacks {
        callback.dispatch(&updated, &removed);
    }

    updated.len() + removed.len()
}

/// Keeps the first file for each relative path.
fn dedup_by_path(files: &mut Vec<SourceFile>) {
    let mut seen = FxHashSet::default();
    files.retain(|file| seen.insert(file.relative_path().to_owned()));
}
