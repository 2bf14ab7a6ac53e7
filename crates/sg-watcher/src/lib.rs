//! Source watchers for the sg-site pipeline.
//!
//! A watcher tracks one typed collection of files (page sources, data,
//! locales) and reports what changed, either on demand through polling or
//! continuously through OS notifications.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ SourceWatcher                                             │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐   │
//! │  │ FileWalker │──►│ FileFilter │──►│ snapshot + stamps│   │
//! │  │ (ignore)   │   │            │   │ (diff → ChangeSet)│  │
//! │  └────────────┘   └────────────┘   └──────────────────┘   │
//! │  ┌──────────────────────────┐            ▲                │
//! │  │ notify-debouncer-mini    │────────────┘                │
//! │  └──────────────────────────┘                             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! All watchers implement [`Watcher`]; the registry in `sg-sources` works
//! with `Arc<dyn Watcher>` only.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod memory;
pub mod source_watcher;
pub mod walker;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeSet, ChangeSetStats, ChangeSink};
pub use filter::{CompositeFilter, FileFilter, IgnorePatternFilter};
pub use memory::MemoryWatcher;
pub use source_watcher::SourceWatcher;
pub use walker::FileWalker;
pub use watcher::{Watcher, WatcherOptions};
