//! Watcher registry and change routing for the sg-site pipeline.
//!
//! [`Sources`] is the single entry point the rest of the pipeline uses to
//! learn about project files:
//!
//! ```text
//!   Watcher (priority 100) ─┐
//!   Watcher (priority 50)  ─┼─► Sources ──► router (ownership filter) ──► callbacks
//!   Watcher (priority 50)  ─┘      │
//!                                  └──► files() / find() / exists()
//! ```
//!
//! - Watchers are kept in priority order; the first one that has a path
//!   owns it.
//! - [`Sources::poll_all`] scans every watcher, isolating failures.
//! - Subscribers register with [`Sources::on_change`] and receive only the
//!   changes of the owning watcher.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod callbacks;
pub mod error;
pub mod registry;
mod router;

pub use callbacks::{CallbackDescriptor, ChangeHandler, IgnorePredicate, IgnoreRule, Interest};
pub use error::SourcesError;
pub use registry::{PollReport, Sources, WatchRequest, WatcherHandle, WatcherId};
