//! Path resolution, the sitemap index, and route overrides.
//!
//! ```text
//!   Sources ──on_change(source)──► SitemapIndex ◄── RouteOverrides
//!                                      │   ▲           (ignore, reroute,
//!                                      │   │            page)
//!                                      │   └── PathResolver
//!                                      ▼
//!                                  resources() ──► manipulate_resource_list
//! ```
//!
//! - [`PathResolver`] maps files under the source root to logical paths.
//! - [`SitemapIndex`] holds one [`PathEntry`](sg_core::PathEntry) per
//!   logical path and keeps it current as files come and go.
//! - [`RouteOverrides`] records ignores, proxies, and page metadata.
//!   Overrides declared before setup are replayed when it completes.
//! - [`SiteSession`] wires all of it to a [`Sources`](sg_sources::Sources)
//!   registry for one configured site.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod extensions;
pub mod index;
pub mod overrides;
pub mod resolver;
pub mod resource;
pub mod session;

pub use error::SitemapError;
pub use extensions::{RenderableExtensions, TemplateExtensions, DEFAULT_TEMPLATE_EXTENSIONS};
pub use index::{ApplySummary, OverrideCommand, SetupReport, SitemapIndex};
pub use overrides::{LayoutChoice, PageConfig, PageOptions, RouteOverrides};
pub use resolver::{PathResolver, DEFAULT_LAYOUTS_DIR, DEFAULT_LAYOUT_NAME};
pub use resource::{PageMetadata, Resource};
pub use session::SiteSession;
