//! Error types for the sg-sitemap crate.

use sg_core::{ConfigError, MatcherError};
use sg_sources::SourcesError;
use sg_watcher::WatchError;

/// Errors raised while building the sitemap or declaring overrides.
///
/// Path exclusions are not errors: the resolver returns `None` for them.
/// Dangling proxy targets are not errors either; they are recorded and can
/// be listed with [`SitemapIndex::dangling_proxies`](crate::SitemapIndex::dangling_proxies).
#[derive(Debug, thiserror::Error)]
pub enum SitemapError {
    /// `setup` was called on an index that is already set up.
    #[error("sitemap is already set up")]
    AlreadySetup,

    /// The initial scan was stopped before it finished.
    #[error("sitemap setup cancelled")]
    Cancelled,

    /// The initial scan failed.
    #[error("failed to scan source directory: {0}")]
    Scan(#[source] WatchError),

    /// A page or ignore pattern did not compile.
    #[error(transparent)]
    Matcher(#[from] MatcherError),

    /// A page declaration combines options that can't be honored.
    #[error("invalid page declaration '{pattern}': {reason}")]
    InvalidPage {
        /// The declared path or pattern.
        pattern: String,
        /// What was wrong.
        reason: String,
    },

    /// The site configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A watcher could not be registered.
    #[error(transparent)]
    Sources(#[from] SourcesError),
}

impl SitemapError {
    /// Creates a new [`SitemapError::InvalidPage`] error.
    #[inline]
    pub fn invalid_page(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPage {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the operation may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Scan(_))
    }
}

impl From<WatchError> for SitemapError {
    fn from(error: WatchError) -> Self {
        match error {
            WatchError::Cancelled => Self::Cancelled,
            other => Self::Scan(other),
        }
    }
}
