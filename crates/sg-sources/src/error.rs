//! Error types for the sg-sources crate.

use sg_watcher::WatchError;

use crate::registry::WatcherId;

/// Errors raised by the watcher registry.
///
/// Registration-time problems fail fast. Failures of an individual watcher
/// during a poll never abort the poll; they are collected into
/// [`PollReport::failures`](crate::PollReport::failures) instead.
#[derive(Debug, thiserror::Error)]
pub enum SourcesError {
    /// No watcher is registered under this id.
    #[error("unknown watcher: {0}")]
    UnknownWatcher(WatcherId),

    /// Watcher options were rejected at registration.
    #[error("invalid watcher options: {reason}")]
    InvalidOptions {
        /// What was wrong.
        reason: String,
    },

    /// A single watcher failed to scan or listen.
    #[error("watcher {watcher} failed: {source}")]
    Watcher {
        /// The failing watcher.
        watcher: WatcherId,
        /// The underlying watcher error.
        #[source]
        source: WatchError,
    },
}

impl SourcesError {
    /// Creates a new [`SourcesError::InvalidOptions`] error.
    #[inline]
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Creates a new [`SourcesError::Watcher`] error.
    #[inline]
    pub const fn watcher(watcher: WatcherId, source: WatchError) -> Self {
        Self::Watcher { watcher, source }
    }

    /// Returns `true` if the registry can keep going after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Watcher { .. } => true,
            Self::UnknownWatcher(_) | Self::InvalidOptions { .. } => false,
        }
    }

    /// Returns the watcher this error concerns, if any.
    #[must_use]
    pub const fn watcher_id(&self) -> Option<WatcherId> {
        match self {
            Self::UnknownWatcher(id) | Self::Watcher { watcher: id, .. } => Some(*id),
            Self::InvalidOptions { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_failure_is_recoverable() {
        let err = SourcesError::watcher(WatcherId::new(3), WatchError::Cancelled);
        assert!(err.is_recoverable());
        assert_eq!(err.watcher_id(), Some(WatcherId::new(3)));
        assert_eq!(err.to_string(), "watcher #3 failed: scan cancelled");
    }

    #[test]
    fn test_registration_errors_are_fatal() {
        let err = SourcesError::invalid_options("empty path");
        assert!(!err.is_recoverable());
        assert!(err.watcher_id().is_none());
        assert_eq!(err.to_string(), "invalid watcher options: empty path");

        let err = SourcesError::UnknownWatcher(WatcherId::new(7));
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "unknown watcher: #7");
    }
}
