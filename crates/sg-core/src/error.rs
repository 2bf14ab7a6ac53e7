//! Error types for the sg-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading and
//! validation, and [`MatcherError`] for path matchers that fail to compile.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use sg_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// A path matcher could not be built from its pattern.
///
/// Matchers are compiled when an ignore rule or page declaration is
/// registered, so a malformed pattern surfaces at configuration time
/// rather than while a change batch is being routed.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// The glob pattern is malformed.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        /// The pattern as written by the caller.
        pattern: String,
        /// The underlying globset error.
        #[source]
        source: globset::Error,
    },

    /// The regular expression is malformed.
    #[error("invalid regular expression '{pattern}': {source}")]
    Regex {
        /// The pattern as written by the caller.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

impl MatcherError {
    /// Returns the pattern that failed to compile.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Glob { pattern, .. } | Self::Regex { pattern, .. } => pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "not under the project root".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("project root"));
    }

    #[test]
    fn test_missing_directory_display() {
        let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/missing/dir"));
        assert!(error.to_string().contains("/missing/dir"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("default_priority", "must be non-negative");
        let msg = error.to_string();
        assert!(msg.contains("default_priority"));
        assert!(msg.contains("non-negative"));
    }

    #[test]
    fn test_matcher_error_pattern() {
        let source = regex::Regex::new("(unclosed").err();
        let Some(source) = source else {
            panic!("pattern should not compile");
        };
        let error = MatcherError::Regex {
            pattern: "(unclosed".to_owned(),
            source,
        };
        assert_eq!(error.pattern(), "(unclosed");
        assert!(error.to_string().contains("invalid regular expression"));
    }
}
