//! Path matchers for ignore rules and page declarations.
//!
//! A [`PathMatcher`] is compiled once, when the rule that owns it is
//! registered, and is then tested against many site paths. Three shapes are
//! supported:
//!
//! - **Exact**: the normalized path must be equal
//! - **Glob**: `fnmatch`-style, where `*` also crosses `/`
//! - **Regex**: an arbitrary regular expression, searched in the path
//!
//! Leading slashes never matter: both the pattern and the candidate are
//! normalized before comparison.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;

use crate::error::MatcherError;
use crate::types::strip_leading_slash;

/// Characters that turn a page path into a glob pattern.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A compiled matcher for site paths.
///
/// # Examples
///
/// ```
/// use sg_core::PathMatcher;
///
/// let exact = PathMatcher::parse("/about.html")?;
/// assert!(exact.is_match("about.html"));
///
/// let glob = PathMatcher::parse("/blog/*.html")?;
/// assert!(glob.is_match("blog/2024/first.html"));
/// assert!(!glob.is_match("about.html"));
///
/// let regex = PathMatcher::regex(r"^docs/.*\.html$")?;
/// assert!(regex.is_match("/docs/intro.html"));
/// # Ok::<(), sg_core::MatcherError>(())
/// ```
#[derive(Clone)]
pub enum PathMatcher {
    /// Matches one normalized path.
    Exact(String),
    /// Matches an `fnmatch`-style pattern.
    Glob {
        /// The normalized pattern, with a leading `/`.
        pattern: String,
        /// The compiled matcher.
        matcher: GlobMatcher,
    },
    /// Matches a regular expression anywhere in the normalized path.
    Regex(Regex),
}

impl PathMatcher {
    /// Builds an exact or glob matcher from a page path.
    ///
    /// The pattern is treated as a glob when it contains `*`, `?`, `[` or
    /// `{`; otherwise it must match exactly.
    pub fn parse(pattern: &str) -> Result<Self, MatcherError> {
        if Self::is_pattern(pattern) {
            Self::glob(pattern)
        } else {
            Ok(Self::exact(pattern))
        }
    }

    /// Builds an exact matcher.
    #[must_use]
    pub fn exact(path: &str) -> Self {
        Self::Exact(strip_leading_slash(path).to_owned())
    }

    /// Builds a glob matcher.
    pub fn glob(pattern: &str) -> Result<Self, MatcherError> {
        let normalized = format!("/{}", strip_leading_slash(pattern));
        let glob = GlobBuilder::new(&normalized)
            .literal_separator(false)
            .build()
            .map_err(|source| MatcherError::Glob {
                pattern: pattern.to_owned(),
                source,
            })?;

        Ok(Self::Glob {
            pattern: normalized,
            matcher: glob.compile_matcher(),
        })
    }

    /// Builds a regular-expression matcher.
    pub fn regex(pattern: &str) -> Result<Self, MatcherError> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|source| MatcherError::Regex {
                pattern: pattern.to_owned(),
                source,
            })
    }

    /// Returns `true` if `pattern` would be compiled as a glob.
    #[must_use]
    pub fn is_pattern(pattern: &str) -> bool {
        pattern.contains(GLOB_META)
    }

    /// Returns `true` if this matcher can only ever match one path.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// Tests a site path against the matcher.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        let path = strip_leading_slash(path);
        match self {
            Self::Exact(expected) => expected == path,
            Self::Glob { matcher, .. } => matcher.is_match(format!("/{path}")),
            Self::Regex(regex) => regex.is_match(path),
        }
    }
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => f.debug_tuple("Exact").field(path).finish(),
            Self::Glob { pattern, .. } => f.debug_tuple("Glob").field(pattern).finish(),
            Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => write!(f, "/{path}"),
            Self::Glob { pattern, .. } => f.write_str(pattern),
            Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}
