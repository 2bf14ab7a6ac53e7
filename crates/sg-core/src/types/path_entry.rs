//! Sitemap classification of a logical path.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::strip_leading_slash;

/// What the sitemap knows about one logical path.
///
/// Exactly one entry exists per path; setting a path always replaces the
/// previous entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum PathEntry {
    /// Discovered by scanning; the path renders its own source file.
    Normal,
    /// Explicitly allowed with no further treatment.
    Generic,
    /// Explicitly excluded from the build.
    Ignored,
    /// Renders the resource at another logical path instead of its own.
    Proxy(String),
}

impl PathEntry {
    /// Returns the proxy target, if this entry is a proxy.
    #[must_use]
    pub fn proxy_target(&self) -> Option<&str> {
        match self {
            Self::Proxy(target) => Some(target),
            Self::Normal | Self::Generic | Self::Ignored => None,
        }
    }

    /// Returns `true` for [`PathEntry::Ignored`].
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Generic => f.write_str("generic"),
            Self::Ignored => f.write_str("ignored"),
            Self::Proxy(target) => write!(f, "proxy -> {target}"),
        }
    }
}

/// The value passed to a sitemap `set_path` call.
///
/// Mirrors the three shapes a path can be set to: allowed (`true`),
/// ignored (`false`), or proxied to another path (a string).
///
/// # Examples
///
/// ```
/// use sg_core::{PathEntry, PathTarget};
///
/// assert_eq!(PathTarget::from(true).into_entry(), PathEntry::Generic);
/// assert_eq!(PathTarget::from(false).into_entry(), PathEntry::Ignored);
/// assert_eq!(
///     PathTarget::from("/about.html").into_entry(),
///     PathEntry::Proxy("about.html".to_owned()),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// Allow the path as-is.
    Allow,
    /// Ignore the path.
    Ignore,
    /// Proxy the path to another logical path.
    Proxy(String),
}

impl PathTarget {
    /// Converts the target into the entry stored in the sitemap.
    ///
    /// Proxy targets are normalized by stripping a leading slash.
    #[must_use]
    pub fn into_entry(self) -> PathEntry {
        match self {
            Self::Allow => PathEntry::Generic,
            Self::Ignore => PathEntry::Ignored,
            Self::Proxy(target) => PathEntry::Proxy(strip_leading_slash(&target).to_owned()),
        }
    }
}

impl From<bool> for PathTarget {
    fn from(allow: bool) -> Self {
        if allow { Self::Allow } else { Self::Ignore }
    }
}

impl From<&str> for PathTarget {
    fn from(target: &str) -> Self {
        Self::Proxy(target.to_owned())
    }
}

impl From<String> for PathTarget {
    fn from(target: String) -> Self {
        Self::Proxy(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_target() {
        assert_eq!(PathEntry::Proxy("a.html".into()).proxy_target(), Some("a.html"));
        assert_eq!(PathEntry::Normal.proxy_target(), None);
        assert_eq!(PathEntry::Ignored.proxy_target(), None);
    }

    #[test]
    fn test_target_normalizes_proxy() {
        let entry = PathTarget::from(String::from("/team/index.html")).into_entry();
        assert_eq!(entry, PathEntry::Proxy("team/index.html".into()));
    }

    #[test]
    fn test_display() {
        assert_eq!(PathEntry::Normal.to_string(), "normal");
        assert_eq!(PathEntry::Proxy("x".into()).to_string(), "proxy -> x");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&PathEntry::Proxy("about.html".into())).unwrap();
        assert_eq!(json, r#"{"kind":"proxy","target":"about.html"}"#);
        let json = serde_json::to_string(&PathEntry::Ignored).unwrap();
        assert_eq!(json, r#"{"kind":"ignored"}"#);
    }
}
