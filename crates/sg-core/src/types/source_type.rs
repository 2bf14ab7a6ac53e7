//! Collection tags for tracked files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The collection a file belongs to.
///
/// A project is split into typed collections: `source` files build the
/// sitemap, `data` files hold structured data, `locales` hold translations,
/// and `reload` files trigger a full restart when they change. Extensions
/// may define their own collections with [`SourceType::Custom`].
///
/// # Examples
///
/// ```
/// use sg_core::SourceType;
///
/// let ty: SourceType = "data".parse().unwrap();
/// assert_eq!(ty, SourceType::Data);
/// assert_eq!(SourceType::Custom("assets".into()).to_string(), "assets");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceType {
    /// Page sources that make up the sitemap.
    Source,
    /// Structured data files.
    Data,
    /// Localization files.
    Locales,
    /// Files whose change requires a full reload.
    Reload,
    /// An extension-defined collection.
    Custom(String),
}

impl SourceType {
    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Source => "source",
            Self::Data => "data",
            Self::Locales => "locales",
            Self::Reload => "reload",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "source" => Self::Source,
            "data" => Self::Data,
            "locales" => Self::Locales,
            "reload" => Self::Reload,
            other => Self::Custom(other.to_owned()),
        })
    }
}

impl From<&str> for SourceType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

impl Serialize for SourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}
