//! Configuration structures for the sg-site pipeline.
//!
//! - [`SiteConfig`] - Project layout (root, source/data/locales directories,
//!   layout namespace, index file, watcher priority)
//! - [`WatchConfig`] - File watcher settings (debouncing, polling, ignores)
//!
//! Both implement [`Default`] with the conventional project layout, and
//! deserialize with `#[serde(default)]` so a config file only needs the
//! options it changes.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Priority given to watchers that don't ask for one.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Configuration for file watchers.
///
/// # Examples
///
/// ```
/// use sg_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds for push-based notification.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Interval between manual polls when live notification is unavailable.
    pub poll_interval_ms: u64,

    /// Path fragments excluded from every watcher, matched per component.
    pub ignore_patterns: Vec<String>,

    /// Whether scans descend into symlinked directories.
    pub follow_links: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
            poll_interval_ms: 1000,
            ignore_patterns: vec![
                ".DS_Store".to_owned(),
                ".git".to_owned(),
                ".sass-cache".to_owned(),
                ".jekyll-metadata".to_owned(),
            ],
            follow_links: false,
        }
    }
}

/// Root configuration for a site project.
///
/// Directory names are relative to [`root`](Self::root); use the
/// `*_path` accessors to get absolute locations.
///
/// # Examples
///
/// ```
/// use sg_core::SiteConfig;
/// use camino::Utf8Path;
///
/// let config = SiteConfig::new(Utf8Path::new("/site"));
/// assert_eq!(config.source_path().as_str(), "/site/source");
/// assert_eq!(config.layouts_dir, "layouts");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Project root directory.
    pub root: Utf8PathBuf,

    /// Directory holding page sources (typically "source").
    pub source_dir: String,

    /// Directory holding data files (typically "data").
    pub data_dir: String,

    /// Directory holding locale files (typically "locales").
    pub locales_dir: String,

    /// Reserved layout namespace inside the source directory.
    pub layouts_dir: String,

    /// Name of the top-level layout template, with extensions stripped.
    pub layout_name: String,

    /// File appended to directory-style page paths.
    pub index_file: String,

    /// Layout attached to page declarations that don't name one.
    pub default_layout: Option<String>,

    /// Priority of the watchers the session registers for itself.
    pub default_priority: i32,

    /// File watcher configuration.
    pub watch: WatchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            source_dir: "source".to_owned(),
            data_dir: "data".to_owned(),
            locales_dir: "locales".to_owned(),
            layouts_dir: "layouts".to_owned(),
            layout_name: "layout".to_owned(),
            index_file: "index.html".to_owned(),
            default_layout: Some("layout".to_owned()),
            default_priority: DEFAULT_PRIORITY,
            watch: WatchConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Creates a configuration with default settings rooted at `root`.
    #[must_use]
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values. The `root` field, when
    /// relative, is resolved against the directory holding the file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;

        if config.root.is_relative() {
            if let Some(parent) = path.parent() {
                config.root = parent.join(&config.root);
            }
        }

        Ok(config)
    }

    /// Absolute path of the page source directory.
    #[must_use]
    pub fn source_path(&self) -> Utf8PathBuf {
        self.root.join(&self.source_dir)
    }

    /// Absolute path of the data directory.
    #[must_use]
    pub fn data_path(&self) -> Utf8PathBuf {
        self.root.join(&self.data_dir)
    }

    /// Absolute path of the locales directory.
    #[must_use]
    pub fn locales_path(&self) -> Utf8PathBuf {
        self.root.join(&self.locales_dir)
    }

    /// Checks that the configuration describes a usable project.
    ///
    /// The root must exist and be a directory. The source directory may be
    /// missing; watchers treat a missing directory as empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::MissingDirectory(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: self.root.clone(),
                reason: "not a directory".to_owned(),
            });
        }
        if self.default_priority < 0 {
            return Err(ConfigError::invalid_option(
                "default_priority",
                "must be non-negative",
            ));
        }
        if self.index_file.is_empty() || self.index_file.contains('/') {
            return Err(ConfigError::invalid_option(
                "index_file",
                "must be a plain file name",
            ));
        }
        Ok(())
    }

    /// Validates the configuration and replaces `root` with its canonical
    /// absolute form.
    ///
    /// Watchers, the resolver, and notify events must all agree on one
    /// absolute root, so sessions call this once before wiring anything.
    pub fn canonicalize_root(&mut self) -> Result<(), ConfigError> {
        self.validate()?;
        self.root = self
            .root
            .canonicalize_utf8()
            .map_err(|e| ConfigError::InvalidPath {
                path: self.root.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
