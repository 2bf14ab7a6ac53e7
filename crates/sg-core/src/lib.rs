//! Core types, path matchers, and configuration for the sg-site pipeline.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - Domain types ([`SourceFile`], [`SourceType`], [`PathEntry`], [`PathTarget`])
//! - Path matchers used by ignores and page declarations ([`PathMatcher`])
//! - Configuration structures ([`SiteConfig`], [`WatchConfig`])
//! - Error types for configuration and matcher construction
//!
//! # Crate Dependencies
//!
//! ```text
//! sg-cli ──► sg-sitemap ──► sg-sources ──► sg-watcher ──► sg-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod matcher;
pub mod types;

pub use config::{SiteConfig, WatchConfig, DEFAULT_PRIORITY};
pub use error::{ConfigError, MatcherError};
pub use matcher::PathMatcher;
pub use types::{absolute_path, strip_leading_slash, PathEntry, PathTarget, SourceFile, SourceType};
