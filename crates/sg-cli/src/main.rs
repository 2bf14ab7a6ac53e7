//! CLI entry point for the sg-site tools.
//!
//! # Usage
//!
//! ```bash
//! sg-site [OPTIONS] <COMMAND>
//!
//! # Print the sitemap of the project in the current directory
//! sg-site scan
//!
//! # Same, as JSON
//! sg-site --root ./my-site scan --json
//!
//! # Keep the sitemap current and log every change
//! sg-site --config site.json watch
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use sg_core::{PathEntry, SiteConfig, SourceFile};
use sg_sitemap::{Resource, SetupReport, SiteSession};
use sg_sources::Interest;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Sitemap and change-tracking tools for static sites.
#[derive(Parser)]
#[command(name = "sg-site", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root directory.
    ///
    /// Defaults to the current directory, or to the `root` of `--config`.
    #[arg(short, long, global = true, env = "SG_SITE_ROOT")]
    root: Option<Utf8PathBuf>,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "SG_SITE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build the sitemap once and print it.
    Scan {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Build the sitemap and keep it current until Ctrl-C.
    Watch,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`SiteConfig`] from CLI arguments.
///
/// `--config` is loaded first; `--root` then overrides its root. The
/// resulting root is canonicalized so every path the tools print is
/// absolute.
fn build_config(root: Option<&Utf8PathBuf>, config: Option<&Utf8PathBuf>) -> color_eyre::Result<SiteConfig> {
    let mut site = match config {
        Some(path) => SiteConfig::from_json_file(path)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load {path}: {e}"))?,
        None => SiteConfig::default(),
    };

    if let Some(root) = root {
        site.root.clone_from(root);
    }

    site.canonicalize_root()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {e}"))?;
    Ok(site)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Sets up a session and prints its sitemap.
fn run_scan(config: SiteConfig, json: bool) -> color_eyre::Result<()> {
    info!(root = %config.root, "Starting scan");

    let session = SiteSession::with_default_extensions(config)?;
    let report = session.setup()?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if json {
        let output = json_listing(&report, &session)?;
        writeln!(handle, "{output}")?;
    } else {
        write!(handle, "{}", table_listing(&session.index().entries()))?;
    }

    for (path, target) in session.index().dangling_proxies() {
        warn!(path = %path, target = %target, "Proxy target does not exist");
    }

    Ok(())
}

/// Sets up a session, starts live notification, and logs every routed
/// change until Ctrl-C.
async fn run_watch(config: SiteConfig) -> color_eyre::Result<()> {
    let poll_interval = Duration::from_millis(config.watch.poll_interval_ms.max(1));
    let session = SiteSession::with_default_extensions(config)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeBatch>();
    session.sources().on_change(Interest::All, move |updated, removed| {
        // Receiver gone means we're shutting down
        let _ = tx.send(ChangeBatch::from_files(updated, removed));
    });

    let report = session.setup()?;
    info!(
        paths = session.index().len(),
        added = report.added,
        excluded = report.excluded,
        "Initial sitemap built"
    );
    session.start();

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            Some(batch) = rx.recv() => {
                for path in &batch.updated {
                    info!(path = %path, "Changed");
                }
                for path in &batch.removed {
                    info!(path = %path, "Removed");
                }
            }
            _ = ticker.tick() => {
                let poll = session.sources().rescan();
                for failure in &poll.failures {
                    warn!(error = %failure, "Poll failed");
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    session.stop();
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Relative paths of one routed change.
struct ChangeBatch {
    updated: Vec<String>,
    removed: Vec<String>,
}

impl ChangeBatch {
    fn from_files(updated: &[SourceFile], removed: &[SourceFile]) -> Self {
        let describe = |files: &[SourceFile]| -> Vec<String> {
            files
                .iter()
                .map(|f| match f.types().first() {
                    Some(source_type) => format!("{source_type}:{}", f.relative_path()),
                    None => f.relative_path().to_string(),
                })
                .collect()
        };
        Self {
            updated: describe(updated),
            removed: describe(removed),
        }
    }
}

/// Formats the sitemap as an aligned two-column table.
fn table_listing(entries: &[(String, PathEntry)]) -> String {
    use std::fmt::Write;

    let width = entries.iter().map(|(path, _)| path.len()).max().unwrap_or(0);
    let mut output = String::new();
    for (path, entry) in entries {
        let _ = writeln!(output, "{path:<width$}  {entry}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{} paths", entries.len());
    output
}

/// Formats the setup report, sitemap, and resources as JSON.
fn json_listing(report: &SetupReport, session: &SiteSession) -> color_eyre::Result<String> {
    #[derive(serde::Serialize)]
    struct Listing<'a> {
        report: &'a SetupReport,
        sitemap: serde_json::Map<String, serde_json::Value>,
        resources: Vec<Resource>,
    }

    let sitemap = session
        .index()
        .entries()
        .into_iter()
        .map(|(path, entry)| (path, entry_json(&entry)))
        .collect();
    let listing = Listing {
        report,
        sitemap,
        resources: session.resources(),
    };
    serde_json::to_string_pretty(&listing)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))
}

/// `true`, `false`, or the proxy target, as the sitemap stores it.
fn entry_json(entry: &PathEntry) -> serde_json::Value {
    match entry {
        PathEntry::Normal | PathEntry::Generic => serde_json::Value::Bool(true),
        PathEntry::Ignored => serde_json::Value::Bool(false),
        PathEntry::Proxy(target) => serde_json::Value::String(target.clone()),
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = build_config(cli.root.as_ref(), cli.config.as_ref())?;
    match cli.command {
        Commands::Scan { json } => run_scan(config, json),
        Commands::Watch => run_watch(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["sg-site", "--root", "site", "scan", "--json"]).unwrap();
        assert_eq!(cli.root.as_deref().map(camino::Utf8Path::as_str), Some("site"));
        assert!(matches!(cli.command, Commands::Scan { json: true }));
    }

    #[test]
    fn test_root_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let file = root.join("site.json");
        fs::write(&file, r#"{ "root": "elsewhere", "index_file": "home.html" }"#).unwrap();

        let config = build_config(Some(&root), Some(&file)).unwrap();
        assert_eq!(config.root, root.canonicalize_utf8().unwrap());
        assert_eq!(config.index_file, "home.html");
    }

    #[test]
    fn test_relative_root_is_canonicalized() {
        let dir = tempfile::Builder::new()
            .prefix("sg-cli-root")
            .tempdir_in(".")
            .unwrap();
        let name = dir.path().file_name().unwrap().to_str().unwrap();
        let relative = Utf8PathBuf::from(".").join(name);

        let config = build_config(Some(&relative), None).unwrap();
        assert!(config.root.is_absolute());
        assert_eq!(
            config.root.as_std_path(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = utf8(&dir).join("nope");
        assert!(build_config(Some(&missing), None).is_err());
    }

    #[test]
    fn test_table_listing() {
        let entries = vec![
            ("about.html".to_owned(), PathEntry::Ignored),
            ("index.html".to_owned(), PathEntry::Normal),
            ("team".to_owned(), PathEntry::Proxy("about.html".to_owned())),
        ];
        let table = table_listing(&entries);
        assert_eq!(
            table,
            "about.html  ignored\nindex.html  normal\nteam        proxy -> about.html\n\n3 paths\n"
        );
    }

    #[test]
    fn test_entry_json_matches_sitemap_values() {
        assert_eq!(entry_json(&PathEntry::Normal), serde_json::json!(true));
        assert_eq!(entry_json(&PathEntry::Ignored), serde_json::json!(false));
        assert_eq!(
            entry_json(&PathEntry::Proxy("a.html".to_owned())),
            serde_json::json!("a.html")
        );
    }
}
