//! CLI argument definitions for the release packager.
//!
//! This module defines the command-line interface using clap and folds the
//! parsed flags into a [`PipelineConfig`].

use crate::config::PipelineConfig;
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::LevelFilter;
use std::time::Duration;

/// Package prebuilt Komodo binaries into signed release archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "komodo-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package prebuilt Komodo binaries into signed release archives.\n\n",
    "Generates build metadata, checks that every required binary is present ",
    "under the releases directory, assembles one archive per platform with ",
    "komodo.conf and the fetch-params scripts, and runs the signing script ",
    "over the results.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package the default platforms (focal, windows):\n",
    "    $ komodo-packager\n\n",
    "  Package the macOS wallet only:\n",
    "    $ komodo-packager -p macos\n\n",
    "  Preview the resolved configuration:\n",
    "    $ komodo-packager --dry-run\n\n",
    "  Emit a machine-readable summary:\n",
    "    $ komodo-packager --json > release.json",
))]
pub struct Cli {
    /// Repository root [default: nearest ancestor containing share/genbuild.sh].
    #[arg(short, long, value_name = "DIR")]
    pub repo_root: Option<Utf8PathBuf>,

    /// Release directory with per-platform binaries [default: <repo>/releases].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Platform to package (can be repeated) [default: focal, windows].
    #[arg(short, long, value_name = "NAME", value_enum)]
    pub platform: Vec<Platform>,

    /// Parent directory for temporary staging directories.
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<Utf8PathBuf>,

    /// Kill the metadata generator or signing script after N seconds.
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,

    /// Show configuration and exit without touching any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the release summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Build the pipeline configuration for a checkout at `repo_root`.
    #[must_use]
    pub fn to_config(&self, repo_root: &Utf8Path) -> PipelineConfig {
        let mut config = PipelineConfig::for_repository(repo_root);
        if let Some(dir) = &self.output_dir {
            config = config.with_output_root(dir.clone());
        }
        if !self.platform.is_empty() {
            config = config.with_platforms(&self.platform);
        }
        config.staging_root.clone_from(&self.staging_dir);
        config.command_timeout = self.timeout_secs.map(Duration::from_secs);
        config
    }

    /// Default log filter implied by `-v`/`-q`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
