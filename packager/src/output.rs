//! Operator-facing output.
//!
//! Progress lines go to a caller-supplied writer (stderr in the binary, a
//! buffer in tests). This module also renders the dry-run plan and the final
//! release summary, both as text and as JSON.

use crate::archive::ReleaseArchive;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::version::Version;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::io::Write;

/// Writes one line, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// A writer that discards everything, used for `--quiet` runs.
#[must_use]
pub fn quiet_sink() -> std::io::Sink {
    std::io::sink()
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseSummary {
    /// Version embedded in the archive names.
    pub version: Version,
    /// Build date reported by the metadata generator, if any.
    pub build_date: Option<String>,
    /// Archives written, in packaging order.
    pub archives: Vec<ReleaseArchive>,
    /// Disk images relocated into the output directory.
    pub disk_images: Vec<Utf8PathBuf>,
    /// The signing script's location inside the output directory.
    pub signing_script: Utf8PathBuf,
}

impl ReleaseSummary {
    /// Human-readable summary printed after a successful run.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "✓ Release preparation completed successfully!".to_owned(),
            String::new(),
            format!("Version: {}", self.version),
        ];
        if let Some(date) = &self.build_date {
            lines.push(format!("Build date: {date}"));
        }
        lines.push(String::new());
        lines.push("Archives:".to_owned());
        for archive in &self.archives {
            lines.push(format!("  {}", archive.path));
            lines.push(format!("    sha256: {}", archive.sha256));
        }
        for image in &self.disk_images {
            lines.push(format!("  {image}"));
        }
        lines.join("\n")
    }

    /// Pretty-printed JSON form of the summary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PackagerError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Resolved configuration shown by `--dry-run`.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The configuration that would be used.
    pub config: &'a PipelineConfig,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Repository root: {}", config.repo_root),
            format!("Releases directory: {}", config.output_root),
            format!("Metadata generator: {}", config.metadata_generator),
            format!("Signing script: {}", config.signing_script),
            format!("Auxiliary scripts: {}", config.scripts_dir),
        ];
        match &config.staging_root {
            Some(dir) => lines.push(format!("Staging directory: {dir}")),
            None => lines.push("Staging directory: system temporary directory".to_owned()),
        }
        match config.command_timeout {
            Some(timeout) => lines.push(format!("Command timeout: {}s", timeout.as_secs())),
            None => lines.push("Command timeout: none".to_owned()),
        }

        lines.push(String::new());
        lines.push("Required files:".to_owned());
        for (platform, files) in config.required.iter() {
            for file in files {
                lines.push(format!("  - {platform}/{file}"));
            }
        }

        lines.push(String::new());
        lines.push("Platforms to package:".to_owned());
        for platform in &config.platforms {
            lines.push(format!("  - {platform}"));
        }

        lines.join("\n")
    }
}
