//! Build metadata generation and parsing.
//!
//! The repository's `share/genbuild.sh` writes a C header fragment whose
//! `#define BUILD_DESC "…"` and `#define BUILD_DATE "…"` lines carry the
//! release descriptor and build date. Either marker may be absent; a missing
//! descriptor only becomes fatal when the version is resolved.

use crate::config::PipelineConfig;
use crate::error::{PackagerError, Result};
use crate::fsutil::make_executable;
use crate::output::write_stderr_line;
use crate::runner::{CommandRunner, Invocation, ensure_success};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;

/// Name of the file the generator writes into the output directory.
pub const BUILD_INFO_FILE: &str = "build.txt";

const DESC_KEY: &str = "BUILD_DESC";
const DATE_KEY: &str = "BUILD_DATE";

/// Values extracted from the generated build file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    /// The raw build descriptor, e.g. `v0.9.1`.
    pub descriptor: Option<String>,
    /// The build date as written by the generator.
    pub date: Option<String>,
}

impl BuildInfo {
    /// Parse the generator output.
    ///
    /// The first quoted, non-empty value for each key wins; unrelated lines
    /// are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use komodo_packager::metadata::BuildInfo;
    ///
    /// let info = BuildInfo::parse("#define BUILD_DESC \"v0.9.1\"\n");
    /// assert_eq!(info.descriptor.as_deref(), Some("v0.9.1"));
    /// assert!(info.date.is_none());
    /// ```
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();
        for (key, value) in content.lines().filter_map(parse_define) {
            match key {
                DESC_KEY if info.descriptor.is_none() => info.descriptor = Some(value.to_owned()),
                DATE_KEY if info.date.is_none() => info.date = Some(value.to_owned()),
                _ => {}
            }
        }
        info
    }

    /// Read and parse a build file.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::MetadataFileMissing`] if the file does not
    /// exist, or [`PackagerError::Io`] if it cannot be read.
    pub fn read(path: &Utf8Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PackagerError::MetadataFileMissing {
                path: path.to_owned(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }
}

/// Split `#define KEY "value"` into `(KEY, value)`.
fn parse_define(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix("#define")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (key, value) = rest.trim_start().split_once(char::is_whitespace)?;
    let value = value.trim_start().strip_prefix('"')?;
    let (value, _) = value.split_once('"')?;
    (!value.is_empty()).then_some((key, value))
}

/// Run the metadata generator and return the path of the file it wrote.
///
/// The generator is marked executable first, then invoked as
/// `genbuild.sh <output>/build.txt <repo> .` from the repository root. The
/// command line is echoed to `stderr` before it runs.
///
/// # Errors
///
/// Returns [`PackagerError::MetadataGeneratorMissing`] if the script is
/// absent and [`PackagerError::SubprocessFailed`] if it exits non-zero.
pub fn generate_build_info(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    stderr: &mut dyn Write,
) -> Result<Utf8PathBuf> {
    let script = &config.metadata_generator;
    if !script.is_file() {
        return Err(PackagerError::MetadataGeneratorMissing {
            path: script.clone(),
        });
    }
    make_executable(script)?;

    let build_file = config.output_root.join(BUILD_INFO_FILE);
    let invocation = Invocation::new(script.clone(), config.repo_root.clone())
        .arg(build_file.as_str())
        .arg(config.repo_root.as_str())
        .arg(".");
    write_stderr_line(stderr, format!("Running: {invocation}"));
    let output = runner.run(&invocation)?;
    ensure_success(&invocation, &output)?;
    Ok(build_file)
}
