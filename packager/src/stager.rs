//! Per-platform staging.
//!
//! A [`StagingArea`] is a temporary directory holding exactly the files that
//! go into one platform's archive: the platform binaries, the generated
//! `komodo.conf`, and the platform's bootstrap scripts. The directory is
//! removed when the `StagingArea` is dropped, whichever way the platform pass
//! ends.

use crate::config::PipelineConfig;
use crate::error::{PackagerError, Result};
use crate::fsutil::{make_executable, utf8_path};
use crate::output::write_stderr_line;
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use tempfile::TempDir;

/// Name of the generated runtime configuration file.
pub const RUNTIME_CONFIG_FILE: &str = "komodo.conf";

/// Contents of the generated runtime configuration file. Identical for every
/// platform and every run.
pub const RUNTIME_CONFIG: &str = "\
txindex=1
onlynet=ipv4
rpcuser=komodo
rpcpassword=local321
rpcallowip=127.0.0.1
rpcbind=127.0.0.1
# rpc server turned off by default for security purposes
server=0
";

/// A populated, exclusively owned staging directory for one platform.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    path: Utf8PathBuf,
    platform: Platform,
    files: Vec<String>,
}

impl StagingArea {
    /// Path of the staging directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Platform this staging area was assembled for.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Names of the staged files, in the order they were first added.
    ///
    /// Each name appears once; restaging a name overwrites the file in place.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    fn record(&mut self, name: &str) {
        if !self.files.iter().any(|staged| staged == name) {
            self.files.push(name.to_owned());
        }
    }

    /// Remove the staging directory now, reporting any failure.
    ///
    /// Dropping the value also removes the directory but swallows errors.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the directory cannot be removed.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Builds staging directories for platform passes.
#[derive(Debug)]
pub struct StagingAssembler<'a> {
    scripts_dir: &'a Utf8Path,
    staging_root: Option<&'a Utf8Path>,
}

impl<'a> StagingAssembler<'a> {
    /// Create an assembler that takes auxiliary scripts from `scripts_dir`
    /// and creates staging directories under `staging_root` (or the system
    /// temporary directory when `None`).
    #[must_use]
    pub const fn new(scripts_dir: &'a Utf8Path, staging_root: Option<&'a Utf8Path>) -> Self {
        Self {
            scripts_dir,
            staging_root,
        }
    }

    /// Create an assembler from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &'a PipelineConfig) -> Self {
        Self::new(&config.scripts_dir, config.staging_root.as_deref())
    }

    /// Assemble the staging directory for `platform` from `platform_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::PlatformDirectoryMissing`] if `platform_dir`
    /// does not exist, [`PackagerError::StagingFailed`] if the staging
    /// directory cannot be created or a file cannot be copied, and
    /// [`PackagerError::Io`] for other I/O failures. The staging directory is
    /// removed on every error path.
    pub fn assemble(
        &self,
        platform_dir: &Utf8Path,
        platform: Platform,
        stderr: &mut dyn Write,
    ) -> Result<StagingArea> {
        if !platform_dir.is_dir() {
            return Err(PackagerError::PlatformDirectoryMissing {
                platform,
                path: platform_dir.to_owned(),
            });
        }

        let mut area = self.create_area(platform)?;
        write_stderr_line(
            stderr,
            format!("  Created temporary directory: {}", area.path),
        );

        copy_platform_files(&mut area, platform_dir, stderr)?;
        write_runtime_config(&mut area, stderr)?;
        self.copy_aux_scripts(&mut area, stderr)?;

        Ok(area)
    }

    fn create_area(&self, platform: Platform) -> Result<StagingArea> {
        let prefix = format!("komodo-release-{platform}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let created = match self.staging_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        let dir = created.map_err(|e| PackagerError::StagingFailed {
            platform,
            reason: format!("failed to create staging directory: {e}"),
        })?;
        let path = utf8_path(dir.path())?;
        log::debug!("staging {platform} in {path}");
        Ok(StagingArea {
            dir,
            path,
            platform,
            files: Vec::new(),
        })
    }

    fn copy_aux_scripts(&self, area: &mut StagingArea, stderr: &mut dyn Write) -> Result<()> {
        for script in area.platform.aux_scripts() {
            let source = self.scripts_dir.join(script.name);
            if !source.is_file() {
                log::warn!("{} not found at {source}", script.name);
                write_stderr_line(
                    stderr,
                    format!("    Warning: {} not found at {source}", script.name),
                );
                continue;
            }
            let dest = stage_copy(area, &source, script.name)?;
            if script.executable {
                make_executable(&dest)?;
            }
            write_stderr_line(stderr, format!("    Copied {}", script.name));
        }
        Ok(())
    }
}

/// Copies the regular files directly under `platform_dir`, sorted by name.
fn copy_platform_files(
    area: &mut StagingArea,
    platform_dir: &Utf8Path,
    stderr: &mut dyn Write,
) -> Result<()> {
    write_stderr_line(stderr, format!("  Copying files from {platform_dir}..."));

    let mut sources = Vec::new();
    for entry in platform_dir.read_dir_utf8()? {
        let entry = entry?;
        // `metadata` follows symlinks, so a link to a binary is staged as
        // the binary itself and a dangling link is skipped.
        if fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file()) {
            sources.push(entry.into_path());
        }
    }
    sources.sort();

    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        if area.platform.excludes_from_staging(&source) {
            write_stderr_line(
                stderr,
                format!("    Skipped {name} (will be copied separately)"),
            );
            continue;
        }
        stage_copy(area, &source, name)?;
        write_stderr_line(stderr, format!("    Copied {name}"));
    }
    Ok(())
}

/// Writes the fixed runtime configuration into the staging directory.
fn write_runtime_config(area: &mut StagingArea, stderr: &mut dyn Write) -> Result<()> {
    fs::write(area.path.join(RUNTIME_CONFIG_FILE), RUNTIME_CONFIG)?;
    area.record(RUNTIME_CONFIG_FILE);
    write_stderr_line(stderr, format!("  Created {RUNTIME_CONFIG_FILE}"));
    Ok(())
}

fn stage_copy(area: &mut StagingArea, source: &Utf8Path, name: &str) -> Result<Utf8PathBuf> {
    let dest = area.path.join(name);
    fs::copy(source, &dest).map_err(|e| PackagerError::StagingFailed {
        platform: area.platform,
        reason: format!("failed to copy {source} to {dest}: {e}"),
    })?;
    area.record(name);
    Ok(dest)
}

#[cfg(test)]
#[path = "stager_tests.rs"]
mod tests;
