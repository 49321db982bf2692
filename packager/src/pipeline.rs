//! Release pipeline orchestration.
//!
//! Runs the release steps strictly in order: ensure the output directory,
//! generate and parse build metadata, resolve the version, validate the
//! required binaries, stage and archive each platform, then sign. The first
//! failure ends the run; archives already written stay on disk.

use crate::archive::{ArchiveBuilder, ReleaseArchive};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metadata::{BuildInfo, generate_build_info};
use crate::output::{ReleaseSummary, write_stderr_line};
use crate::platform::Platform;
use crate::runner::CommandRunner;
use crate::scanner::{describe_releases, scan_releases};
use crate::signing::SigningInvoker;
use crate::stager::StagingAssembler;
use crate::validator::validate;
use crate::version::Version;
use camino::Utf8PathBuf;
use std::fmt;
use std::fs;
use std::io::Write;

/// Progress markers of a run, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing has happened yet.
    Start,
    /// The output directory exists.
    DirectoryEnsured,
    /// The metadata generator has written the build file.
    MetadataGenerated,
    /// The build file has been read and the version resolved.
    MetadataParsed,
    /// Every required binary is present.
    Validated,
    /// A platform's archive has been written.
    PlatformPackaged(Platform),
    /// The signing script completed.
    Signed,
    /// The run finished successfully.
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::DirectoryEnsured => f.write_str("directory ensured"),
            Self::MetadataGenerated => f.write_str("metadata generated"),
            Self::MetadataParsed => f.write_str("metadata parsed"),
            Self::Validated => f.write_str("validated"),
            Self::PlatformPackaged(platform) => write!(f, "{platform} packaged"),
            Self::Signed => f.write_str("signed"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// A release run over one configuration.
pub struct ReleasePipeline<'a> {
    config: &'a PipelineConfig,
    runner: &'a dyn CommandRunner,
    stage: PipelineStage,
}

impl<'a> ReleasePipeline<'a> {
    /// Create a pipeline that runs subprocesses through `runner`.
    #[must_use]
    pub fn new(config: &'a PipelineConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            stage: PipelineStage::Start,
        }
    }

    /// The last stage reached.
    #[must_use]
    pub const fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Execute the whole run.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any step; see
    /// [`crate::error::PackagerError`] for the conditions.
    pub fn run(&mut self, stderr: &mut dyn Write) -> Result<ReleaseSummary> {
        let config = self.config;
        write_stderr_line(stderr, "Preparing releases...");

        fs::create_dir_all(&config.output_root)?;
        self.advance(PipelineStage::DirectoryEnsured);

        let releases = scan_releases(&config.output_root)?;
        write_stderr_line(stderr, describe_releases(&releases));

        write_stderr_line(stderr, "");
        write_stderr_line(stderr, "Generating build information...");
        let build_file = generate_build_info(config, self.runner, stderr)?;
        self.advance(PipelineStage::MetadataGenerated);

        let info = BuildInfo::read(&build_file)?;
        report_build_info(&info, stderr);
        let version = Version::resolve(info.descriptor.as_deref())?;
        write_stderr_line(stderr, format!("Release version: {version}"));
        self.advance(PipelineStage::MetadataParsed);

        validate(&config.output_root, &config.required, stderr)?;
        self.advance(PipelineStage::Validated);

        let (archives, disk_images) = self.package_platforms(&version, stderr)?;

        let signing_script =
            SigningInvoker::from_config(config, self.runner).sign(&config.output_root, stderr)?;
        self.advance(PipelineStage::Signed);

        self.advance(PipelineStage::Done);
        Ok(ReleaseSummary {
            version,
            build_date: info.date,
            archives,
            disk_images,
            signing_script,
        })
    }

    fn package_platforms(
        &mut self,
        version: &Version,
        stderr: &mut dyn Write,
    ) -> Result<(Vec<ReleaseArchive>, Vec<Utf8PathBuf>)> {
        let config = self.config;
        let assembler = StagingAssembler::from_config(config);
        let builder = ArchiveBuilder::from_config(config);
        let mut archives = Vec::with_capacity(config.platforms.len());
        let mut disk_images = Vec::new();

        for &platform in &config.platforms {
            write_stderr_line(stderr, "");
            write_stderr_line(stderr, format!("Preparing {platform} release..."));
            let platform_dir = config.platform_dir(platform);
            let staging = assembler.assemble(&platform_dir, platform, stderr)?;
            let packaged = builder.build(&staging, version, &platform_dir, stderr)?;
            staging.close()?;

            archives.push(packaged.archive);
            disk_images.extend(packaged.disk_image);
            self.advance(PipelineStage::PlatformPackaged(platform));
        }
        Ok((archives, disk_images))
    }

    fn advance(&mut self, stage: PipelineStage) {
        log::debug!("pipeline stage: {} -> {stage}", self.stage);
        self.stage = stage;
    }
}

fn report_build_info(info: &BuildInfo, stderr: &mut dyn Write) {
    let desc = info.descriptor.as_deref().unwrap_or("Not found");
    let date = info.date.as_deref().unwrap_or("Not found");
    write_stderr_line(stderr, format!("BUILD_DESC: {desc}"));
    write_stderr_line(stderr, format!("BUILD_DATE: {date}"));
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
