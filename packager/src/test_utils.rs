//! Shared test utilities for the packager crate.

use crate::config::{GENBUILD_SCRIPT, PipelineConfig};
use crate::error::{PackagerError, Result};
use crate::metadata::BUILD_INFO_FILE;
use crate::platform::Platform;
use crate::runner::{CommandRunner, Invocation};
use crate::signing::SIGNING_SCRIPT_NAME;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Side effect performed by the stub when a call matches.
pub type CallEffect = Box<dyn Fn(&Invocation) -> io::Result<()>>;

/// Represents an expected command invocation for testing.
pub struct ExpectedCall {
    /// The program expected to run.
    pub program: Utf8PathBuf,
    /// The arguments expected.
    pub args: Vec<String>,
    /// The working directory expected.
    pub working_dir: Utf8PathBuf,
    /// Optional side effect, such as writing the file the real tool writes.
    pub effect: Option<CallEffect>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `invocation` and answer with `result`.
    #[must_use]
    pub fn new(invocation: Invocation, result: Result<Output>) -> Self {
        Self {
            program: invocation.program,
            args: invocation.args,
            working_dir: invocation.working_dir,
            effect: None,
            result,
        }
    }

    /// Perform `effect` when the call is received.
    #[must_use]
    pub fn with_effect(mut self, effect: impl Fn(&Invocation) -> io::Result<()> + 'static) -> Self {
        self.effect = Some(Box::new(effect));
        self
    }

    /// A successful metadata-generator call that writes `content` to the
    /// build file named in its first argument.
    #[must_use]
    pub fn genbuild(invocation: Invocation, content: &str) -> Self {
        let content = content.to_owned();
        Self::new(invocation, Ok(success_output())).with_effect(move |inv| {
            let target = inv
                .args
                .first()
                .ok_or_else(|| io::Error::other("genbuild invoked without a target"))?;
            fs::write(target, &content)
        })
    }

    fn matches(&self, invocation: &Invocation) -> bool {
        self.program == invocation.program
            && self.args == invocation.args
            && self.working_dir == invocation.working_dir
    }
}

impl fmt::Debug for ExpectedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedCall")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("working_dir", &self.working_dir)
            .field("effect", &self.effect.is_some())
            .field("result", &self.result)
            .finish()
    }
}

/// Contents of a generated build file carrying `descriptor`.
#[must_use]
pub fn build_info_content(descriptor: &str, date: &str) -> String {
    format!(
        "#define BUILD_DESC \"{descriptor}\"\n#define BUILD_SUFFIX test\n#define BUILD_DATE \"{date}\"\n"
    )
}

/// The generator invocation for a repository rooted at `repo_root` with
/// output under `output_root`.
#[must_use]
pub fn genbuild_invocation(repo_root: &Utf8Path, output_root: &Utf8Path) -> Invocation {
    Invocation::new(repo_root.join(GENBUILD_SCRIPT), repo_root)
        .arg(output_root.join(BUILD_INFO_FILE).as_str())
        .arg(repo_root.as_str())
        .arg(".")
}

/// The signing invocation for archives under `output_root`.
#[must_use]
pub fn signing_invocation(output_root: &Utf8Path) -> Invocation {
    Invocation::new(output_root.join(SIGNING_SCRIPT_NAME), output_root)
}

/// A stub implementation of `CommandRunner` for testing.
///
/// Holds expected invocations in order and returns predefined results,
/// recording every invocation it receives.
#[derive(Debug, Default)]
pub struct StubRunner {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<Invocation>>,
}

impl StubRunner {
    /// Creates a new `StubRunner` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Invocations received so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<Invocation> {
        self.received.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations, {} remain",
            self.expected.borrow().len()
        );
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        self.received.borrow_mut().push(invocation.clone());
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| PackagerError::StubMismatch {
                message: format!("unexpected invocation: {invocation}"),
            })?;

        if !call.matches(invocation) {
            return Err(PackagerError::StubMismatch {
                message: format!(
                    "expected {} {:?} in {}, got {invocation} in {}",
                    call.program, call.args, call.working_dir, invocation.working_dir
                ),
            });
        }
        if let Some(effect) = &call.effect {
            effect(invocation)?;
        }
        call.result
    }
}

/// A scratch Komodo checkout with a release output tree.
///
/// Holds the generator, signing script and auxiliary scripts at their
/// conventional locations, and a configuration whose staging directories
/// are created under `<root>/staging` so tests can check they are removed.
#[derive(Debug)]
pub struct ReleaseTree {
    _temp: TempDir,
    /// Repository root.
    pub root: Utf8PathBuf,
    /// Configuration pointing at the tree.
    pub config: PipelineConfig,
}

impl ReleaseTree {
    /// Creates a checkout with scripts in place and empty platform
    /// directories.
    ///
    /// # Panics
    ///
    /// Panics if the temporary tree cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir not UTF-8");
        let mut config = PipelineConfig::for_repository(&root);
        let staging = root.join("staging");
        config.staging_root = Some(staging.clone());

        for dir in [&staging, &config.scripts_dir] {
            fs::create_dir_all(dir).expect("failed to create directory");
        }
        for script in [&config.metadata_generator, &config.signing_script] {
            write_file(script, "#!/bin/sh\n");
        }
        for script in ["fetch-params.sh", "fetch-params-alt.sh", "fetch-params.bat"] {
            write_file(&config.scripts_dir.join(script), "#!/bin/sh\n");
        }
        for platform in [Platform::Focal, Platform::Windows, Platform::Macos] {
            fs::create_dir_all(config.platform_dir(platform))
                .expect("failed to create platform directory");
        }

        Self {
            _temp: temp,
            root,
            config,
        }
    }

    /// Creates a checkout where every default required binary is present.
    #[must_use]
    pub fn complete() -> Self {
        let tree = Self::new();
        for platform in Platform::DEFAULT_PACKAGED {
            tree.add_files(platform, platform.default_required_files());
        }
        tree
    }

    /// Writes `files` into the platform's artefact directory.
    pub fn add_files(&self, platform: Platform, files: &[&str]) {
        let dir = self.config.platform_dir(platform);
        for file in files {
            write_file(&dir.join(file), file);
        }
    }

    /// Removes one file from the platform's artefact directory.
    ///
    /// # Panics
    ///
    /// Panics if the file does not exist.
    pub fn remove_file(&self, platform: Platform, file: &str) {
        fs::remove_file(self.config.platform_dir(platform).join(file))
            .expect("failed to remove file");
    }

    /// Number of entries left in the staging parent directory.
    ///
    /// # Panics
    ///
    /// Panics if the staging parent cannot be read.
    #[must_use]
    pub fn staging_entries(&self) -> usize {
        self.config
            .staging_root
            .as_ref()
            .map_or(0, |dir| fs::read_dir(dir).expect("failed to read staging").count())
    }

    /// Expected generator call writing a build file for `descriptor`.
    #[must_use]
    pub fn genbuild_call(&self, descriptor: &str) -> ExpectedCall {
        ExpectedCall::genbuild(
            genbuild_invocation(&self.root, &self.config.output_root),
            &build_info_content(descriptor, "2026-10-17 09:30:00 +0000"),
        )
    }

    /// Expected signing call answering with `result`.
    #[must_use]
    pub fn signing_call(&self, result: Result<Output>) -> ExpectedCall {
        ExpectedCall::new(signing_invocation(&self.config.output_root), result)
    }

    /// A runner scripted for a complete, successful run at `descriptor`.
    #[must_use]
    pub fn successful_runner(&self, descriptor: &str) -> StubRunner {
        StubRunner::new(vec![
            self.genbuild_call(descriptor),
            self.signing_call(Ok(success_output())),
        ])
    }
}

impl Default for ReleaseTree {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent directory");
    }
    fs::write(path, content).expect("failed to write file");
}
