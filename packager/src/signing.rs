//! Release signing.
//!
//! The signing tool is opaque: its script is copied into the output
//! directory, made executable, and run there with no arguments. Whatever it
//! signs, it finds by itself.

use crate::config::PipelineConfig;
use crate::error::{PackagerError, Result};
use crate::fsutil::make_executable;
use crate::output::write_stderr_line;
use crate::runner::{CommandRunner, Invocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;

/// Name of the signing script inside the output directory.
pub const SIGNING_SCRIPT_NAME: &str = "sign-release.sh";

/// Stages and runs the signing script.
pub struct SigningInvoker<'a> {
    script: &'a Utf8Path,
    runner: &'a dyn CommandRunner,
}

impl<'a> SigningInvoker<'a> {
    /// Create an invoker for `script`, executed through `runner`.
    #[must_use]
    pub fn new(script: &'a Utf8Path, runner: &'a dyn CommandRunner) -> Self {
        Self { script, runner }
    }

    /// Create an invoker from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &'a PipelineConfig, runner: &'a dyn CommandRunner) -> Self {
        Self::new(&config.signing_script, runner)
    }

    /// Copy the script into `output_root` and run it from there.
    ///
    /// Returns the path of the copied script.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::SigningScriptMissing`] if the script does not
    /// exist and [`PackagerError::SigningFailed`] if it exits non-zero.
    pub fn sign(&self, output_root: &Utf8Path, stderr: &mut dyn Write) -> Result<Utf8PathBuf> {
        if !self.script.is_file() {
            return Err(PackagerError::SigningScriptMissing {
                path: self.script.to_owned(),
            });
        }

        let staged = output_root.join(SIGNING_SCRIPT_NAME);
        fs::copy(self.script, &staged)?;
        make_executable(&staged)?;
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, format!("Copied {SIGNING_SCRIPT_NAME} to {output_root}"));

        write_stderr_line(stderr, "Signing releases...");
        let invocation = Invocation::new(staged.clone(), output_root);
        let output = self.runner.run(&invocation)?;
        if !output.status.success() {
            return Err(PackagerError::SigningFailed {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        log::debug!("signing completed in {output_root}");
        write_stderr_line(stderr, "✓ Releases signed");
        Ok(staged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsutil::utf8_path;
    use crate::runner::MockCommandRunner;
    use crate::test_utils::{exit_status, success_output};
    use mockall::predicate::function;
    use rstest::{fixture, rstest};
    use std::process::Output;
    use tempfile::TempDir;

    struct Dirs {
        _temp: TempDir,
        script: Utf8PathBuf,
        output: Utf8PathBuf,
    }

    #[fixture]
    fn dirs() -> Dirs {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_path(temp.path()).expect("utf-8");
        let contrib = root.join("contrib");
        let output = root.join("releases");
        fs::create_dir_all(&contrib).expect("mkdir contrib");
        fs::create_dir_all(&output).expect("mkdir output");
        let script = contrib.join(SIGNING_SCRIPT_NAME);
        fs::write(&script, "#!/bin/sh\n").expect("write script");
        Dirs {
            _temp: temp,
            script,
            output,
        }
    }

    #[rstest]
    fn runs_copied_script_without_arguments_in_output_dir(dirs: Dirs) {
        let expected_program = dirs.output.join(SIGNING_SCRIPT_NAME);
        let expected_dir = dirs.output.clone();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(function(move |inv: &Invocation| {
                inv.program == expected_program
                    && inv.args.is_empty()
                    && inv.working_dir == expected_dir
            }))
            .times(1)
            .returning(|_| Ok(success_output()));

        let staged = SigningInvoker::new(&dirs.script, &runner)
            .sign(&dirs.output, &mut Vec::new())
            .expect("signing succeeds");

        assert_eq!(staged, dirs.output.join(SIGNING_SCRIPT_NAME));
        assert!(staged.is_file());
    }

    #[cfg(unix)]
    #[rstest]
    fn copied_script_is_executable(dirs: Dirs) {
        use std::os::unix::fs::PermissionsExt;

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(success_output()));

        let staged = SigningInvoker::new(&dirs.script, &runner)
            .sign(&dirs.output, &mut Vec::new())
            .expect("signing succeeds");

        let mode = fs::metadata(staged).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[rstest]
    fn missing_script_is_reported_before_running(dirs: Dirs) {
        fs::remove_file(&dirs.script).expect("remove script");
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();

        let err = SigningInvoker::new(&dirs.script, &runner)
            .sign(&dirs.output, &mut Vec::new())
            .expect_err("script is missing");

        assert!(matches!(err, PackagerError::SigningScriptMissing { ref path } if *path == dirs.script));
    }

    #[rstest]
    fn non_zero_exit_surfaces_code_and_both_streams(dirs: Dirs) {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(Output {
                status: exit_status(2),
                stdout: b"signing komodo-1.2.3-win.zip\n".to_vec(),
                stderr: b"gpg: no default secret key\n".to_vec(),
            })
        });

        let err = SigningInvoker::new(&dirs.script, &runner)
            .sign(&dirs.output, &mut Vec::new())
            .expect_err("signing fails");

        match err {
            PackagerError::SigningFailed {
                code,
                stdout,
                stderr,
            } => {
                assert_eq!(code, Some(2));
                assert_eq!(stdout, "signing komodo-1.2.3-win.zip");
                assert_eq!(stderr, "gpg: no default secret key");
            }
            other => panic!("expected SigningFailed, got {other:?}"),
        }
    }
}
