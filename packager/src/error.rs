//! Error types for the release packager.
//!
//! Every variant is fatal: the pipeline stops at the point of detection and
//! the binary prints the message before exiting non-zero. Messages name the
//! path, platform, or command involved so the operator can repair the
//! upstream artefacts and rerun from scratch.

use crate::platform::Platform;
use camino::Utf8PathBuf;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A required binary that was not found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingArtifact {
    /// Platform whose directory should contain the file.
    pub platform: Platform,
    /// Required filename.
    pub file: String,
}

impl fmt::Display for MissingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.file)
    }
}

/// Errors that can occur while preparing a release.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The repository root could not be located.
    #[error("repository root not found: {reason}")]
    RepositoryNotFound {
        /// Description of why discovery failed.
        reason: String,
    },

    /// The build-metadata generator script does not exist.
    #[error("genbuild.sh not found at {path}")]
    MetadataGeneratorMissing {
        /// Path where the generator was expected.
        path: Utf8PathBuf,
    },

    /// The generator ran but the build file it should have written is absent.
    #[error("build.txt not found at {path}")]
    MetadataFileMissing {
        /// Path where the build file was expected.
        path: Utf8PathBuf,
    },

    /// An external command exited with a non-zero status.
    #[error("{command} failed (exit code {}): {stderr}", display_code(.code))]
    SubprocessFailed {
        /// The command that failed.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// An external command did not finish within the configured timeout.
    #[error("{command} timed out after {timeout_secs} seconds")]
    TimedOut {
        /// The command that was killed.
        command: String,
        /// The timeout that was exceeded.
        timeout_secs: u64,
    },

    /// The build metadata did not carry a usable version token.
    #[error("BUILD_DESC is not available, cannot derive a release version")]
    MissingDescriptor,

    /// A per-platform artefact directory is absent.
    #[error("{platform} directory does not exist at {path}")]
    PlatformDirectoryMissing {
        /// The platform whose directory is missing.
        platform: Platform,
        /// Where the directory was expected.
        path: Utf8PathBuf,
    },

    /// One or more required binaries are absent.
    #[error("missing required files: {}", join_missing(.missing))]
    MissingArtifacts {
        /// Every missing `platform/filename` pair, in scan order.
        missing: Vec<MissingArtifact>,
    },

    /// The staging directory could not be created or populated.
    #[error("staging failed for {platform}: {reason}")]
    StagingFailed {
        /// Platform being staged.
        platform: Platform,
        /// Description of the failure.
        reason: String,
    },

    /// The macOS disk image was not found next to the platform artefacts.
    #[error("disk image not found at {path}")]
    DiskImageMissing {
        /// Where the disk image was expected.
        path: Utf8PathBuf,
    },

    /// The signing script does not exist in the repository.
    #[error("sign-release.sh not found at {path}")]
    SigningScriptMissing {
        /// Where the script was expected.
        path: Utf8PathBuf,
    },

    /// The signing script exited with a non-zero status.
    #[error(
        "sign-release.sh failed (exit code {}):\n{stdout}\n{stderr}",
        display_code(.code)
    )]
    SigningFailed {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A filesystem path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a zip archive failed.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Serializing the release summary failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_owned(), |c| c.to_string())
}

fn join_missing(missing: &[MissingArtifact]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
