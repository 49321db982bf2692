//! Komodo release packager library.
//!
//! This crate turns a directory of prebuilt Komodo binaries into versioned,
//! per-platform release archives and hands them to an external signing
//! script. It is used by the `komodo-packager` CLI binary and can be driven
//! programmatically with a scripted [`runner::CommandRunner`] for testing.
//!
//! # Modules
//!
//! - [`archive`] - Archive naming, tar.gz and zip creation, digests
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Pipeline configuration and repository layout
//! - [`error`] - Error types for every fatal condition
//! - [`fsutil`] - Permission and UTF-8 path helpers
//! - [`metadata`] - Build metadata generation and parsing
//! - [`output`] - Progress lines, dry-run plan and release summary
//! - [`pipeline`] - Release pipeline orchestration
//! - [`platform`] - Target platforms and their packaging rules
//! - [`runner`] - External command execution
//! - [`scanner`] - Release directory listing
//! - [`signing`] - Signing script invocation
//! - [`stager`] - Per-platform staging directories
//! - [`validator`] - Required-binary validation
//! - [`version`] - Release version resolution
//! - [`workspace`] - Repository root detection

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod runner;
pub mod scanner;
pub mod signing;
pub mod stager;
pub mod validator;
pub mod version;
pub mod workspace;

/// Scripted runners and scratch release trees for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
