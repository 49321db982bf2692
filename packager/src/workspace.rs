//! Repository root detection.
//!
//! A Komodo source checkout is recognised by its build-metadata generator at
//! `share/genbuild.sh`.

use crate::config::GENBUILD_SCRIPT;
use crate::error::{PackagerError, Result};
use crate::fsutil::utf8_path;
use camino::{Utf8Path, Utf8PathBuf};

/// Checks whether `dir` is the root of a Komodo checkout.
#[must_use]
pub fn is_repository_root(dir: &Utf8Path) -> bool {
    dir.join(GENBUILD_SCRIPT).is_file()
}

/// Returns `start` or its nearest ancestor that is a repository root.
///
/// # Errors
///
/// Returns [`PackagerError::RepositoryNotFound`] if no ancestor qualifies.
pub fn find_repository_root(start: &Utf8Path) -> Result<Utf8PathBuf> {
    start
        .ancestors()
        .find(|dir| is_repository_root(dir))
        .map(Utf8Path::to_owned)
        .ok_or_else(|| PackagerError::RepositoryNotFound {
            reason: format!("no {GENBUILD_SCRIPT} in {start} or any parent directory"),
        })
}

/// Resolves the repository root from an explicit path or the current
/// directory.
///
/// An explicit path is taken as-is without probing for the generator; a
/// missing generator is reported later, when it is needed.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the current directory cannot be read,
/// [`PackagerError::NonUtf8Path`] if it is not UTF-8, and
/// [`PackagerError::RepositoryNotFound`] if discovery fails.
pub fn resolve_repository_root(explicit: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_owned());
    }
    let cwd = utf8_path(&std::env::current_dir()?)?;
    find_repository_root(&cwd)
}
